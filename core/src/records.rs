//! Row types read from the review store.
//!
//! All of these are produced upstream and are read-only here.

use crate::types::{ClaimId, PatientId, ProviderId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub claim_amount: f64,
    pub claim_date: String,
    pub provider_id: ProviderId,
    pub patient_id: PatientId,
    pub procedure_code: String,
    pub diagnosis_code: String,
    pub status: String,
    pub provider_specialty: String,
    /// How unusual the amount is against peers in the same specialty.
    pub amount_zscore: Option<f64>,
}

/// Point-in-time aggregate snapshot of a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub total_claims: Option<i64>,
    pub avg_claim_amount: Option<f64>,
    pub total_billed: Option<f64>,
    pub fraud_claims: Option<i64>,
}

/// Point-in-time aggregate snapshot of a patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total_claims: Option<i64>,
    pub total_spent: Option<f64>,
    pub fraud_claims: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: ProviderId,
    pub stats: ProviderStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: PatientId,
    pub stats: PatientStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudFlag {
    pub claim_id: ClaimId,
    pub fraud_detected: bool,
    /// 0-100.
    pub fraud_score: f64,
    /// Comma separated rule identifiers, as written by the scoring job.
    pub rules_triggered: String,
    pub explanation: String,
}

impl FraudFlag {
    /// Individual rule identifiers, trimmed, empties dropped.
    pub fn rules(&self) -> Vec<&str> {
        split_rules(&self.rules_triggered)
    }
}

pub fn split_rules(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect()
}

/// Which side of a claim a history lookup is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Provider,
    Patient,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Provider => "provider",
            EntityKind::Patient => "patient",
        }
    }
}

/// Lightweight history row. Provider history carries `status`,
/// patient history carries `specialty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_amount: f64,
    pub claim_date: String,
    pub status: Option<String>,
    pub specialty: Option<String>,
    pub is_fraud: Option<bool>,
}

/// A flagged claim as ranked for triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFlag {
    pub claim_id: ClaimId,
    pub fraud_score: f64,
    pub rules_triggered: String,
}
