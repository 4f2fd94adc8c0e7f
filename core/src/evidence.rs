//! Evidence aggregation: everything the model is told about one claim.
//!
//! A bundle is assembled fresh for every request and never cached.
//! Only the claim itself is mandatory: a missing fraud flag, provider or
//! patient degrades to an empty context instead of failing the request.

use crate::{
    error::{ReviewError, ReviewResult},
    records::{Claim, ClaimSummary, EntityKind, FraudFlag, PatientStats, ProviderStats},
    store::ClaimStore,
    types::RECENT_CLAIMS_LIMIT,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderContext {
    /// False when no provider row exists; stats are then all absent.
    pub found: bool,
    pub stats: ProviderStats,
    pub recent_claims: Vec<ClaimSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub found: bool,
    pub stats: PatientStats,
    pub recent_claims: Vec<ClaimSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub claim: Claim,
    pub fraud_flag: Option<FraudFlag>,
    pub provider: ProviderContext,
    pub patient: PatientContext,
}

/// Builds evidence bundles from the store.
#[derive(Debug, Clone)]
pub struct EvidenceAggregator {
    store: ClaimStore,
    history_limit: usize,
}

impl EvidenceAggregator {
    pub fn new(store: ClaimStore) -> Self {
        Self {
            store,
            history_limit: RECENT_CLAIMS_LIMIT,
        }
    }

    /// Override how many history rows are pulled per entity (capped at the default).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.min(RECENT_CLAIMS_LIMIT);
        self
    }

    pub fn store(&self) -> &ClaimStore {
        &self.store
    }

    pub fn build_evidence(&self, claim_id: &str) -> ReviewResult<EvidenceBundle> {
        let claim = self
            .store
            .get_claim(claim_id)?
            .ok_or_else(|| ReviewError::ClaimNotFound {
                claim_id: claim_id.to_string(),
            })?;

        let fraud_flag = self.store.get_fraud_flag(claim_id)?;
        if fraud_flag.is_none() {
            log::debug!("Claim {claim_id} has no fraud flag");
        }

        let provider = self.provider_context(&claim.provider_id)?;
        let patient = self.patient_context(&claim.patient_id)?;

        log::debug!(
            "Evidence for {claim_id}: {} provider history rows, {} patient history rows",
            provider.recent_claims.len(),
            patient.recent_claims.len()
        );

        Ok(EvidenceBundle {
            claim,
            fraud_flag,
            provider,
            patient,
        })
    }

    fn provider_context(&self, provider_id: &str) -> ReviewResult<ProviderContext> {
        let recent_claims =
            self.store
                .recent_claims(EntityKind::Provider, provider_id, self.history_limit)?;
        match self.store.get_provider(provider_id)? {
            Some(p) => Ok(ProviderContext {
                found: true,
                stats: p.stats,
                recent_claims,
            }),
            None => {
                log::warn!(
                    "{} {provider_id} not found; using empty context",
                    EntityKind::Provider.label()
                );
                Ok(ProviderContext {
                    recent_claims,
                    ..ProviderContext::default()
                })
            }
        }
    }

    fn patient_context(&self, patient_id: &str) -> ReviewResult<PatientContext> {
        let recent_claims =
            self.store
                .recent_claims(EntityKind::Patient, patient_id, self.history_limit)?;
        match self.store.get_patient(patient_id)? {
            Some(p) => Ok(PatientContext {
                found: true,
                stats: p.stats,
                recent_claims,
            }),
            None => {
                log::warn!(
                    "{} {patient_id} not found; using empty context",
                    EntityKind::Patient.label()
                );
                Ok(PatientContext {
                    recent_claims,
                    ..PatientContext::default()
                })
            }
        }
    }
}
