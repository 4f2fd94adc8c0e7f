//! Shared fixtures: a throwaway SQLite file and a scripted model.
#![allow(dead_code)]

use claimlens_core::{
    error::{ReviewError, ReviewResult},
    gateway::{ChatMessage, CompletionModel},
    records::{Claim, FraudFlag, Patient, PatientStats, Provider, ProviderStats},
    store::ClaimStore,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

pub const WELL_FORMED_ANSWER: &str = "FRAUD LIKELIHOOD: 8\n\
KEY RED FLAGS: Amount far above the specialty norm; same procedure billed twice\n\
INVESTIGATION PRIORITY: High\n\
RECOMMENDATION: Escalate";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A migrated database in its own temp directory, removed on drop.
pub struct TestDb {
    _dir: TempDir,
    pub store: ClaimStore,
}

pub fn fresh_db() -> TestDb {
    init_logging();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("claims.db");
    let store = ClaimStore::new(path.to_string_lossy().into_owned());
    store.migrate().expect("migration");
    TestDb { _dir: dir, store }
}

pub fn claim(id: &str, amount: f64, date: &str, provider: &str, patient: &str) -> Claim {
    Claim {
        claim_id: id.into(),
        claim_amount: amount,
        claim_date: date.into(),
        provider_id: provider.into(),
        patient_id: patient.into(),
        procedure_code: "99215".into(),
        diagnosis_code: "E11.9".into(),
        status: "pending".into(),
        provider_specialty: "Internal Medicine".into(),
        amount_zscore: Some(0.4),
    }
}

pub fn flag(claim_id: &str, score: f64, rules: &str) -> FraudFlag {
    FraudFlag {
        claim_id: claim_id.into(),
        fraud_detected: true,
        fraud_score: score,
        rules_triggered: rules.into(),
        explanation: format!("Rules fired: {rules}"),
    }
}

/// The C100 cardiology claim with full provider and patient context,
/// plus a little history for both.
pub fn seed_scenario(store: &ClaimStore) {
    let mut c100 = claim("C100", 15000.0, "2024-03-02", "P1", "PT1");
    c100.provider_specialty = "Cardiology".into();
    c100.procedure_code = "93458".into();
    c100.diagnosis_code = "I25.10".into();
    c100.amount_zscore = Some(4.21);
    store.insert_claim(&c100, None).unwrap();

    store
        .insert_fraud_flag(&FraudFlag {
            claim_id: "C100".into(),
            fraud_detected: true,
            fraud_score: 85.0,
            rules_triggered: "high_amount,duplicate_billing".into(),
            explanation: "Amount Z-score 4.21 is a statistical outlier for Cardiology".into(),
        })
        .unwrap();

    store
        .insert_provider(&Provider {
            provider_id: "P1".into(),
            stats: ProviderStats {
                total_claims: Some(240),
                avg_claim_amount: Some(3120.75),
                total_billed: Some(748980.0),
                fraud_claims: Some(4),
            },
        })
        .unwrap();
    store
        .insert_patient(&Patient {
            patient_id: "PT1".into(),
            stats: PatientStats {
                total_claims: Some(12),
                total_spent: Some(21450.5),
                fraud_claims: Some(1),
            },
        })
        .unwrap();

    for (i, day) in ["2024-01-15", "2024-02-01", "2024-02-20"].iter().enumerate() {
        let mut h = claim(&format!("H{i}"), 1000.0 + i as f64, day, "P1", "PT1");
        h.provider_specialty = "Cardiology".into();
        store.insert_claim(&h, Some(i == 0)).unwrap();
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unavailable,
    Timeout,
    Empty,
}

/// In-process stand-in for the completion service.
///
/// Answers are keyed by the claim id found in the prompt.
#[derive(Default)]
pub struct ScriptedModel {
    answers: HashMap<String, String>,
    default_answer: String,
    failures: HashMap<String, Failure>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, String, f32)>>,
}

impl ScriptedModel {
    pub fn answering(default_answer: &str) -> Self {
        Self {
            default_answer: default_answer.into(),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, claim_id: &str, answer: &str) -> Self {
        self.answers.insert(claim_id.into(), answer.into());
        self
    }

    pub fn failing_on(mut self, claim_id: &str, failure: Failure) -> Self {
        self.failures.insert(claim_id.into(), failure);
        self
    }

    pub fn delaying(mut self, claim_id: &str, millis: u64) -> Self {
        self.delays
            .insert(claim_id.into(), Duration::from_millis(millis));
        self
    }

    /// (claim id, prompt, temperature) for every call, in call order.
    pub fn calls(&self) -> Vec<(String, String, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn claim_id_in(prompt: &str) -> String {
    prompt
        .split_once("Claim ID: ")
        .and_then(|(_, rest)| rest.lines().next())
        .unwrap_or_default()
        .trim()
        .to_string()
}

impl CompletionModel for ScriptedModel {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> ReviewResult<String> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let claim_id = claim_id_in(&prompt);
        self.calls
            .lock()
            .unwrap()
            .push((claim_id.clone(), prompt, temperature));

        if let Some(delay) = self.delays.get(&claim_id) {
            thread::sleep(*delay);
        }
        match self.failures.get(&claim_id) {
            Some(Failure::Unavailable) => {
                return Err(ReviewError::ModelUnavailable("connection refused".into()))
            }
            Some(Failure::Timeout) => return Err(ReviewError::ModelTimeout { after_secs: 30 }),
            Some(Failure::Empty) => {
                return Err(ReviewError::ModelResponseInvalid("no completion text".into()))
            }
            None => {}
        }
        Ok(self
            .answers
            .get(&claim_id)
            .cloned()
            .unwrap_or_else(|| self.default_answer.clone()))
    }
}
