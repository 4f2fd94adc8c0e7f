//! Explanation pipeline and batch reports.

mod common;

use claimlens_core::{
    gateway::CHAT_TEMPERATURE, CaseReviewer, FailureKind, ReviewError,
};
use common::{claim, flag, fresh_db, seed_scenario, Failure, ScriptedModel, WELL_FORMED_ANSWER};

const PLAIN: &str = "This claim is flagged as suspicious because the amount is far higher than usual.";

/// The C100 explanation uses the chat temperature and a jargon-free prompt.
#[test]
fn explain_c100() {
    let db = fresh_db();
    seed_scenario(&db.store);
    let reviewer = CaseReviewer::new(db.store.clone(), ScriptedModel::answering(PLAIN));

    let report = reviewer.explain_case("C100").unwrap();
    assert_eq!(report.claim_id, "C100");
    assert_eq!(report.explanation, PLAIN);

    let calls = reviewer.model().calls();
    assert_eq!(calls[0].2, CHAT_TEMPERATURE);
    let prompt = calls[0].1.to_ascii_lowercase();
    assert!(prompt.contains("$15,000.00"));
    assert!(prompt.contains("cardiology"));
    // Upstream text mentions both terms; neither may reach the model here.
    assert!(!prompt.contains("z-score"));
    assert!(!prompt.contains("outlier"));
}

/// Explaining an unknown claim fails with ClaimNotFound.
#[test]
fn explain_missing_claim_is_not_found() {
    let db = fresh_db();
    let reviewer = CaseReviewer::new(db.store.clone(), ScriptedModel::answering(PLAIN));
    let err = reviewer.explain_case("NOPE").unwrap_err();
    assert!(matches!(err, ReviewError::ClaimNotFound { ref claim_id } if claim_id == "NOPE"));
}

/// A missing claim fails its own entry and leaves the rest intact.
#[test]
fn batch_survives_missing_claim() {
    let db = fresh_db();
    seed_scenario(&db.store);
    let reviewer = CaseReviewer::new(db.store.clone(), ScriptedModel::answering(PLAIN));

    let reports = reviewer.generate_batch_report(&["NOPE", "C100"]);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].claim_id, "NOPE");
    assert_eq!(reports[0].failure().map(|f| f.kind), Some(FailureKind::ClaimNotFound));
    assert_eq!(reports[1].claim_id, "C100");
    assert_eq!(reports[1].report().map(|r| r.explanation.as_str()), Some(PLAIN));
}

/// Batch output keeps input order even when later claims finish first.
#[test]
fn batch_order_matches_input_under_concurrency() {
    let db = fresh_db();
    for id in ["A", "B", "C"] {
        db.store
            .insert_claim(&claim(id, 700.0, "2024-02-02", "P1", "PT1"), None)
            .unwrap();
        db.store.insert_fraud_flag(&flag(id, 60.0, "odd_hours")).unwrap();
    }
    // A finishes last, C first.
    let model = ScriptedModel::answering(PLAIN)
        .with_answer("A", "about A")
        .with_answer("B", "about B")
        .with_answer("C", "about C")
        .delaying("A", 150)
        .delaying("B", 75);
    let reviewer = CaseReviewer::new(db.store.clone(), model).with_concurrency(3);

    let reports = reviewer.generate_batch_report(&["A", "B", "C"]);
    let ids: Vec<&str> = reports.iter().map(|r| r.claim_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    for r in &reports {
        let text = &r.report().unwrap().explanation;
        assert_eq!(text, &format!("about {}", r.claim_id));
    }

    let completion_order: Vec<String> =
        reviewer.model().calls().into_iter().map(|(id, _, _)| id).collect();
    assert_eq!(completion_order.len(), 3);
}

/// Model outages and empty answers become failed entries with their kind.
#[test]
fn model_failures_become_failed_entries() {
    let db = fresh_db();
    seed_scenario(&db.store);
    for id in ["E1", "E2"] {
        db.store
            .insert_claim(&claim(id, 50.0, "2024-02-02", "P1", "PT1"), None)
            .unwrap();
    }
    let model = ScriptedModel::answering(PLAIN)
        .failing_on("E1", Failure::Unavailable)
        .failing_on("E2", Failure::Empty);
    let reviewer = CaseReviewer::new(db.store.clone(), model);

    let reports = reviewer.generate_batch_report(&["E1", "C100", "E2"]);
    assert_eq!(reports[0].failure().map(|f| f.kind), Some(FailureKind::ModelUnavailable));
    assert!(reports[1].is_success());
    assert_eq!(
        reports[2].failure().map(|f| f.kind),
        Some(FailureKind::ModelResponseInvalid)
    );
    assert!(reports[0]
        .to_string()
        .starts_with("Explanation unavailable for claim E1 because model unavailable"));
}

/// A prior investigation's findings are shown to the model on request.
#[test]
fn explanation_can_build_on_investigation() {
    let db = fresh_db();
    seed_scenario(&db.store);
    let reviewer = CaseReviewer::new(db.store.clone(), ScriptedModel::answering(WELL_FORMED_ANSWER));

    let investigation = reviewer.investigate_case("C100").unwrap();
    reviewer
        .explain_case_with("C100", Some(&investigation))
        .unwrap();

    let calls = reviewer.model().calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].1.contains("PRIOR INVESTIGATION FINDINGS:"));
    assert!(calls[1].1.contains("- Recommendation: Escalate"));
}

/// Batch entries serialize with a status tag for JSON output.
#[test]
fn batch_entries_serialize_for_json_output() {
    let db = fresh_db();
    seed_scenario(&db.store);
    let reviewer = CaseReviewer::new(db.store.clone(), ScriptedModel::answering(PLAIN));

    let reports = reviewer.generate_batch_report(&["C100", "NOPE"]);
    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[0]["outcome"]["status"], "completed");
    assert_eq!(json[1]["outcome"]["status"], "failed");
    assert_eq!(json[1]["outcome"]["kind"], "claim_not_found");
}
