//! Case reviewer: wires evidence, prompts and the model into reports.
//!
//! PIPELINE (per claim, no state carried between runs):
//!   1. Build the evidence bundle from the store
//!   2. Render the explanation or investigation prompt
//!   3. Call the model
//!   4. Wrap (and for investigations, parse) the answer
//!
//! RULES:
//!   - Single-claim calls return the error for that claim.
//!   - Batch calls never stop early: each failure becomes a failed entry.
//!   - Batch output order always matches input order, whatever the
//!     concurrency and whatever order model calls finish in.

use crate::{
    config::{BatchConfig, ReviewConfig},
    error::ReviewResult,
    evidence::{EvidenceAggregator, EvidenceBundle},
    gateway::{ChatMessage, CompletionModel},
    prompt,
    report::{
        parse_investigation, CaseReport, ExplanationReport, InvestigationReport,
    },
    store::ClaimStore,
    types::ClaimId,
};
use log::{error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

pub struct CaseReviewer<M> {
    evidence: EvidenceAggregator,
    model: M,
    batch: BatchConfig,
    chat_temperature: f32,
    analysis_temperature: f32,
}

impl<M: CompletionModel> CaseReviewer<M> {
    pub fn new(store: ClaimStore, model: M) -> Self {
        let defaults = ReviewConfig::default();
        Self {
            evidence: EvidenceAggregator::new(store),
            model,
            batch: defaults.batch,
            chat_temperature: defaults.model.chat_temperature,
            analysis_temperature: defaults.model.analysis_temperature,
        }
    }

    /// Build from a validated config, with the model constructed by the caller.
    pub fn from_config(config: &ReviewConfig, model: M) -> ReviewResult<Self> {
        config.validate()?;
        let store = ClaimStore::new(config.database_path.clone());
        Ok(Self {
            evidence: EvidenceAggregator::new(store)
                .with_history_limit(config.batch.history_limit),
            model,
            batch: config.batch.clone(),
            chat_temperature: config.model.chat_temperature,
            analysis_temperature: config.model.analysis_temperature,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.batch.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &ClaimStore {
        self.evidence.store()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn build_evidence(&self, claim_id: &str) -> ReviewResult<EvidenceBundle> {
        self.evidence.build_evidence(claim_id)
    }

    // ── Single claim ─────────────────────────────────────────────────────────

    pub fn explain_case(&self, claim_id: &str) -> ReviewResult<ExplanationReport> {
        self.explain_case_with(claim_id, None)
    }

    /// Explanation that also shows the model an earlier investigation.
    pub fn explain_case_with(
        &self,
        claim_id: &str,
        investigation: Option<&InvestigationReport>,
    ) -> ReviewResult<ExplanationReport> {
        info!("Explaining claim {claim_id}");
        let bundle = self.evidence.build_evidence(claim_id)?;
        let prompt = prompt::build_explanation_prompt_with(
            &bundle,
            investigation.map(|inv| &inv.findings),
        );
        log::debug!("Explanation prompt for {claim_id}: {} chars", prompt.len());

        let explanation = self
            .model
            .complete(&[ChatMessage::user(prompt)], self.chat_temperature)?;
        Ok(ExplanationReport {
            claim_id: bundle.claim.claim_id,
            explanation,
        })
    }

    pub fn investigate_case(&self, claim_id: &str) -> ReviewResult<InvestigationReport> {
        info!("Investigating claim {claim_id}");
        let bundle = self.evidence.build_evidence(claim_id)?;
        let prompt = prompt::build_investigation_prompt(&bundle);
        log::debug!("Investigation prompt for {claim_id}: {} chars", prompt.len());

        let analysis = self
            .model
            .complete(&[ChatMessage::user(prompt)], self.analysis_temperature)?;

        let findings = parse_investigation(&analysis);
        let missing = findings.missing_fields();
        if !missing.is_empty() {
            warn!(
                "Claim {claim_id}: could not parse {} from model answer",
                missing.join(", ")
            );
        }

        let claim = bundle.claim;
        Ok(InvestigationReport {
            claim_id: claim.claim_id,
            analysis,
            claim_amount: claim.claim_amount,
            provider_id: claim.provider_id,
            specialty: claim.provider_specialty,
            fraud_score: bundle.fraud_flag.map(|f| f.fraud_score),
            findings,
        })
    }

    // ── Batches ──────────────────────────────────────────────────────────────

    /// Explanations for every claim, in input order.
    pub fn generate_batch_report<S: AsRef<str> + Sync>(
        &self,
        claim_ids: &[S],
    ) -> Vec<CaseReport<ExplanationReport>> {
        info!("Generating fraud report for {} claims", claim_ids.len());
        self.run_batch(claim_ids, |id| self.explain_case(id))
    }

    /// Investigations for every claim, in input order.
    pub fn investigate_claims<S: AsRef<str> + Sync>(
        &self,
        claim_ids: &[S],
    ) -> Vec<CaseReport<InvestigationReport>> {
        self.run_batch(claim_ids, |id| self.investigate_case(id))
    }

    /// Investigate the `limit` highest-scoring flagged claims.
    ///
    /// Ranking is by fraud score descending, ties by claim id ascending.
    /// Only the ranking query itself can fail the whole call.
    pub fn investigate_top_cases(
        &self,
        limit: usize,
    ) -> ReviewResult<Vec<CaseReport<InvestigationReport>>> {
        let ranked = self.store().flagged_claims_ranked(limit)?;
        info!("Investigating top {} fraud cases", ranked.len());
        for (i, flag) in ranked.iter().enumerate() {
            log::debug!(
                "[{}/{}] {} score {} rules {}",
                i + 1,
                ranked.len(),
                flag.claim_id,
                flag.fraud_score,
                flag.rules_triggered
            );
        }
        let ids: Vec<ClaimId> = ranked.into_iter().map(|f| f.claim_id).collect();
        Ok(self.investigate_claims(&ids))
    }

    fn run_batch<S, R, F>(&self, claim_ids: &[S], run: F) -> Vec<CaseReport<R>>
    where
        S: AsRef<str> + Sync,
        R: Send,
        F: Fn(&str) -> ReviewResult<R> + Sync,
    {
        let entries = run_ordered(claim_ids, self.batch.concurrency, |id| {
            let result = run(id);
            if let Err(err) = &result {
                error!("Claim {id} failed: {err}");
            }
            CaseReport::from_result(id, result)
        });
        let failed = entries.iter().filter(|e| !e.is_success()).count();
        info!(
            "Batch complete: {} succeeded, {failed} failed",
            entries.len() - failed
        );
        entries
    }
}

/// Map `f` over `ids` with at most `concurrency` calls in flight,
/// returning results by input position.
fn run_ordered<S, T, F>(ids: &[S], concurrency: usize, f: F) -> Vec<T>
where
    S: AsRef<str> + Sync,
    T: Send,
    F: Fn(&str) -> T + Sync,
{
    let workers = concurrency.max(1).min(ids.len());
    if workers <= 1 {
        return ids.iter().map(|id| f(id.as_ref())).collect();
    }

    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, T)>();
    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let f = &f;
            scope.spawn(move || loop {
                let idx = next.fetch_add(1, Ordering::Relaxed);
                let Some(id) = ids.get(idx) else { break };
                if tx.send((idx, f(id.as_ref()))).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(ids.len()).collect();
    for (idx, value) in rx {
        slots[idx] = Some(value);
    }
    slots.into_iter().flatten().collect()
}
