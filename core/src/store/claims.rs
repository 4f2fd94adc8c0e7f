use super::ClaimStore;
use crate::{
    error::ReviewResult,
    records::{Claim, ClaimSummary, EntityKind},
};
use rusqlite::{params, OptionalExtension};

impl ClaimStore {
    // ── Claim ─────────────────────────────────────────────────────

    /// Fetch a claim by id. Duplicate rows resolve to the first inserted one.
    pub fn get_claim(&self, claim_id: &str) -> ReviewResult<Option<Claim>> {
        let conn = self.read()?;
        let claim = conn
            .query_row(
                "SELECT claim_id, claim_amount, claim_date, provider_id, patient_id,
                        procedure_code, diagnosis_code, status, provider_specialty,
                        amount_zscore
                 FROM claims WHERE claim_id = ?1
                 ORDER BY rowid ASC LIMIT 1",
                params![claim_id],
                |row| {
                    Ok(Claim {
                        claim_id: row.get(0)?,
                        claim_amount: row.get(1)?,
                        claim_date: row.get(2)?,
                        provider_id: row.get(3)?,
                        patient_id: row.get(4)?,
                        procedure_code: row.get(5)?,
                        diagnosis_code: row.get(6)?,
                        status: row.get(7)?,
                        provider_specialty: row.get(8)?,
                        amount_zscore: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(claim)
    }

    /// Most recent claims for a provider or patient, newest first.
    pub fn recent_claims(
        &self,
        kind: EntityKind,
        entity_id: &str,
        limit: usize,
    ) -> ReviewResult<Vec<ClaimSummary>> {
        let sql = match kind {
            EntityKind::Provider => {
                "SELECT claim_amount, claim_date, status, is_fraud
                 FROM claims WHERE provider_id = ?1
                 ORDER BY claim_date DESC, rowid DESC LIMIT ?2"
            }
            EntityKind::Patient => {
                "SELECT claim_amount, claim_date, provider_specialty, is_fraud
                 FROM claims WHERE patient_id = ?1
                 ORDER BY claim_date DESC, rowid DESC LIMIT ?2"
            }
        };
        let conn = self.read()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![entity_id, limit as i64], |row| {
            let detail: Option<String> = row.get(2)?;
            let (status, specialty) = match kind {
                EntityKind::Provider => (detail, None),
                EntityKind::Patient => (None, detail),
            };
            Ok(ClaimSummary {
                claim_amount: row.get(0)?,
                claim_date: row.get(1)?,
                status,
                specialty,
                is_fraud: row.get::<_, Option<i64>>(3)?.map(|v| v != 0),
            })
        })?;
        let summaries = rows.collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "{} {entity_id}: {} recent claims (limit {limit})",
            kind.label(),
            summaries.len()
        );
        Ok(summaries)
    }

    pub fn insert_claim(&self, c: &Claim, is_fraud: Option<bool>) -> ReviewResult<()> {
        let conn = self.write()?;
        conn.execute(
            "INSERT INTO claims (
                claim_id, claim_amount, claim_date, provider_id, patient_id,
                procedure_code, diagnosis_code, status, provider_specialty,
                amount_zscore, is_fraud
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &c.claim_id,
                c.claim_amount,
                &c.claim_date,
                &c.provider_id,
                &c.patient_id,
                &c.procedure_code,
                &c.diagnosis_code,
                &c.status,
                &c.provider_specialty,
                c.amount_zscore,
                is_fraud.map(i64::from),
            ],
        )?;
        Ok(())
    }
}
