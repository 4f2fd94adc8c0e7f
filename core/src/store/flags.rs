use super::ClaimStore;
use crate::{
    error::ReviewResult,
    records::{FraudFlag, RankedFlag},
};
use rusqlite::{params, OptionalExtension};

impl ClaimStore {
    // ── Fraud flags ───────────────────────────────────────────────

    pub fn get_fraud_flag(&self, claim_id: &str) -> ReviewResult<Option<FraudFlag>> {
        let conn = self.read()?;
        let flag = conn
            .query_row(
                "SELECT claim_id, fraud_detected, fraud_score,
                        COALESCE(rules_triggered, ''), COALESCE(explanation, '')
                 FROM fraud_flags WHERE claim_id = ?1",
                params![claim_id],
                |row| {
                    Ok(FraudFlag {
                        claim_id: row.get(0)?,
                        fraud_detected: row.get::<_, i64>(1)? != 0,
                        fraud_score: row.get(2)?,
                        rules_triggered: row.get(3)?,
                        explanation: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(flag)
    }

    /// Flagged claims, highest score first, ties by ascending claim id.
    pub fn flagged_claims_ranked(&self, limit: usize) -> ReviewResult<Vec<RankedFlag>> {
        let conn = self.read()?;
        let mut stmt = conn.prepare(
            "SELECT claim_id, fraud_score, COALESCE(rules_triggered, '')
             FROM fraud_flags WHERE fraud_detected = 1
             ORDER BY fraud_score DESC, claim_id ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RankedFlag {
                claim_id: row.get(0)?,
                fraud_score: row.get(1)?,
                rules_triggered: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn insert_fraud_flag(&self, f: &FraudFlag) -> ReviewResult<()> {
        let conn = self.write()?;
        conn.execute(
            "INSERT INTO fraud_flags (claim_id, fraud_detected, fraud_score, rules_triggered, explanation)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &f.claim_id,
                if f.fraud_detected { 1 } else { 0 },
                f.fraud_score,
                &f.rules_triggered,
                &f.explanation,
            ],
        )?;
        Ok(())
    }
}
