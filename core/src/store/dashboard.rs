use super::ClaimStore;
use crate::error::ReviewResult;
use std::collections::HashSet;

/// One claim joined with its flag, as the dashboard consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimFlagRow {
    pub claim_id: String,
    pub claim_amount: f64,
    pub claim_date: String,
    pub fraud_detected: bool,
    pub rules_triggered: Option<String>,
}

impl ClaimStore {
    /// Every claim left-joined with its fraud flag, first row per claim id.
    pub fn claims_with_flags(&self) -> ReviewResult<Vec<ClaimFlagRow>> {
        let conn = self.read()?;
        let mut stmt = conn.prepare(
            "SELECT c.claim_id, c.claim_amount, c.claim_date,
                    COALESCE(f.fraud_detected, 0), f.rules_triggered
             FROM claims c
             LEFT JOIN fraud_flags f ON c.claim_id = f.claim_id
             ORDER BY c.rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ClaimFlagRow {
                    claim_id: row.get(0)?,
                    claim_amount: row.get(1)?,
                    claim_date: row.get(2)?,
                    fraud_detected: row.get::<_, i64>(3)? != 0,
                    rules_triggered: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let total = rows.len();
        let unique: Vec<ClaimFlagRow> = rows
            .into_iter()
            .filter(|r| seen.insert(r.claim_id.clone()))
            .collect();
        if unique.len() < total {
            log::debug!("Dropped {} duplicate claim rows", total - unique.len());
        }
        Ok(unique)
    }
}
