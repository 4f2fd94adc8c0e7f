use super::ClaimStore;
use crate::{
    error::ReviewResult,
    records::{Patient, PatientStats, Provider, ProviderStats},
};
use rusqlite::{params, OptionalExtension};

impl ClaimStore {
    // ── Provider ──────────────────────────────────────────────────

    pub fn get_provider(&self, provider_id: &str) -> ReviewResult<Option<Provider>> {
        let conn = self.read()?;
        let provider = conn
            .query_row(
                "SELECT provider_id, total_claims, avg_claim_amount, total_billed, fraud_claims
                 FROM providers WHERE provider_id = ?1",
                params![provider_id],
                |row| {
                    Ok(Provider {
                        provider_id: row.get(0)?,
                        stats: ProviderStats {
                            total_claims: row.get(1)?,
                            avg_claim_amount: row.get(2)?,
                            total_billed: row.get(3)?,
                            fraud_claims: row.get(4)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(provider)
    }

    pub fn insert_provider(&self, p: &Provider) -> ReviewResult<()> {
        let conn = self.write()?;
        conn.execute(
            "INSERT INTO providers (provider_id, total_claims, avg_claim_amount, total_billed, fraud_claims)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &p.provider_id,
                p.stats.total_claims,
                p.stats.avg_claim_amount,
                p.stats.total_billed,
                p.stats.fraud_claims,
            ],
        )?;
        Ok(())
    }

    // ── Patient ───────────────────────────────────────────────────

    pub fn get_patient(&self, patient_id: &str) -> ReviewResult<Option<Patient>> {
        let conn = self.read()?;
        let patient = conn
            .query_row(
                "SELECT patient_id, total_claims, total_spent, fraud_claims
                 FROM patients WHERE patient_id = ?1",
                params![patient_id],
                |row| {
                    Ok(Patient {
                        patient_id: row.get(0)?,
                        stats: PatientStats {
                            total_claims: row.get(1)?,
                            total_spent: row.get(2)?,
                            fraud_claims: row.get(3)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(patient)
    }

    pub fn insert_patient(&self, p: &Patient) -> ReviewResult<()> {
        let conn = self.write()?;
        conn.execute(
            "INSERT INTO patients (patient_id, total_claims, total_spent, fraud_claims)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &p.patient_id,
                p.stats.total_claims,
                p.stats.total_spent,
                p.stats.fraud_claims,
            ],
        )?;
        Ok(())
    }
}
