//! Shared primitive types used across the review pipeline.

/// Identifier of a submitted claim.
pub type ClaimId = String;

/// Identifier of a billing provider.
pub type ProviderId = String;

/// Identifier of a patient.
pub type PatientId = String;

/// Default number of history rows pulled for a provider or patient.
pub const RECENT_CLAIMS_LIMIT: usize = 10;
