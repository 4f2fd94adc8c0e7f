//! Claim review pipeline: gathers a claim's evidence, asks a language model
//! to explain or investigate it, and turns the answers into reports.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod evidence;
pub mod gateway;
pub mod prompt;
pub mod records;
pub mod report;
pub mod reviewer;
pub mod store;
pub mod types;

pub use config::ReviewConfig;
pub use error::{FailureKind, ReviewError, ReviewResult};
pub use evidence::{EvidenceAggregator, EvidenceBundle};
pub use gateway::{ChatMessage, CompletionModel, OpenAiGateway};
pub use report::{CaseOutcome, CaseReport, ExplanationReport, InvestigationReport};
pub use reviewer::CaseReviewer;
pub use store::ClaimStore;
