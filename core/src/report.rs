//! Report records and the tolerant parser for investigation answers.
//!
//! Model output is treated as untrusted text. The parser pulls out whatever
//! labelled fields it can find and leaves the rest absent; the raw answer
//! is always kept on the report.

use crate::{
    error::{FailureKind, ReviewError, ReviewResult},
    prompt::format_currency,
    types::{ClaimId, ProviderId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Enumerated answers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "low" => Some(Priority::Low),
            "medium" | "moderate" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Approve,
    Deny,
    RequestMoreInfo,
    Escalate,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Approve => "Approve",
            Recommendation::Deny => "Deny",
            Recommendation::RequestMoreInfo => "Request More Info",
            Recommendation::Escalate => "Escalate",
        }
    }
}

const RECOMMENDATION_PHRASES: &[(&str, Recommendation)] = &[
    ("request more info", Recommendation::RequestMoreInfo),
    ("request additional info", Recommendation::RequestMoreInfo),
    ("more info", Recommendation::RequestMoreInfo),
    ("approve", Recommendation::Approve),
    ("deny", Recommendation::Deny),
    ("reject", Recommendation::Deny),
    ("escalate", Recommendation::Escalate),
];

// ── Parsed findings ──────────────────────────────────────────────────────────

/// Structured fields recovered from an investigation answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationFindings {
    /// 1-10.
    pub likelihood: Option<u8>,
    pub red_flags: Vec<String>,
    pub priority: Option<Priority>,
    pub recommendation: Option<Recommendation>,
}

impl InvestigationFindings {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.likelihood.is_none() {
            missing.push("likelihood");
        }
        if self.red_flags.is_empty() {
            missing.push("red_flags");
        }
        if self.priority.is_none() {
            missing.push("priority");
        }
        if self.recommendation.is_none() {
            missing.push("recommendation");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Likelihood,
    RedFlags,
    Priority,
    Recommendation,
}

fn field_for_label(label: &str) -> Option<Field> {
    match label {
        "fraud likelihood" | "likelihood" | "fraud likelihood score" | "likelihood score" => {
            Some(Field::Likelihood)
        }
        "key red flags" | "red flags" | "key red flag" | "red flag" => Some(Field::RedFlags),
        "investigation priority" | "priority" => Some(Field::Priority),
        "recommendation" | "recommended action" => Some(Field::Recommendation),
        _ => None,
    }
}

/// Drop list markers, heading hashes and emphasis around a line.
fn strip_decoration(line: &str) -> &str {
    let mut s = line.trim();
    loop {
        let before = s;
        s = s.trim_start_matches(['#', '*', '_', '-', '•', '>']).trim_start();
        let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 && s[digits..].starts_with(['.', ')']) {
            s = s[digits + 1..].trim_start();
        }
        if s == before {
            return s;
        }
    }
}

/// Remove `(...)` and `[...]` qualifiers such as `(1-10)`.
fn strip_qualifiers(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn normalize_label(raw: &str) -> String {
    strip_qualifiers(raw)
        .replace(['*', '_'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn clean_value(raw: &str) -> &str {
    raw.trim().trim_matches(['*', '_', '[', ']']).trim()
}

/// Split a labelled line into its field and inline value.
fn labelled(line: &str) -> Option<(Field, &str)> {
    let body = strip_decoration(line);
    let (label, value) = body.split_once(':')?;
    let field = field_for_label(&normalize_label(label))?;
    Some((field, clean_value(value)))
}

fn parse_likelihood(value: &str) -> Option<u8> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let number: String = value[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let parsed: f64 = number.trim_end_matches('.').parse().ok()?;
    let rounded = parsed.round();
    if (1.0..=10.0).contains(&rounded) {
        Some(rounded as u8)
    } else {
        None
    }
}

fn parse_priority(value: &str) -> Option<Priority> {
    value
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .find_map(|w| Priority::from_word(&w.to_ascii_lowercase()))
}

fn parse_recommendation(value: &str) -> Option<Recommendation> {
    let lowered = value.to_ascii_lowercase();
    RECOMMENDATION_PHRASES
        .iter()
        .filter_map(|(phrase, rec)| lowered.find(phrase).map(|pos| (pos, *rec)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, rec)| rec)
}

fn split_inline_flags(value: &str) -> Vec<String> {
    let parts: Vec<&str> = if value.contains(';') {
        value.split(';').collect()
    } else {
        value.split(", ").collect()
    };
    parts
        .into_iter()
        .map(clean_value)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bullet or numbered list line.
fn is_list_item(line: &str) -> bool {
    let s = line.trim_start();
    if s.starts_with("- ") || s.starts_with("* ") || s.starts_with('•') {
        return true;
    }
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    digits > 0 && s[digits..].starts_with(['.', ')'])
}

/// `Some heading: value` with a short, purely alphabetic heading.
fn looks_like_label(line: &str) -> bool {
    let Some((label, _)) = strip_decoration(line).split_once(':') else {
        return false;
    };
    let label = normalize_label(label);
    let words: Vec<&str> = label.split_whitespace().collect();
    !words.is_empty()
        && words.len() <= 4
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_ascii_alphabetic() || c == '-'))
}

/// Fill a single-valued field unless an earlier line already did.
fn fill_scalar(findings: &mut InvestigationFindings, field: Field, value: &str) {
    match field {
        Field::Likelihood if findings.likelihood.is_none() => {
            findings.likelihood = parse_likelihood(value);
        }
        Field::Priority if findings.priority.is_none() => {
            findings.priority = parse_priority(value);
        }
        Field::Recommendation if findings.recommendation.is_none() => {
            findings.recommendation = parse_recommendation(value);
        }
        _ => {}
    }
}

/// Extract the four investigation fields from free text.
///
/// A label with nothing after the colon takes its value from the next
/// non-empty line. The red flag list ends at a blank line once it holds
/// an item, or at any line shaped like another heading.
pub fn parse_investigation(text: &str) -> InvestigationFindings {
    let mut findings = InvestigationFindings::default();
    let mut pending: Option<Field> = None;
    let mut in_flags = false;
    let mut flags_in_block = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            if in_flags && flags_in_block > 0 {
                in_flags = false;
            }
            continue;
        }

        if let Some((field, value)) = labelled(line) {
            pending = None;
            in_flags = field == Field::RedFlags;
            if in_flags {
                let items = split_inline_flags(value);
                flags_in_block = items.len();
                findings.red_flags.extend(items);
            } else if value.is_empty() {
                pending = Some(field);
            } else {
                fill_scalar(&mut findings, field, value);
            }
            continue;
        }

        if let Some(field) = pending.take() {
            fill_scalar(&mut findings, field, clean_value(strip_decoration(line)));
            continue;
        }

        if in_flags {
            if !is_list_item(line) && looks_like_label(line) {
                in_flags = false;
                continue;
            }
            let item = clean_value(strip_decoration(line));
            if !item.is_empty() {
                findings.red_flags.push(item.to_string());
                flags_in_block += 1;
            }
        }
    }

    findings
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    pub claim_id: ClaimId,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub claim_id: ClaimId,
    /// The model's answer exactly as returned.
    pub analysis: String,
    pub claim_amount: f64,
    pub provider_id: ProviderId,
    pub specialty: String,
    pub fraud_score: Option<f64>,
    pub findings: InvestigationFindings,
}

/// What a failed per-claim run leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ReviewError> for CaseFailure {
    fn from(err: &ReviewError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome<R> {
    Completed(R),
    Failed(CaseFailure),
}

/// One batch entry. Always attributable to the claim it was run for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport<R> {
    pub claim_id: ClaimId,
    pub outcome: CaseOutcome<R>,
}

impl<R> CaseReport<R> {
    pub fn from_result(claim_id: impl Into<ClaimId>, result: ReviewResult<R>) -> Self {
        let outcome = match result {
            Ok(report) => CaseOutcome::Completed(report),
            Err(err) => CaseOutcome::Failed(CaseFailure::from(&err)),
        };
        Self {
            claim_id: claim_id.into(),
            outcome,
        }
    }

    pub fn report(&self) -> Option<&R> {
        match &self.outcome {
            CaseOutcome::Completed(r) => Some(r),
            CaseOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&CaseFailure> {
        match &self.outcome {
            CaseOutcome::Completed(_) => None,
            CaseOutcome::Failed(f) => Some(f),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Completed(_))
    }
}

/// Human label for a report type, used in failure messages.
pub trait ReportLabel {
    const LABEL: &'static str;
}

impl ReportLabel for ExplanationReport {
    const LABEL: &'static str = "Explanation";
}

impl ReportLabel for InvestigationReport {
    const LABEL: &'static str = "Investigation";
}

impl fmt::Display for ExplanationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.claim_id)?;
        write!(f, "{}", self.explanation.trim())
    }
}

impl fmt::Display for InvestigationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Claim {} | {} | provider {} ({})",
            self.claim_id,
            format_currency(self.claim_amount),
            self.provider_id,
            self.specialty
        )?;
        if let Some(score) = self.fraud_score {
            writeln!(f, "  Fraud Score: {}/100", crate::prompt::format_score(score))?;
        }
        let findings = &self.findings;
        if let Some(l) = findings.likelihood {
            writeln!(f, "  Likelihood: {l}/10")?;
        }
        if let Some(p) = findings.priority {
            writeln!(f, "  Priority: {}", p.as_str())?;
        }
        if let Some(r) = findings.recommendation {
            writeln!(f, "  Recommendation: {}", r.as_str())?;
        }
        for flag in &findings.red_flags {
            writeln!(f, "  Red flag: {flag}")?;
        }
        writeln!(f, "  AI Investigation:")?;
        write!(f, "  {}", self.analysis.trim())
    }
}

impl<R: fmt::Display + ReportLabel> fmt::Display for CaseReport<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CaseOutcome::Completed(report) => write!(f, "{report}"),
            CaseOutcome::Failed(failure) => write!(
                f,
                "{} unavailable for claim {} because {}: {}",
                R::LABEL,
                self.claim_id,
                failure.kind,
                failure.message
            ),
        }
    }
}
