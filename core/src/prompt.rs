//! Prompt templates for the two review modes.
//!
//! Both builders are pure: the same bundle always renders the same text.
//! Absent optional numbers render as [`NOT_AVAILABLE`], never as zero.

use crate::{
    evidence::EvidenceBundle,
    records::{split_rules, ClaimSummary},
    report::InvestigationFindings,
};
use std::fmt::Write;

/// Placeholder for any value the store does not have.
pub const NOT_AVAILABLE: &str = "not available";

// Section labels the model is asked to answer under. The response parser
// looks for the same labels.
pub const LIKELIHOOD_HEADER: &str = "FRAUD LIKELIHOOD:";
pub const RED_FLAGS_HEADER: &str = "KEY RED FLAGS:";
pub const PRIORITY_HEADER: &str = "INVESTIGATION PRIORITY:";
pub const RECOMMENDATION_HEADER: &str = "RECOMMENDATION:";

/// Statistical vocabulary that must not reach a plain-language explanation,
/// with the wording substituted for it. Longer phrases come first.
const JARGON: &[(&str, &str)] = &[
    ("statistical outlier", "highly unusual case"),
    ("z-score", "deviation measure"),
    ("z score", "deviation measure"),
    ("zscore", "deviation_measure"),
    ("outliers", "unusual cases"),
    ("outlier", "unusual case"),
];

// ── Formatting helpers ───────────────────────────────────────────────────────

/// `$1,234.50` style: two decimals, comma grouping, leading minus if negative.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Up to two decimals, trailing zeros dropped: `85`, `72.5`, `85.25`.
pub fn format_score(score: f64) -> String {
    let fixed = format!("{score:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn currency_or_na(value: Option<f64>) -> String {
    value.map(format_currency).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn count_or_na(value: Option<i64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn text_or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

fn rules_or_none(raw: &str) -> String {
    let rules = split_rules(raw);
    if rules.is_empty() {
        "none recorded".to_string()
    } else {
        rules.join(", ")
    }
}

/// Replace statistical jargon, ignoring ASCII case.
pub fn scrub_jargon(text: &str) -> String {
    let mut out = text.to_string();
    for (term, plain) in JARGON {
        out = replace_ignore_ascii_case(&out, term, plain);
    }
    out
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    // ASCII lowercasing keeps byte offsets identical to the original.
    let lowered = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(pos) = lowered[cursor..].find(needle) {
        let start = cursor + pos;
        out.push_str(&haystack[cursor..start]);
        out.push_str(replacement);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}

fn write_history(out: &mut String, rows: &[ClaimSummary]) {
    if rows.is_empty() {
        out.push_str("- No prior claims on record\n");
        return;
    }
    for row in rows {
        let detail = row
            .status
            .as_deref()
            .or(row.specialty.as_deref())
            .unwrap_or(NOT_AVAILABLE);
        let label = match row.is_fraud {
            Some(true) => "confirmed fraud",
            Some(false) => "not fraud",
            None => "unlabelled",
        };
        let _ = writeln!(
            out,
            "- {} | {} | {} | {}",
            row.claim_date,
            format_currency(row.claim_amount),
            detail,
            label
        );
    }
}

// ── Explanation prompt ───────────────────────────────────────────────────────

/// Plain-language prompt for a non-technical adjuster.
pub fn build_explanation_prompt(bundle: &EvidenceBundle) -> String {
    build_explanation_prompt_with(bundle, None)
}

/// Explanation prompt, optionally enriched with an earlier investigation.
pub fn build_explanation_prompt_with(
    bundle: &EvidenceBundle,
    investigation: Option<&InvestigationFindings>,
) -> String {
    let claim = &bundle.claim;
    let (score, rules, technical) = match &bundle.fraud_flag {
        Some(flag) => (
            format!("{}/100", format_score(flag.fraud_score)),
            rules_or_none(&flag.rules_triggered),
            text_or_na(&flag.explanation).to_string(),
        ),
        None => (
            NOT_AVAILABLE.to_string(),
            "none recorded".to_string(),
            NOT_AVAILABLE.to_string(),
        ),
    };

    let mut p = String::new();
    p.push_str("You are explaining a fraud case to a non-technical insurance adjuster.\n\n");

    p.push_str("CLAIM INFORMATION:\n");
    let _ = writeln!(p, "- Claim ID: {}", claim.claim_id);
    let _ = writeln!(p, "- Amount: {}", format_currency(claim.claim_amount));
    let _ = writeln!(p, "- Provider: {}", text_or_na(&claim.provider_specialty));
    let _ = writeln!(p, "- Procedure: {}", text_or_na(&claim.procedure_code));
    let _ = writeln!(p, "- Diagnosis: {}", text_or_na(&claim.diagnosis_code));
    p.push('\n');

    p.push_str("FRAUD DETECTION RESULTS:\n");
    let _ = writeln!(p, "- Fraud Score: {score}");
    let _ = writeln!(p, "- Rules Triggered: {rules}");
    let _ = writeln!(p, "- Technical Explanation: {technical}");
    p.push('\n');

    if let Some(findings) = investigation {
        p.push_str("PRIOR INVESTIGATION FINDINGS:\n");
        let _ = writeln!(
            p,
            "- Likelihood: {}",
            findings
                .likelihood
                .map(|l| format!("{l}/10"))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        );
        let flags = if findings.red_flags.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            findings.red_flags.join("; ")
        };
        let _ = writeln!(p, "- Red Flags: {flags}");
        let _ = writeln!(
            p,
            "- Priority: {}",
            findings
                .priority
                .map(|v| v.as_str())
                .unwrap_or(NOT_AVAILABLE)
        );
        let _ = writeln!(
            p,
            "- Recommendation: {}",
            findings
                .recommendation
                .map(|v| v.as_str())
                .unwrap_or(NOT_AVAILABLE)
        );
        p.push('\n');
    }

    p.push_str("Generate a clear, concise explanation (2-3 sentences) that:\n");
    p.push_str("1. States WHY this claim is suspicious\n");
    p.push_str("2. Highlights the KEY red flag\n");
    p.push_str("3. Is understandable to someone without technical knowledge\n\n");
    p.push_str(
        "Do not use statistical jargon such as standardized deviation scores, standard \
         deviations or percentiles. Use plain language like \"unusually high amount\" or \
         \"multiple claims in short time\".\n\n",
    );
    p.push_str("Example format:\n");
    p.push_str(
        "\"This claim is flagged as suspicious because [main reason]. Specifically, \
         [key red flag]. This pattern is commonly associated with fraudulent billing.\"\n\n",
    );
    p.push_str("Your explanation:");

    // Upstream text may carry the scoring job's vocabulary.
    scrub_jargon(&p)
}

// ── Investigation prompt ─────────────────────────────────────────────────────

/// Structured prompt asking for the four labelled answer fields.
pub fn build_investigation_prompt(bundle: &EvidenceBundle) -> String {
    let claim = &bundle.claim;
    let provider = &bundle.provider.stats;
    let patient = &bundle.patient.stats;

    let mut p = String::new();
    p.push_str(
        "You are an expert fraud investigator analyzing an insurance claim flagged as \
         potentially fraudulent.\n\n",
    );

    p.push_str("CLAIM DETAILS:\n");
    let _ = writeln!(p, "- Claim ID: {}", claim.claim_id);
    let _ = writeln!(p, "- Amount: {}", format_currency(claim.claim_amount));
    let _ = writeln!(p, "- Date: {}", text_or_na(&claim.claim_date));
    let _ = writeln!(
        p,
        "- Provider: {} ({})",
        text_or_na(&claim.provider_id),
        text_or_na(&claim.provider_specialty)
    );
    let _ = writeln!(p, "- Procedure: {}", text_or_na(&claim.procedure_code));
    let _ = writeln!(p, "- Diagnosis: {}", text_or_na(&claim.diagnosis_code));
    let _ = writeln!(p, "- Status: {}", text_or_na(&claim.status));
    p.push('\n');

    p.push_str("FRAUD FLAGS TRIGGERED:\n");
    match &bundle.fraud_flag {
        Some(flag) => {
            let _ = writeln!(p, "- Rules: {}", rules_or_none(&flag.rules_triggered));
            let _ = writeln!(p, "- Fraud Score: {}/100", format_score(flag.fraud_score));
            let _ = writeln!(p, "- Explanation: {}", text_or_na(&flag.explanation));
        }
        None => {
            p.push_str("- Rules: none recorded\n");
            let _ = writeln!(p, "- Fraud Score: {NOT_AVAILABLE}");
            let _ = writeln!(p, "- Explanation: {NOT_AVAILABLE}");
        }
    }
    p.push('\n');

    p.push_str("PROVIDER CONTEXT:\n");
    let _ = writeln!(p, "- Total claims submitted: {}", count_or_na(provider.total_claims));
    let _ = writeln!(p, "- Average claim amount: {}", currency_or_na(provider.avg_claim_amount));
    let _ = writeln!(p, "- Total billed: {}", currency_or_na(provider.total_billed));
    let _ = writeln!(p, "- Previous fraud cases: {}", count_or_na(provider.fraud_claims));
    p.push_str("- Recent claims (newest first, date | amount | status | label):\n");
    write_history(&mut p, &bundle.provider.recent_claims);
    p.push('\n');

    p.push_str("PATIENT CONTEXT:\n");
    let _ = writeln!(p, "- Total claims: {}", count_or_na(patient.total_claims));
    let _ = writeln!(p, "- Total spent: {}", currency_or_na(patient.total_spent));
    let _ = writeln!(p, "- Previous fraud cases: {}", count_or_na(patient.fraud_claims));
    p.push_str("- Recent claims (newest first, date | amount | specialty | label):\n");
    write_history(&mut p, &bundle.patient.recent_claims);
    p.push('\n');

    let zscore = claim
        .amount_zscore
        .map(|z| format!("{z:.2}"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let _ = writeln!(
        p,
        "CLAIM Z-SCORE: {zscore} (higher = more unusual for specialty)\n"
    );

    p.push_str(
        "Based on this information, provide a concise fraud investigation report in the \
         following format:\n\n",
    );
    let _ = writeln!(p, "{LIKELIHOOD_HEADER} [1-10 score]");
    let _ = writeln!(p, "{RED_FLAGS_HEADER} [2-3 specific concerns]");
    let _ = writeln!(p, "{PRIORITY_HEADER} [Low/Medium/High/Critical]");
    let _ = writeln!(
        p,
        "{RECOMMENDATION_HEADER} [Approve/Deny/Request More Info/Escalate]\n"
    );
    p.push_str(
        "Keep your response concise and focus on the most important fraud indicators.",
    );
    p
}
