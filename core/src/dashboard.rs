//! Aggregate fraud statistics for the review dashboard.
//!
//! Only the numbers live here; charts are drawn by whatever presents them.
//! [`DashboardCache`] keeps the last computed stats until told otherwise.

use crate::{
    error::ReviewResult,
    records::split_rules,
    store::{ClaimFlagRow, ClaimStore},
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FraudMetrics {
    pub total_claims: usize,
    pub total_amount: f64,
    pub fraud_claims: usize,
    pub fraud_amount: f64,
    /// Percentage of claims flagged, 0 when there are no claims.
    pub fraud_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCount {
    pub rule: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyVolume {
    /// Monday of the week.
    pub week_start: NaiveDate,
    pub legitimate: usize,
    pub fraud: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountBin {
    pub lower: f64,
    pub upper: f64,
    pub legitimate: usize,
    pub fraud: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub metrics: FraudMetrics,
    pub rule_counts: Vec<RuleCount>,
    pub weekly_trend: Vec<WeeklyVolume>,
    pub amount_histogram: Vec<AmountBin>,
}

impl DashboardStats {
    pub fn load(store: &ClaimStore, bins: usize) -> ReviewResult<Self> {
        let rows = store.claims_with_flags()?;
        log::info!("Computing dashboard stats over {} claims", rows.len());
        Ok(compute_stats(&rows, bins))
    }
}

pub fn compute_stats(rows: &[ClaimFlagRow], bins: usize) -> DashboardStats {
    DashboardStats {
        metrics: fraud_metrics(rows),
        rule_counts: rule_counts(rows),
        weekly_trend: weekly_trend(rows),
        amount_histogram: amount_histogram(rows, bins),
    }
}

pub fn fraud_metrics(rows: &[ClaimFlagRow]) -> FraudMetrics {
    let total_claims = rows.len();
    let total_amount = rows.iter().map(|r| r.claim_amount).sum();
    let flagged = rows.iter().filter(|r| r.fraud_detected);
    let (fraud_claims, fraud_amount) =
        flagged.fold((0usize, 0.0f64), |(n, sum), r| (n + 1, sum + r.claim_amount));
    let fraud_rate = if total_claims > 0 {
        fraud_claims as f64 / total_claims as f64 * 100.0
    } else {
        0.0
    };
    FraudMetrics {
        total_claims,
        total_amount,
        fraud_claims,
        fraud_amount,
        fraud_rate,
    }
}

/// How often each rule fired across flagged claims, most frequent first.
pub fn rule_counts(rows: &[ClaimFlagRow]) -> Vec<RuleCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for raw in rows
        .iter()
        .filter(|r| r.fraud_detected)
        .filter_map(|r| r.rules_triggered.as_deref())
    {
        for rule in split_rules(raw) {
            *counts.entry(rule).or_default() += 1;
        }
    }
    let mut out: Vec<RuleCount> = counts
        .into_iter()
        .map(|(rule, count)| RuleCount {
            rule: rule.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule.cmp(&b.rule)));
    out
}

fn parse_claim_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Flagged vs legitimate claim counts per calendar week.
pub fn weekly_trend(rows: &[ClaimFlagRow]) -> Vec<WeeklyVolume> {
    let mut weeks: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    let mut unparsed = 0usize;
    for row in rows {
        let Some(date) = parse_claim_date(&row.claim_date) else {
            unparsed += 1;
            continue;
        };
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let slot = weeks.entry(monday).or_default();
        if row.fraud_detected {
            slot.1 += 1;
        } else {
            slot.0 += 1;
        }
    }
    if unparsed > 0 {
        log::warn!("Skipped {unparsed} claims with unparseable dates in weekly trend");
    }
    weeks
        .into_iter()
        .map(|(week_start, (legitimate, fraud))| WeeklyVolume {
            week_start,
            legitimate,
            fraud,
        })
        .collect()
}

/// Equal-width histogram of claim amounts, split by flag.
pub fn amount_histogram(rows: &[ClaimFlagRow], bins: usize) -> Vec<AmountBin> {
    let amounts: Vec<f64> = rows
        .iter()
        .map(|r| r.claim_amount)
        .filter(|a| a.is_finite())
        .collect();
    if amounts.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bins = if max > min { bins } else { 1 };
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut out: Vec<AmountBin> = (0..bins)
        .map(|i| AmountBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max.max(min + width)
            } else {
                min + width * (i + 1) as f64
            },
            legitimate: 0,
            fraud: 0,
        })
        .collect();

    for row in rows.iter().filter(|r| r.claim_amount.is_finite()) {
        let idx = (((row.claim_amount - min) / width) as usize).min(bins - 1);
        if row.fraud_detected {
            out[idx].fraud += 1;
        } else {
            out[idx].legitimate += 1;
        }
    }
    out
}

/// Holds computed stats until [`invalidate`](Self::invalidate) is called.
#[derive(Debug)]
pub struct DashboardCache {
    store: ClaimStore,
    bins: usize,
    cached: Option<DashboardStats>,
}

impl DashboardCache {
    pub fn new(store: ClaimStore, bins: usize) -> Self {
        Self {
            store,
            bins,
            cached: None,
        }
    }

    /// Cached stats, computing them on first use or after invalidation.
    pub fn get(&mut self) -> ReviewResult<&DashboardStats> {
        let stats = match self.cached.take() {
            Some(stats) => stats,
            None => DashboardStats::load(&self.store, self.bins)?,
        };
        Ok(self.cached.insert(stats))
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, amount: f64, date: &str, fraud: bool, rules: Option<&str>) -> ClaimFlagRow {
        ClaimFlagRow {
            claim_id: id.into(),
            claim_amount: amount,
            claim_date: date.into(),
            fraud_detected: fraud,
            rules_triggered: rules.map(str::to_string),
        }
    }

    fn sample() -> Vec<ClaimFlagRow> {
        vec![
            row("A", 100.0, "2024-01-01", false, None),
            row("B", 900.0, "2024-01-03", true, Some("high_amount, duplicate_billing")),
            row("C", 500.0, "2024-01-08 09:30:00", true, Some("high_amount")),
            row("D", 300.0, "2024-01-09", false, Some("high_amount")),
        ]
    }

    #[test]
    fn metrics_count_flagged_share() {
        let m = fraud_metrics(&sample());
        assert_eq!(m.total_claims, 4);
        assert_eq!(m.total_amount, 1800.0);
        assert_eq!(m.fraud_claims, 2);
        assert_eq!(m.fraud_amount, 1400.0);
        assert_eq!(m.fraud_rate, 50.0);
    }

    #[test]
    fn metrics_on_empty_store_are_zero() {
        assert_eq!(fraud_metrics(&[]), FraudMetrics::default());
        assert_eq!(compute_stats(&[], 10), DashboardStats::default());
    }

    #[test]
    fn rules_counted_only_for_flagged_claims() {
        let counts = rule_counts(&sample());
        assert_eq!(
            counts,
            vec![
                RuleCount { rule: "high_amount".into(), count: 2 },
                RuleCount { rule: "duplicate_billing".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn weeks_start_on_monday() {
        let trend = weekly_trend(&sample());
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].week_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!((trend[0].legitimate, trend[0].fraud), (1, 1));
        assert_eq!(trend[1].week_start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!((trend[1].legitimate, trend[1].fraud), (1, 1));
    }

    #[test]
    fn histogram_covers_every_claim() {
        let hist = amount_histogram(&sample(), 4);
        assert_eq!(hist.len(), 4);
        assert_eq!(hist[0].lower, 100.0);
        assert_eq!(hist[3].upper, 900.0);
        let total: usize = hist.iter().map(|b| b.legitimate + b.fraud).sum();
        assert_eq!(total, 4);
        assert_eq!(hist[3].fraud, 1);
    }

    #[test]
    fn histogram_with_single_amount_has_one_bin() {
        let rows = vec![row("A", 50.0, "2024-01-01", false, None)];
        let hist = amount_histogram(&rows, 10);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].legitimate, 1);
    }
}
