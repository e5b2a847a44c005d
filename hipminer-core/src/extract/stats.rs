//! Query-time aggregation over parameter snapshots.
//!
//! Aggregates are computed over snapshots whose stored value is a plain
//! decimal number — JSON sequences and quoted text don't contribute. The
//! reported usage range trims 10% off each end of the observed interval,
//! which downstream annotation uses to calibrate "safe" parameter values.

use std::collections::BTreeMap;

use crate::store::HipStore;
use crate::types::ParamStats;

/// Fraction trimmed from each end of `[min, max]` for the usage range.
const RANGE_TRIM: f64 = 0.1;

/// Per-parameter aggregates for one node type.
///
/// Without an explicit `param_name`, parameters with fewer than two usable
/// samples are omitted — a single observation says nothing about usage. An
/// explicitly requested parameter is always reported when any sample exists.
pub async fn param_stats(
    store: &dyn HipStore,
    node_type: &str,
    param_name: Option<&str>,
) -> crate::error::Result<Vec<ParamStats>> {
    let rows = store.snapshot_values(node_type, param_name).await?;

    let mut groups: BTreeMap<String, (Vec<f64>, u64)> = BTreeMap::new();
    for row in rows {
        let Some(value) = parse_plain_number(&row.param_value) else {
            continue;
        };
        let (samples, modified) = groups.entry(row.param_name).or_default();
        samples.push(value);
        if !row.is_default {
            *modified += 1;
        }
    }

    let mut results = Vec::new();
    for (name, (samples, modified_count)) in groups {
        if param_name.is_none() && samples.len() < 2 {
            continue;
        }
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        results.push(ParamStats {
            node_type: node_type.to_string(),
            param_name: name,
            sample_count: samples.len() as u64,
            min,
            max,
            mean,
            modified_count,
            usage_range: usage_range(min, max),
        });
    }
    Ok(results)
}

/// The central interval after trimming 10% off each end, clamped to
/// `[min, max]`.
fn usage_range(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    let low = (min + RANGE_TRIM * span).clamp(min, max);
    let high = (max - RANGE_TRIM * span).clamp(min, max);
    (low, high)
}

/// Parse a value in the plain-number grammar: optional sign, decimal digits,
/// optional decimal point. Exponents, infinities, hex, and anything quoted
/// are rejected.
fn parse_plain_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    if unsigned.is_empty() {
        return None;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }
    trimmed.parse().ok()
}

#[cfg(test)]
mod tests {
    use crate::store::sqlite::SqliteStore;
    use crate::types::{HipFileId, HipFileRecord, ParamSnapshot, ParseStatus, SourceKind};

    use super::*;

    #[test]
    fn plain_number_grammar() {
        assert_eq!(parse_plain_number("0.05"), Some(0.05));
        assert_eq!(parse_plain_number("-3"), Some(-3.0));
        assert_eq!(parse_plain_number("+1.5"), Some(1.5));
        assert_eq!(parse_plain_number(" 42 "), Some(42.0));
        assert_eq!(parse_plain_number("1e5"), None);
        assert_eq!(parse_plain_number("[1.0,2.0]"), None);
        assert_eq!(parse_plain_number("\"0.5\""), None);
        assert_eq!(parse_plain_number("1.2.3"), None);
        assert_eq!(parse_plain_number("."), None);
        assert_eq!(parse_plain_number(""), None);
    }

    #[test]
    fn usage_range_trims_ten_percent() {
        assert_eq!(usage_range(0.0, 1.0), (0.1, 0.9));
        assert_eq!(usage_range(5.0, 5.0), (5.0, 5.0));
        let (low, high) = usage_range(-10.0, 10.0);
        assert!((low - -8.0).abs() < 1e-12);
        assert!((high - 8.0).abs() < 1e-12);
    }

    async fn seed_store(values: &[(&str, &str, bool)]) -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        let snapshots: Vec<ParamSnapshot> = values
            .iter()
            .map(|(name, value, is_default)| ParamSnapshot {
                node_type: "pyrosolver".to_string(),
                node_path: "/obj/sim/pyro1".to_string(),
                param_name: (*name).to_string(),
                param_value: (*value).to_string(),
                is_default: *is_default,
                expression: None,
            })
            .collect();
        let record = HipFileRecord {
            id: HipFileId(0),
            file_name: "seed.hip".to_string(),
            file_hash: "seed".to_string(),
            source: SourceKind::ContentLibrary,
            source_url: String::new(),
            houdini_version: String::new(),
            description: None,
            systems: Vec::new(),
            node_count: 1,
            parsed_at: chrono::Utc::now(),
            parse_status: ParseStatus::Success,
            parse_error: None,
        };
        store.record_scene(&record, &snapshots).await.unwrap();
        store
    }

    #[tokio::test]
    async fn dissipation_aggregate_matches_expectations() {
        let store = seed_store(&[
            ("dissipation", "0", true),
            ("dissipation", "0.1", false),
            ("dissipation", "0.2", false),
            ("dissipation", "0.3", false),
            ("dissipation", "1", false),
        ])
        .await;

        let stats = param_stats(&store, "pyrosolver", Some("dissipation"))
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!(s.sample_count, 5);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 1.0);
        assert!((s.mean - 0.32).abs() < 1e-12);
        assert_eq!(s.modified_count, 4);
        assert!((s.usage_range.0 - 0.1).abs() < 1e-12);
        assert!((s.usage_range.1 - 0.9).abs() < 1e-12);
    }

    #[tokio::test]
    async fn usage_range_is_within_min_max() {
        let store = seed_store(&[
            ("cooling", "0.2", true),
            ("cooling", "0.9", false),
            ("temp", "-4", false),
            ("temp", "12.5", false),
        ])
        .await;

        for s in param_stats(&store, "pyrosolver", None).await.unwrap() {
            assert!(s.usage_range.0 >= s.min);
            assert!(s.usage_range.1 <= s.max);
            assert!(s.usage_range.0 <= s.usage_range.1);
        }
    }

    #[tokio::test]
    async fn thin_parameters_are_excluded_from_listing() {
        let store = seed_store(&[
            ("dissipation", "0.1", true),
            ("dissipation", "0.2", true),
            ("lonely", "5", true),
        ])
        .await;

        let all = param_stats(&store, "pyrosolver", None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].param_name, "dissipation");

        // Explicit request still returns the thin parameter.
        let one = param_stats(&store, "pyrosolver", Some("lonely"))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].sample_count, 1);
    }

    #[tokio::test]
    async fn non_numeric_values_are_ignored() {
        let store = seed_store(&[
            ("scale", "1.5", true),
            ("scale", "2.5", false),
            ("scale", "\"$HIP/geo\"", false),
            ("scale", "[1.0,2.0,3.0]", false),
        ])
        .await;

        let stats = param_stats(&store, "pyrosolver", Some("scale"))
            .await
            .unwrap();
        assert_eq!(stats[0].sample_count, 2);
        assert_eq!(stats[0].min, 1.5);
        assert_eq!(stats[0].max, 2.5);
    }

    #[tokio::test]
    async fn unknown_node_type_yields_empty() {
        let store = seed_store(&[("x", "1", true)]).await;
        let stats = param_stats(&store, "merge", None).await.unwrap();
        assert!(stats.is_empty());
    }
}
