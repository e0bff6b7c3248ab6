//! Metric extraction from recognized text.
//!
//! One generic algorithm runs over the static [`METRIC_BANK`]: for each
//! metric, candidates are tried in priority order, each at its first
//! occurrence, and the first captured number inside the metric's valid range
//! wins. A value that is out of range is not an error, the search simply
//! moves on to the next candidate.
//!
//! ```rust
//! use gasread::metrics::extract_from_text;
//!
//! let metrics = extract_from_text("pH 7.40 pCO2 40 mmHg\npO2 95 mmHg HCO3 24");
//! assert_eq!(metrics.get("pH"), Some(7.40));
//! assert_eq!(metrics.get("pO2"), Some(95.0));
//! assert_eq!(metrics.get("Na"), None);
//! ```

mod bank;

pub use bank::{metric_spec, MetricSpec, METRIC_BANK};

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error};

struct CompiledMetric {
    spec: &'static MetricSpec,
    patterns: Vec<Regex>,
}

lazy_static! {
    static ref COMPILED_BANK: Vec<CompiledMetric> = METRIC_BANK
        .iter()
        .map(|spec| CompiledMetric {
            spec,
            patterns: spec
                .patterns
                .iter()
                .filter_map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(!spec.case_sensitive)
                        .build()
                        .map_err(|e| error!(metric = spec.name, %pattern, "Invalid pattern: {e}"))
                        .ok()
                })
                .collect(),
        })
        .collect();
}

/// Metric name to range-checked value; unresolved metrics are absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult(BTreeMap<String, f64>);

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, f64> {
        self.0
    }

    fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }
}

/// Run the bank over recognized lines.
///
/// Lines are joined with spaces so labels and values split across lines by
/// the engine still pair up.
pub fn extract_metrics<S: AsRef<str>>(lines: &[S]) -> ExtractionResult {
    let text = lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<_>>()
        .join(" ");

    let mut result = ExtractionResult::new();
    for metric in COMPILED_BANK.iter() {
        if let Some(value) = match_metric(metric, &text) {
            result.insert(metric.spec.name, value);
        }
    }
    debug!(found = result.len(), "Extracted metrics");
    result
}

/// Split raw text into trimmed non-empty lines and extract
pub fn extract_from_text(raw: &str) -> ExtractionResult {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    extract_metrics(&lines)
}

/// Value of a single metric in `text`, if any candidate yields one in range
pub fn extract_metric(name: &str, text: &str) -> Option<f64> {
    COMPILED_BANK
        .iter()
        .find(|metric| metric.spec.name == name)
        .and_then(|metric| match_metric(metric, text))
}

/// Each candidate is judged on its first occurrence only
fn match_metric(metric: &CompiledMetric, text: &str) -> Option<f64> {
    metric.patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|m| parse_number(m.as_str()))
            .filter(|&value| metric.spec.in_range(value))
    })
}

/// Parse a captured number, accepting `,` as the decimal separator
pub fn parse_number(raw: &str) -> Option<f64> {
    let normalized = raw
        .trim()
        .trim_end_matches(['.', ','])
        .replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Number of patterns that compiled, for diagnostics
pub fn compiled_pattern_count() -> usize {
    COMPILED_BANK.iter().map(|m| m.patterns.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        let declared: usize = METRIC_BANK.iter().map(|m| m.patterns.len()).sum();
        assert_eq!(compiled_pattern_count(), declared);
    }

    #[test]
    fn test_basic_printout() {
        let result = extract_from_text("pH 7.40 pCO2 40 mmHg pO2 95 mmHg HCO3 24");
        assert_eq!(
            result.into_map(),
            map(&[("HCO3", 24.0), ("pCO2", 40.0), ("pH", 7.40), ("pO2", 95.0)])
        );
    }

    #[test]
    fn test_noisy_labels() {
        let result = extract_from_text("pH(T) 7.318 pCcO(T) 25.9");
        assert_eq!(result.into_map(), map(&[("pCO2", 25.9), ("pH", 7.318)]));
    }

    #[test]
    fn test_out_of_range_is_dropped() {
        assert!(!extract_from_text("Na 999").contains("Na"));
        assert!(!extract_from_text("pH 73.2").contains("pH"));
    }

    #[test]
    fn test_comma_decimal_separator() {
        let result = extract_from_text("pH 7,35\nK+ 4,1 mmol/L\nCa2+ 1,18");
        assert_eq!(result.get("pH"), Some(7.35));
        assert_eq!(result.get("K"), Some(4.1));
        assert_eq!(result.get("Ca"), Some(1.18));
    }

    #[test]
    fn test_electrolyte_panel() {
        let result = extract_from_text(
            "cNa+ 138 mmol/L\ncK+ 4.2 mmol/L\ncCl- 104 mmol/L\ncCa2+ 1.21 mmol/L\nctHb 13.8 g/dL\ncGlu 5.6 mmol/L\ncLac 1.2 mmol/L",
        );
        assert_eq!(result.get("Na"), Some(138.0));
        assert_eq!(result.get("K"), Some(4.2));
        assert_eq!(result.get("Cl"), Some(104.0));
        assert_eq!(result.get("Ca"), Some(1.21));
        assert_eq!(result.get("Hb"), Some(13.8));
        assert_eq!(result.get("glucose"), Some(5.6));
        assert_eq!(result.get("lactate"), Some(1.2));
    }

    #[test]
    fn test_negative_base_excess() {
        assert_eq!(extract_from_text("cBase(Ecf) -4.2 mmol/L").get("BE"), Some(-4.2));
        assert_eq!(extract_from_text("BE: +2.1").get("BE"), Some(2.1));
    }

    #[test]
    fn test_first_in_range_candidate_wins() {
        // The bare label form alone would capture 55
        let text = "pCO2 55 pCO2 38.5 mmHg";
        assert_eq!(extract_metric("pCO2", text), Some(38.5));
    }

    #[test]
    fn test_out_of_range_moves_to_next_candidate() {
        // "Na 99" is rejected, so the Sodium form answers before the later "Na 150"
        assert_eq!(extract_metric("Na", "Na 99 Sodium 140 Na 150"), Some(140.0));
        assert_eq!(extract_metric("Na", "Na 99 Na 150"), None);
    }

    #[test]
    fn test_next_candidate_after_out_of_range_label() {
        // "FO2Hb 97.1" also matches the Hb label but is out of Hb's range
        let result = extract_from_text("FO2Hb 97.1 %\nctHb 14.2 g/dL");
        assert_eq!(result.get("Hb"), Some(14.2));
        assert_eq!(result.get("FO2Hb"), Some(97.1));
    }

    #[test]
    fn test_oximetry_fractions() {
        let result = extract_from_text("sO2 97.5 %\nFCOHb 1.2 %\nFMetHb 0.8 %\nFiO2 21.0 %");
        assert_eq!(result.get("SO2"), Some(97.5));
        assert_eq!(result.get("FCOHb"), Some(1.2));
        assert_eq!(result.get("FMetHb"), Some(0.8));
        assert_eq!(result.get("FiO2"), Some(21.0));
    }

    #[test]
    fn test_lines_are_joined() {
        let lines = vec!["pH".to_string(), "7.29".to_string()];
        assert_eq!(extract_metrics(&lines).get("pH"), Some(7.29));
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_from_text("").is_empty());
        assert!(extract_metrics::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("7.40"), Some(7.4));
        assert_eq!(parse_number("7,40"), Some(7.4));
        assert_eq!(parse_number("40."), Some(40.0));
        assert_eq!(parse_number("-4.2"), Some(-4.2));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("."), None);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let result = extract_from_text("pH 7.40 HCO3 24");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"HCO3": 24.0, "pH": 7.4}));
    }
}
