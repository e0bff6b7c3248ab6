//! The pattern bank.
//!
//! Each entry lists candidate patterns in priority order. The first capture
//! group of a candidate holds the number. Alternates after the first are
//! tuned to misreadings seen on real analyzer printouts (`pCcO`, `DH` for
//! `pH`, a stray `3` glued to `Na`, `~COHb` and so on). Numbers accept `.` or
//! `,` as the decimal separator.

/// One extractable metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    pub name: &'static str,
    /// Candidate patterns, highest priority first
    pub patterns: &'static [&'static str],
    /// Inclusive physiologically valid range
    pub range: (f64, f64),
    pub case_sensitive: bool,
}

impl MetricSpec {
    pub fn in_range(&self, value: f64) -> bool {
        value >= self.range.0 && value <= self.range.1
    }
}

/// Extraction order is table order
pub static METRIC_BANK: &[MetricSpec] = &[
    MetricSpec {
        name: "pH",
        patterns: &[
            r"pH\s*\(?T?\)?\s*:?\s*([67][.,]\d{1,3})",
            r"DH\s+([67][.,]\d{1,3})",
            r"PCO[,2]?\s+([67][.,]\d{1,3})",
        ],
        range: (6.5, 8.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "pCO2",
        patterns: &[
            r"pCO[,2]?\s*\(?T?\s*\)?\s*:?\s*(\d{1,3}[.,]?\d*)\s*(?:mmHg|mm)",
            r"PO[,2]?\s+(\d{2,3}[.,]\d)\s+(?:Hg|mmHg)",
            r"pCO2\s*:?\s*(\d{1,3}[.,]?\d*)",
            r"p[Cc]{1,2}[Oo0][,2]?\s*\(?T?\)?\s*:?\s*(\d{1,3}[.,]\d+)",
        ],
        range: (10.0, 150.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "pO2",
        patterns: &[
            r"pO[,2]?\s*\(?T?\)?\s*[:\s]+(\d{2,3})\s*(?:mmHg|mm|nie)",
            r"Oximetry\s+Values\s+(\d{2,3})",
            r"pO2\s*:?\s*(\d{1,3}[.,]?\d*)",
        ],
        range: (10.0, 600.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "HCO3",
        patterns: &[
            r"[cC]?HCO3?[-]?\s*[:(]?\s*P?\s*,?\s*st?\s*\)?\s*c?\s*:?\s*(\d{1,2}[.,]?\d*)",
            r"HCO3\s*(\d{1,2}[.,]?\d*)",
            r"Bicarb[^0-9]*(\d{1,2}[.,]?\d*)",
        ],
        range: (5.0, 60.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "BE",
        patterns: &[
            r"[cC]?Base\s*\(?[Ee]?[Cc]?[Ff]?\)?\s*[cC]?\s*:?\s*([-+]?\d{1,2}[.,]?\d*)",
            r"BE[cC]?\s*:?\s*([-+]?\d{1,2}[.,]?\d*)",
            r"Base\s*Excess[^0-9+-]*([-+]?\d{1,2}[.,]?\d*)",
        ],
        range: (-30.0, 30.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "Na",
        patterns: &[
            r"[cC]?Na[t+]?\s*:?\s*(\d{2,3})(?:\s*(?:mmol|mmo))?",
            r"Sodium[^0-9]*(\d{2,3})",
            r"3Na[t+]?\s*(\d{2,3})",
        ],
        range: (100.0, 180.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "K",
        patterns: &[
            r"[cC>]?K[t+*]?\s*:?\s*(\d[.,]\d{1,2})(?:\s*(?:mmol|mmo))?",
            r"Potassium[^0-9]*(\d[.,]\d{1,2})",
        ],
        range: (1.0, 10.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "Cl",
        patterns: &[
            r"[cCes]?Cl[-]?\s*:?\s*(\d{2,3})(?:\s*(?:mmol|mmo))?",
            r"Chloride[^0-9]*(\d{2,3})",
        ],
        range: (70.0, 150.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "Ca",
        patterns: &[
            r"[cCes]?Ca2?\+?\s*:?\s*(\d[.,]\d{1,2})(?:\s*(?:mmol|mmo))?",
            r"Calcium[^0-9]*(\d[.,]\d{1,2})",
            r"5Ca2?\+?\s*(\d[.,]\d{1,2})",
        ],
        range: (0.5, 3.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "Hb",
        patterns: &[
            r"[cCes]?t?Hb\s*:?\s*(\d{1,2}[.,]?\d*)(?:\s*g/dL)?",
            r"ctHb\s*(\d{1,2}[.,]?\d*)",
            r"StHb\s*(\d{1,2}[.,]?\d*)",
            r"Hemoglobin[^0-9]*(\d{1,2}[.,]?\d*)",
        ],
        range: (3.0, 25.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "SO2",
        patterns: &[
            r"[sS][oO]2\s*:?\s*(\d{1,3}[.,]?\d*)(?:\s*%)?",
            r"30[,2]?\s*(\d{1,3}[.,]?\d*)\s*%",
            r"Saturation[^0-9]*(\d{1,3}[.,]?\d*)",
        ],
        range: (0.0, 100.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "lactate",
        patterns: &[
            r"[cCes]?Lac\s*:?\s*(\d{1,2}[.,]?\d*)(?:\s*(?:mmol|mmo))?",
            r"slac\s*(\d{1,2}[.,]?\d*)",
            r"eLac\s*(\d{1,2}[.,]?\d*)",
            r"Lactate[^0-9]*(\d{1,2}[.,]?\d*)",
        ],
        range: (0.0, 30.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "glucose",
        patterns: &[
            r"[cCes]?Glu\s*:?\s*(\d{1,3}[.,]?\d*)(?:\s*(?:mmol|mmo))?",
            r"eGlu\s*(\d{1,3}[.,]?\d*)",
            r"Glucose[^0-9]*(\d{1,3}[.,]?\d*)",
        ],
        range: (0.5, 50.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "FiO2",
        patterns: &[r"F[iI][oO]2\s*:?\s*(\d{1,3}[.,]?\d*)(?:\s*%)?"],
        range: (21.0, 100.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "Hct",
        patterns: &[
            r"Hct\s*:?\s*(\d{1,2}[.,]?\d*)(?:\s*%)?",
            r"Hematocrit[^0-9]*(\d{1,2}[.,]?\d*)",
        ],
        range: (10.0, 70.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "ctO2",
        patterns: &[
            r"[cCes]?tO2[cC]?\s*:?\s*(\d{1,2}[.,]?\d*)(?:\s*Vol%)?",
            r"LC\s*(\d{1,2}[.,]?\d*)\s*Vol%",
        ],
        range: (5.0, 30.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "Bilirubin",
        patterns: &[
            r"[cCes]?t?Bil\s*:?\s*(\d{1,3}[.,]?\d*)(?:\s*(?:umol|µmol))?",
            r"stBil\s*(\d{1,3}[.,]?\d*)",
        ],
        range: (0.0, 500.0),
        case_sensitive: false,
    },
    MetricSpec {
        name: "FO2Hb",
        patterns: &[r"F[oO]2?[Hh][bB]\s*:?\s*(\d{1,3}[.,]?\d*)(?:\s*%)?"],
        range: (0.0, 100.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "FCOHb",
        patterns: &[
            r"F?COHb\s*:?\s*(\d{1,2}[.,]?\d*)(?:\s*%)?",
            r"~COHb\s*(\d{1,2}[.,]?\d*)",
        ],
        range: (0.0, 100.0),
        case_sensitive: true,
    },
    MetricSpec {
        name: "FMetHb",
        patterns: &[r"F?Met[Hh][bB]\s*:?\s*(\d{1,2}[.,]?\d*)(?:\s*%)?"],
        range: (0.0, 100.0),
        case_sensitive: true,
    },
];

/// Look up a metric by name
pub fn metric_spec(name: &str) -> Option<&'static MetricSpec> {
    METRIC_BANK.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bank_names_are_unique() {
        let names: HashSet<_> = METRIC_BANK.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), METRIC_BANK.len());
        assert_eq!(METRIC_BANK.len(), 20);
    }

    #[test]
    fn test_bank_order_starts_with_gases() {
        let first: Vec<_> = METRIC_BANK.iter().take(5).map(|m| m.name).collect();
        assert_eq!(first, vec!["pH", "pCO2", "pO2", "HCO3", "BE"]);
    }

    #[test]
    fn test_ranges_are_ordered() {
        for spec in METRIC_BANK {
            assert!(spec.range.0 < spec.range.1, "{} has an inverted range", spec.name);
            assert!(!spec.patterns.is_empty(), "{} has no patterns", spec.name);
        }
    }

    #[test]
    fn test_every_pattern_compiles_with_one_group() {
        for spec in METRIC_BANK {
            for pattern in spec.patterns {
                let regex = regex::Regex::new(pattern)
                    .unwrap_or_else(|e| panic!("{}: {pattern}: {e}", spec.name));
                assert_eq!(regex.captures_len(), 2, "{}: {pattern}", spec.name);
            }
        }
    }

    #[test]
    fn test_metric_lookup() {
        let ph = metric_spec("pH").unwrap();
        assert!(ph.in_range(7.4));
        assert!(!ph.in_range(73.2));
        assert!(metric_spec("troponin").is_none());
    }
}
