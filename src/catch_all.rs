use serde::{Deserialize, Serialize};

/// Thresholds for the catch-all detection heuristic. These are empirical
/// policy values, not correctness constants, so they live in settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchAllConfig {
    /// A single name with at least this many valid hits is suspect.
    #[serde(default = "default_single_min_hits")]
    pub single_min_hits: usize,
    /// Minimum candidates tried before the single-name ratio check applies.
    #[serde(default = "default_single_min_tried")]
    pub single_min_tried: usize,
    /// Single-name valid ratio above which the result is suspect.
    #[serde(default = "default_single_valid_ratio")]
    pub single_valid_ratio: f64,
    /// Per-name valid ratio that counts a name as "suspiciously good".
    #[serde(default = "default_name_valid_ratio")]
    pub name_valid_ratio: f64,
    /// Share of suspiciously good names that flags a multi-name batch.
    #[serde(default = "default_flagged_name_share")]
    pub flagged_name_share: f64,
    /// Overall valid ratio a multi-name batch must also exceed to be flagged.
    #[serde(default = "default_overall_valid_ratio")]
    pub overall_valid_ratio: f64,
}

fn default_single_min_hits() -> usize {
    5
}

fn default_single_min_tried() -> usize {
    3
}

fn default_single_valid_ratio() -> f64 {
    0.8
}

fn default_name_valid_ratio() -> f64 {
    0.7
}

fn default_flagged_name_share() -> f64 {
    0.6
}

fn default_overall_valid_ratio() -> f64 {
    0.7
}

impl Default for CatchAllConfig {
    fn default() -> Self {
        CatchAllConfig {
            single_min_hits: default_single_min_hits(),
            single_min_tried: default_single_min_tried(),
            single_valid_ratio: default_single_valid_ratio(),
            name_valid_ratio: default_name_valid_ratio(),
            flagged_name_share: default_flagged_name_share(),
            overall_valid_ratio: default_overall_valid_ratio(),
        }
    }
}

/// Candidate and hit counts for one searched name.
#[derive(Debug, Clone)]
pub struct NameTally {
    pub name: String,
    pub tried: usize,
    pub valid: usize,
}

impl NameTally {
    fn valid_ratio(&self) -> f64 {
        if self.tried == 0 {
            0.0
        } else {
            self.valid as f64 / self.tried as f64
        }
    }
}

/// Why a batch was flagged as a likely catch-all domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchAllFlag {
    pub reason: String,
}

/// Decide whether a completed finder batch looks implausibly successful.
/// Best-effort noise suppression, not a correctness guarantee: a flagged
/// batch is still reported, just not persisted.
pub fn evaluate(config: &CatchAllConfig, tallies: &[NameTally]) -> Option<CatchAllFlag> {
    let tallies: Vec<&NameTally> = tallies.iter().filter(|t| t.tried > 0).collect();
    if tallies.is_empty() {
        return None;
    }

    if tallies.len() == 1 {
        let tally = tallies[0];
        if tally.valid >= config.single_min_hits {
            return Some(CatchAllFlag {
                reason: format!(
                    "{} of {} candidates for \"{}\" verified as valid; the domain likely accepts any address",
                    tally.valid, tally.tried, tally.name
                ),
            });
        }
        if tally.tried >= config.single_min_tried
            && tally.valid_ratio() > config.single_valid_ratio
        {
            return Some(CatchAllFlag {
                reason: format!(
                    "{:.0}% of candidates for \"{}\" verified as valid; the domain likely accepts any address",
                    tally.valid_ratio() * 100.0,
                    tally.name
                ),
            });
        }
        return None;
    }

    let suspicious = tallies
        .iter()
        .filter(|t| t.valid_ratio() >= config.name_valid_ratio)
        .count();
    let suspicious_share = suspicious as f64 / tallies.len() as f64;

    let total_tried: usize = tallies.iter().map(|t| t.tried).sum();
    let total_valid: usize = tallies.iter().map(|t| t.valid).sum();
    let overall_ratio = if total_tried == 0 {
        0.0
    } else {
        total_valid as f64 / total_tried as f64
    };

    if suspicious_share >= config.flagged_name_share && overall_ratio > config.overall_valid_ratio
    {
        return Some(CatchAllFlag {
            reason: format!(
                "{} of {} names had implausibly high hit rates ({:.0}% valid overall); the domain likely accepts any address",
                suspicious,
                tallies.len(),
                overall_ratio * 100.0
            ),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(name: &str, tried: usize, valid: usize) -> NameTally {
        NameTally {
            name: name.to_string(),
            tried,
            valid,
        }
    }

    #[test]
    fn test_single_name_high_ratio_flagged() {
        let config = CatchAllConfig::default();
        let flag = evaluate(&config, &[tally("John Doe", 7, 6)]);
        assert!(flag.is_some());
    }

    #[test]
    fn test_single_name_low_ratio_not_flagged() {
        let config = CatchAllConfig::default();
        assert!(evaluate(&config, &[tally("John Doe", 7, 1)]).is_none());
    }

    #[test]
    fn test_single_name_hit_count_flags_even_at_moderate_ratio() {
        let config = CatchAllConfig::default();
        // 5 of 14 is under the ratio threshold but hits the absolute cap.
        assert!(evaluate(&config, &[tally("John Doe", 14, 5)]).is_some());
    }

    #[test]
    fn test_single_name_too_few_tried_for_ratio_check() {
        let config = CatchAllConfig::default();
        // 2/2 is a 100% ratio but too small a sample to call.
        assert!(evaluate(&config, &[tally("John Doe", 2, 2)]).is_none());
    }

    #[test]
    fn test_multi_name_batch_flagged() {
        let config = CatchAllConfig::default();
        let tallies = vec![
            tally("A", 10, 9),
            tally("B", 10, 8),
            tally("C", 10, 10),
            tally("D", 10, 2),
        ];
        // 3 of 4 names over 70%, overall 29/40 = 72.5%.
        assert!(evaluate(&config, &tallies).is_some());
    }

    #[test]
    fn test_multi_name_batch_not_flagged_on_mixed_results() {
        let config = CatchAllConfig::default();
        let tallies = vec![
            tally("A", 10, 8),
            tally("B", 10, 1),
            tally("C", 10, 0),
            tally("D", 10, 2),
        ];
        assert!(evaluate(&config, &tallies).is_none());
    }

    #[test]
    fn test_multi_name_overall_ratio_gate() {
        let config = CatchAllConfig::default();
        // Both names clear the per-name ratio, but the overall ratio sits at
        // exactly 70%, which does not exceed the gate.
        let tallies = vec![tally("A", 10, 7), tally("B", 10, 7)];
        assert!(evaluate(&config, &tallies).is_none());
    }

    #[test]
    fn test_empty_and_zero_tried_names_ignored() {
        let config = CatchAllConfig::default();
        assert!(evaluate(&config, &[]).is_none());
        assert!(evaluate(&config, &[tally("A", 0, 0)]).is_none());
    }
}
