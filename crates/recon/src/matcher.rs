use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::header::HeaderString;
use crate::mapping::ColumnMapping;
use crate::similarity::weighted_ratio;

/// Minimum fuzzy score accepted as a match.
pub const DEFAULT_THRESHOLD: u8 = 80;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Similarity function used by the fuzzy pass (0–100).
pub trait Scorer {
    fn score(&self, external: &str, target: &str) -> u8;
}

/// Default scorer: [`weighted_ratio`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio;

impl Scorer for WeightedRatio {
    fn score(&self, external: &str, target: &str) -> u8 {
        weighted_ratio(external, target)
    }
}

impl<F> Scorer for F
where
    F: Fn(&str, &str) -> u8,
{
    fn score(&self, external: &str, target: &str) -> u8 {
        self(external, target)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of the crosswalk table: raw external and target headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    pub external: Option<String>,
    pub target: Option<String>,
}

impl HeaderPair {
    pub fn new(external: Option<&str>, target: Option<&str>) -> Self {
        Self {
            external: external.map(str::to_string),
            target: target.map(str::to_string),
        }
    }
}

/// Pair two header lists row by row; the shorter list is padded with missing headers.
pub fn pair_headers(external: &[String], target: &[String]) -> Vec<HeaderPair> {
    let len = external.len().max(target.len());
    (0..len)
        .map(|i| HeaderPair::new(external.get(i).map(String::as_str), target.get(i).map(String::as_str)))
        .collect()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy { score: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchDecision {
    pub external: String,
    pub target: String,
    #[serde(flatten)]
    pub kind: MatchKind,
}

/// An external header that found no target at or above the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedHeader {
    pub external: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<u8>,
}

impl std::fmt::Display for UnmatchedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.best_candidate, self.best_score) {
            (Some(c), Some(s)) => write!(f, "no good match for '{}' (best '{}' scored {})", self.external, c, s),
            _ => write!(f, "no good match for '{}' (no candidates left)", self.external),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub mapping: ColumnMapping,
    pub decisions: Vec<MatchDecision>,
    pub unmatched: Vec<UnmatchedHeader>,
    /// Matches made by a repeated external header after its first mapping.
    pub duplicates: Vec<MatchDecision>,
    /// Target headers never claimed by any external header.
    pub unclaimed_targets: Vec<String>,
}

impl MatchOutcome {
    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Resolve external → target headers with the default scorer.
pub fn match_columns(pairs: &[HeaderPair], config: &MatcherConfig) -> MatchOutcome {
    match_columns_with(pairs, config, &WeightedRatio)
}

/// Resolve external → target headers: exact pass over aligned pairs, exact
/// pass across the leftovers, then a fuzzy pass of every remaining external
/// header against the remaining targets.
///
/// Fuzzy ties go to the earliest target in input order. A claimed target
/// leaves the pool, so no target is mapped twice.
pub fn match_columns_with<S: Scorer>(
    pairs: &[HeaderPair],
    config: &MatcherConfig,
    scorer: &S,
) -> MatchOutcome {
    let mut mapping = ColumnMapping::new();
    let mut decisions = Vec::new();
    let mut duplicates = Vec::new();
    let mut external_pool: Vec<String> = Vec::new();
    let mut target_pool: Vec<String> = Vec::new();

    for pair in pairs {
        let external = HeaderString::new(pair.external.as_deref()).normalized;
        let target = HeaderString::new(pair.target.as_deref()).normalized;

        if !external.is_empty() && external == target {
            record(&mut mapping, &mut decisions, &mut duplicates, external, target, MatchKind::Exact);
            continue;
        }
        if !external.is_empty() {
            external_pool.push(external);
        }
        if !target.is_empty() {
            target_pool.push(target);
        }
    }

    // Equal names on different rows still match exactly, before any scoring.
    let mut fuzzy_pool = Vec::with_capacity(external_pool.len());
    for external in external_pool {
        match target_pool.iter().position(|t| *t == external) {
            Some(i) => {
                let target = target_pool.remove(i);
                record(&mut mapping, &mut decisions, &mut duplicates, external, target, MatchKind::Exact);
            }
            None => fuzzy_pool.push(external),
        }
    }

    let mut unmatched = Vec::new();
    for external in fuzzy_pool {
        let mut best: Option<(usize, u8)> = None;
        for (i, target) in target_pool.iter().enumerate() {
            let score = scorer.score(&external, target);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        match best {
            Some((i, score)) if score >= config.threshold => {
                let target = target_pool.remove(i);
                record(
                    &mut mapping,
                    &mut decisions,
                    &mut duplicates,
                    external,
                    target,
                    MatchKind::Fuzzy { score },
                );
            }
            Some((i, score)) => {
                warn!("no good match for column '{external}' (best '{}' scored {score})", target_pool[i]);
                unmatched.push(UnmatchedHeader {
                    external,
                    best_candidate: Some(target_pool[i].clone()),
                    best_score: Some(score),
                });
            }
            None => {
                warn!("no good match for column '{external}' (no candidates left)");
                unmatched.push(UnmatchedHeader {
                    external,
                    best_candidate: None,
                    best_score: None,
                });
            }
        }
    }

    debug!(
        "column matching: {} mapped, {} unmatched, {} targets unclaimed",
        mapping.len(),
        unmatched.len(),
        target_pool.len()
    );

    MatchOutcome {
        mapping,
        decisions,
        unmatched,
        duplicates,
        unclaimed_targets: target_pool,
    }
}

fn record(
    mapping: &mut ColumnMapping,
    decisions: &mut Vec<MatchDecision>,
    duplicates: &mut Vec<MatchDecision>,
    external: String,
    target: String,
    kind: MatchKind,
) {
    debug!("matched '{external}' -> '{target}' ({kind:?})");
    let decision = MatchDecision {
        external,
        target,
        kind,
    };
    if mapping.insert(&decision.external, &decision.target) {
        decisions.push(decision);
    } else {
        duplicates.push(decision);
    }
}
