//! Token-based string similarity, scored 0–100.
//!
//! The base metric is `strsim`'s normalized Levenshtein similarity. The token
//! variants compare sorted tokens or token-set recombinations, and
//! `weighted_ratio` picks the best of them with the usual down-weighting of
//! partial and token scores. All scores are rounded to whole numbers so
//! thresholds are exact.

use strsim::normalized_levenshtein;

const UNBASE_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.90;
const LONG_PARTIAL_SCALE: f64 = 0.60;

/// Lowercase, map every non-alphanumeric char to a space, collapse whitespace.
pub fn process(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain ratio on the raw strings. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    round_score(raw_ratio(a, b))
}

/// Best ratio of the shorter string against every equally long window of the longer.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let width = short.chars().count();
    if width == 0 {
        return 0;
    }

    let long: Vec<char> = long.chars().collect();
    let mut best = 0.0_f64;
    for window in long.windows(width) {
        let window: String = window.iter().collect();
        best = best.max(raw_ratio(short, &window));
        if best >= 100.0 {
            break;
        }
    }
    round_score(best)
}

/// Ratio over alphabetically sorted tokens of the processed strings.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

pub fn partial_token_sort_ratio(a: &str, b: &str) -> u8 {
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Compares the shared tokens against each side's shared + remaining tokens.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    token_set(a, b, ratio)
}

pub fn partial_token_set_ratio(a: &str, b: &str) -> u8 {
    token_set(a, b, partial_ratio)
}

/// Weighted combination of the ratios above, on processed input.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let p1 = process(a);
    let p2 = process(b);
    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    let base = ratio(&p1, &p2) as f64;
    let len1 = p1.chars().count() as f64;
    let len2 = p2.chars().count() as f64;
    let len_ratio = len1.max(len2) / len1.min(len2);

    if len_ratio < 1.5 {
        let tsor = token_sort_ratio(&p1, &p2) as f64 * UNBASE_SCALE;
        let tser = token_set_ratio(&p1, &p2) as f64 * UNBASE_SCALE;
        return round_score(base.max(tsor).max(tser));
    }

    let partial_scale = if len_ratio > 8.0 {
        LONG_PARTIAL_SCALE
    } else {
        PARTIAL_SCALE
    };
    let partial = partial_ratio(&p1, &p2) as f64 * partial_scale;
    let ptsor = partial_token_sort_ratio(&p1, &p2) as f64 * UNBASE_SCALE * partial_scale;
    let ptser = partial_token_set_ratio(&p1, &p2) as f64 * UNBASE_SCALE * partial_scale;
    round_score(base.max(partial).max(ptsor).max(ptser))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn raw_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    100.0 * normalized_levenshtein(a, b)
}

fn round_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

fn tokens(s: &str) -> Vec<String> {
    process(s).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

fn sorted_tokens(s: &str) -> String {
    let mut t = tokens(s);
    t.sort();
    t.join(" ")
}

fn token_set(a: &str, b: &str, scorer: fn(&str, &str) -> u8) -> u8 {
    let mut ta = tokens(a);
    let mut tb = tokens(b);
    ta.sort();
    ta.dedup();
    tb.sort();
    tb.dedup();
    if ta.is_empty() || tb.is_empty() {
        return 0;
    }

    let common: Vec<&str> = ta.iter().filter(|t| tb.contains(t)).map(String::as_str).collect();
    let only_a: Vec<&str> = ta.iter().filter(|t| !tb.contains(t)).map(String::as_str).collect();
    let only_b: Vec<&str> = tb.iter().filter(|t| !ta.contains(t)).map(String::as_str).collect();

    let t0 = common.join(" ");
    let t1 = format!("{} {}", t0, only_a.join(" ")).trim().to_string();
    let t2 = format!("{} {}", t0, only_b.join(" ")).trim().to_string();

    scorer(&t0, &t1).max(scorer(&t0, &t2)).max(scorer(&t1, &t2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_normalizes() {
        assert_eq!(process("  On CSP cXML? "), "on csp cxml");
        assert_eq!(process("Priority (80% of Spend Vendor)"), "priority 80 of spend vendor");
        assert_eq!(process("!!!"), "");
    }

    #[test]
    fn ratio_basics() {
        assert_eq!(ratio("abc", "abc"), 100);
        assert_eq!(ratio("abc", ""), 0);
        assert_eq!(ratio("", ""), 0);
        // one edit over 5
        assert_eq!(ratio("abcde", "abcdx"), 80);
        // three edits over 14 → 78.57
        assert_eq!(ratio("abcdefghijklmn", "abcdefghijkxyz"), 79);
    }

    #[test]
    fn partial_finds_substring() {
        assert_eq!(partial_ratio("status", "coupa status"), 100);
        assert_eq!(partial_ratio("coupa status", "status"), 100);
        assert_eq!(partial_ratio("", "coupa"), 0);
    }

    #[test]
    fn partial_counts_chars_not_bytes() {
        assert_eq!(partial_ratio("né", "café né"), 100);
    }

    #[test]
    fn token_sort_ignores_order() {
        assert_eq!(token_sort_ratio("Status Coupa", "coupa status"), 100);
    }

    #[test]
    fn token_set_ignores_extra_tokens() {
        assert_eq!(token_set_ratio("supplier name", "name supplier name"), 100);
    }

    #[test]
    fn weighted_exact_and_case() {
        assert_eq!(weighted_ratio("Supplier Name", "supplier name"), 100);
        assert_eq!(weighted_ratio("Supplier Name", ""), 0);
    }

    #[test]
    fn weighted_boundaries() {
        assert_eq!(weighted_ratio("abcde", "abcdx"), 80);
        assert_eq!(weighted_ratio("abcdefghijklmn", "abcdefghijkxyz"), 79);
    }

    #[test]
    fn weighted_low_for_unrelated() {
        assert!(weighted_ratio("SupplierNm", "Contact Phone") < 80);
    }

    #[test]
    fn weighted_reordered_tokens() {
        // token sort gives 100, scaled by 0.95
        assert_eq!(weighted_ratio("Status Coupa", "Coupa Status"), 95);
    }
}
