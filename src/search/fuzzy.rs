// src/search/fuzzy.rs
//
// Subsequence-with-score fuzzy matching for `~word` / `~"phrase"` queries
// (spec.md §4.3.2). No external fuzzy-matching crate is in the dependency
// stack, so this is a small hand-rolled scorer in the vein of common
// fuzzy-finder algorithms: every needle character must appear in order in
// the haystack, and contiguous / word-start runs score higher than
// scattered ones.

/// Returns `Some(score)` if every character of `needle` appears, in order,
/// somewhere in `haystack`; `None` otherwise. Higher score is a better
/// match. Comparison is done on the strings as given — callers lower-case
/// both sides first for case-insensitive fuzzy matches.
pub fn fuzzy_score(haystack: &str, needle: &str) -> Option<i64> {
    if needle.is_empty() {
        return Some(0);
    }

    let hay: Vec<char> = haystack.chars().collect();
    let ndl: Vec<char> = needle.chars().collect();

    let mut score: i64 = 0;
    let mut hay_idx = 0usize;
    let mut prev_match_idx: Option<usize> = None;

    for &nc in &ndl {
        let mut found = None;
        while hay_idx < hay.len() {
            if hay[hay_idx] == nc {
                found = Some(hay_idx);
                break;
            }
            hay_idx += 1;
        }
        let idx = found?;

        score += 1;
        if let Some(prev) = prev_match_idx {
            if idx == prev + 1 {
                score += 5; // contiguous run bonus
            }
        }
        if idx == 0 || hay.get(idx.wrapping_sub(1)).is_some_and(|c| !c.is_alphanumeric()) {
            score += 3; // word-boundary bonus
        }

        prev_match_idx = Some(idx);
        hay_idx += 1;
    }

    // Shorter haystacks are a tighter match for the same needle coverage.
    score -= (hay.len() as i64 - ndl.len() as i64).max(0) / 8;

    Some(score)
}

/// Case-insensitive convenience wrapper.
pub fn fuzzy_score_ci(haystack: &str, needle: &str) -> Option<i64> {
    fuzzy_score(&haystack.to_lowercase(), &needle.to_lowercase())
}
