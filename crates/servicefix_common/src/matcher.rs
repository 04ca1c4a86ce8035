//! Reference matcher: approximate matching of free-text input against a
//! closed candidate list.
//!
//! Pure and deterministic: identical input and candidates always produce
//! the same suggestions, ordered by descending similarity with ties kept
//! in candidate-list order. Candidates scoring below the cutoff never
//! surface; the caller falls back to treating the input as free text.

use strsim::normalized_levenshtein;

/// Maximum number of suggestions returned
pub const SUGGESTION_LIMIT: usize = 5;

/// Similarity below this is not a plausible near-match
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// One candidate: the label to return plus every string worth scoring
/// against (the label itself, a bare name, aliases).
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub label: &'a str,
    pub targets: Vec<&'a str>,
}

impl<'a> Candidate<'a> {
    pub fn plain(label: &'a str) -> Self {
        Self {
            label,
            targets: vec![label],
        }
    }
}

/// Score one candidate: best similarity over all of its targets.
fn score(input: &str, candidate: &Candidate<'_>) -> f64 {
    candidate
        .targets
        .iter()
        .map(|t| normalized_levenshtein(input, &t.to_lowercase()))
        .fold(0.0, f64::max)
}

/// Return up to [`SUGGESTION_LIMIT`] candidate labels whose similarity to
/// `input` clears [`SIMILARITY_CUTOFF`], best first.
pub fn suggest(input: &str, candidates: &[Candidate<'_>]) -> Vec<String> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .map(|c| (score(&needle, c), c.label))
        .filter(|(s, _)| *s >= SIMILARITY_CUTOFF)
        .collect();

    // Stable sort keeps candidate-list order for equal scores.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(SUGGESTION_LIMIT);

    scored.into_iter().map(|(_, label)| label.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain<'a>(labels: &'a [&'a str]) -> Vec<Candidate<'a>> {
        labels.iter().map(|l| Candidate::plain(l)).collect()
    }

    #[test]
    fn near_match_surfaces() {
        let candidates = plain(&["No Cooling", "Water Leakage", "Strange Noise"]);
        let got = suggest("not cooling", &candidates);
        assert_eq!(got, vec!["No Cooling"]);
    }

    #[test]
    fn below_cutoff_returns_nothing() {
        let candidates = plain(&["No Cooling", "Water Leakage"]);
        assert!(suggest("xyzzy", &candidates).is_empty());
    }

    #[test]
    fn alias_targets_count() {
        let candidates = vec![Candidate {
            label: "Visakhapatnam (Andhra Pradesh)",
            targets: vec!["Visakhapatnam (Andhra Pradesh)", "Visakhapatnam", "Vizag"],
        }];
        let got = suggest("vizag", &candidates);
        assert_eq!(got, vec!["Visakhapatnam (Andhra Pradesh)"]);
    }

    #[test]
    fn ordering_is_deterministic_and_ties_keep_list_order() {
        let candidates = plain(&["Door Lock", "Door Lick", "Something Else"]);
        let a = suggest("door lock", &candidates);
        let b = suggest("door lock", &candidates);
        assert_eq!(a, b);
        assert_eq!(a[0], "Door Lock");

        // two identical candidates tie; list order decides
        let tied = plain(&["Same Label", "Same Label"]);
        let got = suggest("same label", &tied);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let candidates = plain(&["No Cooling"]);
        assert_eq!(suggest("NO COOLING", &candidates), vec!["No Cooling"]);
    }

    #[test]
    fn limit_is_enforced() {
        let labels: Vec<String> = (0..10).map(|i| format!("pump {i}")).collect();
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let candidates = plain(&refs);
        assert_eq!(suggest("pump 1", &candidates).len(), SUGGESTION_LIMIT);
    }

    #[test]
    fn empty_input_is_no_match() {
        let candidates = plain(&["No Cooling"]);
        assert!(suggest("   ", &candidates).is_empty());
    }
}
