//! Edit-distance matching for agent-supplied names.
//!
//! Agents rarely know the exact spelling of a priority, status, or sprint.
//! [`best_match`] ranks candidates by Levenshtein distance over normalized
//! labels; whether the winner is close enough is decided by the caller with a
//! [`MatchThreshold`].

/// Classic Levenshtein edit distance (unit-cost insert, delete, substitute).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        table[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + cost);
        }
    }

    table[a.len()][b.len()]
}

/// Lowercase, trim, and collapse runs of whitespace, `_` and `-` into a single space.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized form with the separating spaces removed ("Story-Points" -> "storypoints").
pub fn compact(s: &str) -> String {
    normalize(s).replace(' ', "")
}

/// Winner of a [`best_match`] scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<T> {
    pub payload: T,
    pub label: String,
    pub distance: usize,
}

/// Find the candidate whose normalized label is closest to `input`.
///
/// Ties keep the earliest candidate. Returns `None` only when there are no
/// candidates; no threshold is applied here.
pub fn best_match<L, T, I>(input: &str, candidates: I) -> Option<Match<T>>
where
    L: AsRef<str>,
    I: IntoIterator<Item = (L, T)>,
{
    let needle = normalize(input);
    let mut best: Option<Match<T>> = None;

    for (label, payload) in candidates {
        let label = label.as_ref();
        let distance = levenshtein(&needle, &normalize(label));
        let better = best.as_ref().map_or(true, |b| distance < b.distance);
        if better {
            best = Some(Match {
                payload,
                label: label.to_string(),
                distance,
            });
        }
    }

    best
}

/// Acceptance policy for a fuzzy match, chosen per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchThreshold {
    /// Enumerated option values (priority, status, select lists).
    StrictOption,
    /// Free-form names such as sprints and boards.
    LenientFreeform,
}

impl MatchThreshold {
    /// Largest distance accepted for an input of `input_len` normalized chars.
    pub fn max_distance(self, input_len: usize) -> usize {
        match self {
            MatchThreshold::StrictOption => input_len.min(4).max(2),
            MatchThreshold::LenientFreeform => (input_len * 2).max(10),
        }
    }

    /// Whether `distance` is acceptable for the given raw input.
    pub fn accepts(self, input: &str, distance: usize) -> bool {
        distance <= self.max_distance(normalize(input).chars().count())
    }
}

/// [`best_match`] followed by a threshold check.
pub fn match_within<L, T, I>(
    input: &str,
    candidates: I,
    threshold: MatchThreshold,
) -> Option<Match<T>>
where
    L: AsRef<str>,
    I: IntoIterator<Item = (L, T)>,
{
    best_match(input, candidates).filter(|m| threshold.accepts(input, m.distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_examples() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("hello", "hallo"), 1);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_levenshtein_empty_and_identity() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_levenshtein_symmetric() {
        let words = ["", "a", "sprint", "Sprint 12", "story points", "kitten", "ünïcode"];
        for a in words {
            for b in words {
                assert_eq!(levenshtein(a, b), levenshtein(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein("é", "e"), 1);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Story   Points "), "story points");
        assert_eq!(normalize("story_points"), "story points");
        assert_eq!(normalize("story-points"), "story points");
        assert_eq!(normalize("In__Progress - Now"), "in progress now");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("Story Points"), "storypoints");
        assert_eq!(compact("story_points"), "storypoints");
    }

    #[test]
    fn test_best_match_empty_candidates() {
        let candidates: Vec<(&str, u32)> = vec![];
        assert!(best_match("anything", candidates).is_none());
    }

    #[test]
    fn test_best_match_prefers_first_on_tie() {
        let candidates = vec![("abc", 1), ("abd", 2)];
        let m = best_match("abx", candidates).unwrap();
        assert_eq!(m.payload, 1);
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn test_best_match_normalizes_both_sides() {
        let candidates = vec![("Sprint", "a"), ("Story Points", "b")];
        let m = best_match("story_points", candidates).unwrap();
        assert_eq!(m.payload, "b");
        assert_eq!(m.distance, 0);
        assert_eq!(m.label, "Story Points");
    }

    #[test]
    fn test_best_match_never_rejects() {
        let m = best_match("zzzzzzzz", vec![("Low", 0)]).unwrap();
        assert_eq!(m.payload, 0);
        assert!(m.distance > 0);
    }

    #[test]
    fn test_threshold_presets() {
        assert_eq!(MatchThreshold::StrictOption.max_distance(1), 2);
        assert_eq!(MatchThreshold::StrictOption.max_distance(3), 3);
        assert_eq!(MatchThreshold::StrictOption.max_distance(20), 4);
        assert_eq!(MatchThreshold::LenientFreeform.max_distance(2), 10);
        assert_eq!(MatchThreshold::LenientFreeform.max_distance(8), 16);
    }

    #[test]
    fn test_match_within_strict() {
        let options = vec![("Low", 0), ("Medium", 1), ("High", 2), ("Critical", 3)];
        let m = match_within("hi", options.clone(), MatchThreshold::StrictOption).unwrap();
        assert_eq!(m.label, "High");
        assert!(match_within("xyz123", options, MatchThreshold::StrictOption).is_none());
    }
}
