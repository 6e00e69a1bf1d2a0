// src/matching/similarity.rs

use strsim::levenshtein;

/// Normalized edit-distance similarity in `[0, 1]`.
///
/// Both inputs are lower-cased first. An empty input on either side scores 0.
/// Otherwise the score is `1 - distance / max(len(a), len(b))`, lengths in chars.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let max_len = a.chars().count().max(b.chars().count());
    let distance = levenshtein(&a, &b);

    1.0 - distance as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_reflexive_for_nonempty() {
        for s in ["a", "Acme", "Software Engineer", "Ünïcödé Çorp"] {
            assert!((similarity(s, s) - 1.0).abs() < EPS, "{}", s);
        }
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(similarity("", "Acme"), 0.0);
        assert_eq!(similarity("Acme", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("Acme Corp", "ACME Corporation"),
            ("Data Scientist", "Sr Data Scientist"),
        ];
        for (a, b) in pairs {
            assert!((similarity(a, b) - similarity(b, a)).abs() < EPS);
        }
    }

    #[test]
    fn test_kitten_sitting() {
        // distance 3 over max length 7
        let score = similarity("kitten", "sitting");
        assert!((score - (1.0 - 3.0 / 7.0)).abs() < EPS);
        assert!((score - 0.571).abs() < 0.001);
    }

    #[test]
    fn test_case_insensitive() {
        assert!((similarity("ACME", "acme") - 1.0).abs() < EPS);
        assert!((similarity("Google LLC", "google llc") - 1.0).abs() < EPS);
    }

    #[test]
    fn test_completely_different_same_length() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // one substitution over four chars, even though 'é' is two bytes
        let score = similarity("café", "cafe");
        assert!((score - 0.75).abs() < EPS);
    }
}
