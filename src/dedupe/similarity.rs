//! Normalized string similarity for duplicate detection
//!
//! Uses the Sorensen-Dice coefficient over character bigrams: twice the
//! number of shared bigrams divided by the total bigram count of both
//! strings. The score is symmetric, 1.0 for identical non-empty strings,
//! 0.0 for strings sharing no bigram, and grows with shared substructure.
//! Two empty strings score 0.0, not 1.0: a missing subject carries no
//! evidence of duplication, and scoring it as identical would cluster
//! every subject-less message on a page.
//!
//! Input is lowercased and whitespace-trimmed first so that casing and
//! padding differences between two copies of the same subject line do not
//! depress the score.

use std::collections::HashMap;

/// Similarity score between two strings in `[0.0, 1.0]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }

    let a_bigrams = bigrams(&a);
    let b_bigrams = bigrams(&b);
    if a_bigrams.is_empty() || b_bigrams.is_empty() {
        // At least one input is shorter than a bigram, and they differ.
        return 0.0;
    }

    let mut counts: HashMap<&[char; 2], usize> = HashMap::new();
    for bigram in &a_bigrams {
        *counts.entry(bigram).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for bigram in &b_bigrams {
        if let Some(count) = counts.get_mut(bigram) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    (2.0 * shared as f64) / (a_bigrams.len() + b_bigrams.len()) as f64
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn bigrams(value: &str) -> Vec<[char; 2]> {
    let chars: Vec<char> = value.chars().collect();
    chars.windows(2).map(|w| [w[0], w[1]]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("Weekly newsletter", "Weekly newsletter"), 1.0);
    }

    #[test]
    fn identical_up_to_case_and_padding_score_one() {
        assert_eq!(similarity("  Weekly Newsletter ", "weekly newsletter"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity("abcdef", "xyzuvw"), 0.0);
    }

    #[test]
    fn empty_strings_score_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("subject", ""), 0.0);
    }

    #[test]
    fn single_character_inputs_compare_by_equality() {
        assert_eq!(similarity("a", "a"), 1.0);
        assert_eq!(similarity("a", "b"), 0.0);
    }

    #[test]
    fn near_duplicates_score_high() {
        let score = similarity(
            "Your order has shipped #1001",
            "Your order has shipped #1002",
        );
        assert!(score > 0.85, "expected high score, got {score}");
    }

    #[test]
    fn unrelated_subjects_score_low() {
        let score = similarity("Team standup notes", "50% off summer sale");
        assert!(score < 0.3, "expected low score, got {score}");
    }

    #[test]
    fn score_is_symmetric() {
        let ab = similarity("invoice for march", "invoice for april");
        let ba = similarity("invoice for april", "invoice for march");
        assert_eq!(ab, ba);
    }

    #[test]
    fn repeated_bigrams_are_not_double_counted() {
        // "aaaa" has three "aa" bigrams, "aa" has one; shared must be 1.
        let score = similarity("aaaa", "aa");
        assert!((score - 0.5).abs() < 1e-9, "got {score}");
    }
}
