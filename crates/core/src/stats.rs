use std::collections::HashMap;

use rayon::prelude::*;

use crate::WordFrequency;

/// Common English function words dropped before counting.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being", "to",
    "of", "for", "in", "on", "by", "at", "this", "that", "these", "those", "with", "as", "from",
    "about", "into", "through", "during", "before", "after", "above", "below", "up", "down", "i",
    "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours", "yourself",
    "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself", "it", "its",
    "itself", "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom",
    "when", "where", "why", "how", "all", "any", "both", "each", "few", "more", "most", "other",
    "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can",
    "will", "just", "should", "now",
];

/// Population mean and standard deviation of a change-size sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Distribution {
    /// `None` when the sample has no spread.
    pub fn z_score(&self, value: u64) -> Option<f64> {
        if self.std_dev > 0.0 {
            Some((value as f64 - self.mean) / self.std_dev)
        } else {
            None
        }
    }
}

pub fn population_distribution(values: &[u64]) -> Option<Distribution> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let mean = values.iter().map(|value| *value as f64).sum::<f64>() / count as f64;
    let variance = values
        .iter()
        .map(|value| {
            let delta = *value as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / count as f64;
    Some(Distribution {
        count,
        mean,
        std_dev: variance.sqrt(),
    })
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercases `text` and returns every whole word that starts with an ASCII
/// letter, continues with ASCII letters or digits, and is at least two
/// characters long. Words glued to other word characters (`foo_bar`, `3d`)
/// are not split apart.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|run| is_word(run))
        .map(str::to_string)
        .collect()
}

fn is_word(run: &str) -> bool {
    let mut chars = run.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    let mut len = 1;
    for c in chars {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return false;
        }
        len += 1;
    }
    len >= 2
}

/// Counts non-stop-words across all messages.
pub fn count_words<S>(messages: &[S]) -> HashMap<String, u64>
where
    S: AsRef<str> + Sync,
{
    messages
        .par_iter()
        .fold(HashMap::new, |mut counts: HashMap<String, u64>, message| {
            for word in tokenize(message.as_ref()) {
                if !is_stop_word(&word) {
                    *counts.entry(word).or_insert(0) += 1;
                }
            }
            counts
        })
        .reduce(HashMap::new, |mut left, right| {
            for (word, count) in right {
                *left.entry(word).or_insert(0) += count;
            }
            left
        })
}

/// Highest counts first; equal counts are ordered by word.
pub fn top_words(counts: &HashMap<String, u64>, limit: usize) -> Vec<WordFrequency> {
    let mut words = counts
        .iter()
        .map(|(word, frequency)| WordFrequency {
            word: word.clone(),
            frequency: *frequency,
        })
        .collect::<Vec<_>>();
    words.sort_by(|left, right| {
        right
            .frequency
            .cmp(&left.frequency)
            .then_with(|| left.word.cmp(&right.word))
    });
    words.truncate(limit);
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_of_spread_sample() {
        let dist = population_distribution(&[10, 20, 30]).unwrap();
        assert!((dist.mean - 20.0).abs() < 1e-9);
        assert!((dist.std_dev - (200.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!((dist.z_score(10).unwrap() + 1.2247).abs() < 1e-3);
        assert!(dist.z_score(20).unwrap().abs() < 1e-9);
        assert!((dist.z_score(30).unwrap() - 1.2247).abs() < 1e-3);
    }

    #[test]
    fn flat_sample_has_no_z_scores() {
        let dist = population_distribution(&[10, 10, 10]).unwrap();
        assert_eq!(dist.std_dev, 0.0);
        assert_eq!(dist.z_score(10), None);
    }

    #[test]
    fn empty_sample_has_no_distribution() {
        assert_eq!(population_distribution(&[]), None);
    }

    #[test]
    fn tokenize_keeps_whole_alphanumeric_words() {
        assert_eq!(
            tokenize("Bump v2 to 3.1, fix_typo in README (x)"),
            vec!["bump", "v2", "to", "in", "readme"]
        );
    }

    #[test]
    fn count_words_filters_stop_words_and_folds_case() {
        let counts = count_words(&["Fix the bug in the fix"]);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("fix"), Some(&2));
        assert_eq!(counts.get("bug"), Some(&1));
    }

    #[test]
    fn top_words_orders_by_frequency_then_word() {
        let counts = count_words(&["alpha beta beta gamma gamma", "delta"]);
        let top = top_words(&counts, 3);
        let words = top.iter().map(|entry| entry.word.as_str()).collect::<Vec<_>>();
        assert_eq!(words, vec!["beta", "gamma", "alpha"]);
    }
}
