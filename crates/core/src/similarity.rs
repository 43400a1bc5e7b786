//! Blended textual similarity between prompts.
//!
//! The score mixes a character-sequence ratio, word-set overlap, shared
//! debugging vocabulary and relative length, then boosts pairs that both use
//! the words "same" or "still" (people repeating themselves tend to).

use std::collections::HashSet;

const CHAR_RATIO_WEIGHT: f64 = 0.3;
const JACCARD_WEIGHT: f64 = 0.4;
const DEBUG_KEYWORD_BONUS: f64 = 0.3;
const LENGTH_WEIGHT: f64 = 0.1;
const SAME_BOOST: f64 = 0.2;
const STILL_BOOST: f64 = 0.15;

const DEBUG_KEYWORDS: &[&str] = &[
    "error",
    "bug",
    "fix",
    "报错",
    "修复",
    "exception",
    "traceback",
];

/// Similarity of two prompts in `[0, 1]`. Empty input scores 0, texts equal
/// after case folding score 1.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim();
    let b = b.trim();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }
    // Sequence matching is order sensitive on ties; fix the order.
    let (a, b) = if a <= b { (a, b) } else { (b, a) };

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut score = sequence_ratio(&a_chars, &b_chars) * CHAR_RATIO_WEIGHT
        + word_jaccard(&a, &b) * JACCARD_WEIGHT
        + length_similarity(a_chars.len(), b_chars.len()) * LENGTH_WEIGHT;
    if DEBUG_KEYWORDS
        .iter()
        .any(|keyword| a.contains(keyword) && b.contains(keyword))
    {
        score += DEBUG_KEYWORD_BONUS;
    }
    if a.contains("same") && b.contains("same") {
        score = (score + SAME_BOOST).min(1.0);
    }
    if a.contains("still") && b.contains("still") {
        score = (score + STILL_BOOST).min(1.0);
    }
    score.clamp(0.0, 1.0)
}

/// `1 - mean(similarity(m[i-1], m[i]))` over consecutive messages, oldest
/// first. Fewer than two messages have no drift.
pub fn topic_drift<S: AsRef<str>>(messages: &[S]) -> f64 {
    let scores: Vec<f64> = messages
        .windows(2)
        .map(|pair| similarity(pair[0].as_ref(), pair[1].as_ref()))
        .collect();
    inverted_mean(&scores)
}

/// `1 - mean(scores)`, or 0 when there is nothing to average.
pub(crate) fn inverted_mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    (1.0 - average).clamp(0.0, 1.0)
}

/// Lower-cased runs of alphanumeric or underscore characters.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

pub fn word_jaccard(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = word_tokens(a).into_iter().collect();
    let b: HashSet<String> = word_tokens(b).into_iter().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn length_similarity(a: usize, b: usize) -> f64 {
    let longest = a.max(b);
    if longest == 0 {
        return 0.0;
    }
    1.0 - a.abs_diff(b) as f64 / longest as f64
}

/// Ratcliff/Obershelp ratio `2M / T`, where `M` counts characters in the
/// recursively found longest matching blocks.
pub fn sequence_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(a, b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common block within `a[alo..ahi]` and `b[blo..bhi]`; ties resolve
/// to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo + 1;
    let mut previous = vec![0usize; width];
    let mut current = vec![0usize; width];
    let mut best = (alo, blo, 0);
    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let run = previous[slot - 1] + 1;
                current[slot] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            } else {
                current[slot] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}
