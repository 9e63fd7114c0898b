//! Approximate string matching on a 0-100 scale.
//!
//! `weighted_ratio` blends a plain edit-distance ratio with partial,
//! token-sort and token-set ratios, scaling the derived scores down so that
//! an exact overall match always wins.

use crate::error::{ChatError, Result};

const UNBASE_SCALE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored<'a> {
    pub index: usize,
    pub candidate: &'a str,
    pub score: u8,
}

/// Lowercase, replace anything that is not alphanumeric with a space, trim.
fn preprocess(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn raw_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

fn raw_partial_ratio(a: &[char], b: &[char]) -> f64 {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if shorter.is_empty() {
        return 0.0;
    }
    let mut best = 0.0f64;
    for window in longer.windows(shorter.len()) {
        let r = raw_ratio(shorter, window);
        if r > best {
            best = r;
            if best >= 0.995 {
                return 1.0;
            }
        }
    }
    best
}

fn to_score(raw: f64) -> u8 {
    (raw * 100.0).round().clamp(0.0, 100.0) as u8
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn raw_token_sort(a: &str, b: &str, partial: bool) -> f64 {
    let a = chars(&sorted_tokens(a).join(" "));
    let b = chars(&sorted_tokens(b).join(" "));
    if partial {
        raw_partial_ratio(&a, &b)
    } else {
        raw_ratio(&a, &b)
    }
}

fn raw_token_set(a: &str, b: &str, partial: bool) -> f64 {
    let mut ta = sorted_tokens(a);
    let mut tb = sorted_tokens(b);
    ta.dedup();
    tb.dedup();

    let intersection: Vec<&str> = ta.iter().copied().filter(|t| tb.contains(t)).collect();
    let only_a: Vec<&str> = ta.iter().copied().filter(|t| !tb.contains(t)).collect();
    let only_b: Vec<&str> = tb.iter().copied().filter(|t| !ta.contains(t)).collect();

    let sect = intersection.join(" ");
    let combined_a = format!("{} {}", sect, only_a.join(" ")).trim().to_string();
    let combined_b = format!("{} {}", sect, only_b.join(" ")).trim().to_string();

    let (sect, combined_a, combined_b) = (chars(&sect), chars(&combined_a), chars(&combined_b));
    let score = |x: &[char], y: &[char]| {
        if partial {
            raw_partial_ratio(x, y)
        } else {
            raw_ratio(x, y)
        }
    };

    score(&sect, &combined_a)
        .max(score(&sect, &combined_b))
        .max(score(&combined_a, &combined_b))
}

/// Edit-distance similarity of the two strings as given.
pub fn ratio(a: &str, b: &str) -> u8 {
    to_score(raw_ratio(&chars(a), &chars(b)))
}

/// Best `ratio` of the shorter string against every same-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    to_score(raw_partial_ratio(&chars(a), &chars(b)))
}

pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    to_score(raw_token_sort(&preprocess(a), &preprocess(b), false))
}

pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    to_score(raw_token_set(&preprocess(a), &preprocess(b), false))
}

/// Weighted combination of the other scorers; this is the default scorer
/// for FAQ matching.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = preprocess(a);
    let b = preprocess(b);
    let (ca, cb) = (chars(&a), chars(&b));
    if ca.is_empty() || cb.is_empty() {
        return 0;
    }

    let base = raw_ratio(&ca, &cb);
    let len_ratio = ca.len().max(cb.len()) as f64 / ca.len().min(cb.len()) as f64;

    let best = if len_ratio < 1.5 {
        let tsor = raw_token_sort(&a, &b, false) * UNBASE_SCALE;
        let tser = raw_token_set(&a, &b, false) * UNBASE_SCALE;
        base.max(tsor).max(tser)
    } else {
        let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        let partial = raw_partial_ratio(&ca, &cb) * partial_scale;
        let ptsor = raw_token_sort(&a, &b, true) * UNBASE_SCALE * partial_scale;
        let ptser = raw_token_set(&a, &b, true) * UNBASE_SCALE * partial_scale;
        base.max(partial).max(ptsor).max(ptser)
    };

    to_score(best)
}

/// All candidates scored against `query`, highest first. Equal scores keep
/// their original order.
pub fn top_k<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    k: usize,
) -> Result<Vec<Scored<'a>>> {
    if candidates.is_empty() {
        return Err(ChatError::NoCandidates);
    }

    let mut scored: Vec<Scored<'a>> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let candidate = candidate.as_ref();
            Scored {
                index,
                candidate,
                score: weighted_ratio(query, candidate),
            }
        })
        .collect();

    // Stable sort keeps insertion order among ties.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(k);
    Ok(scored)
}

/// Highest-scoring candidate; the first one wins a tie.
pub fn top_match<'a, S: AsRef<str>>(query: &str, candidates: &'a [S]) -> Result<Scored<'a>> {
    let mut best: Option<Scored<'a>> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let candidate = candidate.as_ref();
        let score = weighted_ratio(query, candidate);
        if best.map_or(true, |b| score > b.score) {
            best = Some(Scored {
                index,
                candidate,
                score,
            });
        }
    }
    best.ok_or(ChatError::NoCandidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(ratio("mandi rate", "mandi rate"), 100);
        assert_eq!(weighted_ratio("Mandi Rate!", "mandi rate"), 100);
    }

    #[test]
    fn empty_strings_score_zero() {
        assert_eq!(ratio("", "wheat"), 0);
        assert_eq!(weighted_ratio("", ""), 0);
        assert_eq!(partial_ratio("", "wheat"), 0);
    }

    #[test]
    fn ratio_counts_common_subsequence() {
        // lcs("whats mandi rate wheat", "mandi rate wheat") = 16; 2*16/38.
        assert_eq!(ratio("whats mandi rate wheat", "mandi rate wheat"), 84);
    }

    #[test]
    fn partial_ratio_finds_embedded_substring() {
        assert_eq!(partial_ratio("wheat", "mandi rate for wheat today"), 100);
    }

    #[test]
    fn token_scorers_ignore_word_order() {
        assert_eq!(token_sort_ratio("rate wheat mandi", "mandi rate wheat"), 100);
        assert_eq!(token_set_ratio("wheat wheat mandi", "mandi wheat"), 100);
    }

    #[test]
    fn reordered_words_score_below_exact_match() {
        let reordered = weighted_ratio("wheat rate mandi", "mandi rate wheat");
        assert_eq!(reordered, 95);
    }

    #[test]
    fn top_match_prefers_first_candidate_on_tie() {
        let candidates = ["sell crops", "buy crops", "sell crops"];
        let best = top_match("sell crops", &candidates).unwrap();
        assert_eq!(best.index, 0);
        assert_eq!(best.score, 100);
    }

    #[test]
    fn top_k_sorts_descending_and_keeps_order_among_ties() {
        let candidates = ["register farmer", "mandi rate wheat", "register farmer", "weather"];
        let ranked = top_k("register farmer", &candidates, 3).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].index, 0);
        assert_eq!(ranked[1].index, 2);
        assert!(ranked[1].score >= ranked[2].score);
    }

    #[test]
    fn empty_candidate_set_is_an_error() {
        let empty: [&str; 0] = [];
        assert!(matches!(top_match("wheat", &empty), Err(ChatError::NoCandidates)));
        assert!(matches!(top_k("wheat", &empty, 3), Err(ChatError::NoCandidates)));
    }
}
