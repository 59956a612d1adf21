//! Approximate multi-field matching over passages.
//!
//! Each field is searched with the Bitap (shift-or) algorithm extended for
//! edit distance, the same family Fuse.js uses. A field's score is
//! `errors / pattern_len` of the best approximate occurrence, so 0 is an
//! exact hit and anything above the threshold is no match at all. Match
//! location is ignored. Field scores are folded into one passage score by a
//! weighted product, then flipped to `1 - score` so higher is better.

use std::collections::HashMap;

use crate::{passage::Passage, search::SearchResult};

/// Highest accepted `errors / pattern_len` ratio.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Shortest run of pattern characters that counts as a match.
pub const DEFAULT_MIN_MATCH_CHARS: usize = 2;

/// Bitap works on machine words; longer patterns are searched in pieces.
const MAX_PATTERN_BITS: usize = 32;

/// Field scores are floored here so a near-exact hit never multiplies to 0.
const MIN_FIELD_SCORE: f64 = 0.001;

#[derive(Debug, Clone, Copy)]
pub struct FuzzyOptions {
    pub threshold: f64,
    pub min_match_chars: usize,
    pub text_weight: f64,
    pub header_weight: f64,
    pub file_weight: f64,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_match_chars: DEFAULT_MIN_MATCH_CHARS,
            text_weight: 0.7,
            header_weight: 0.2,
            file_weight: 0.1,
        }
    }
}

/// Outcome of searching one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMatch {
    pub is_match: bool,
    /// 0 is exact, 1 is no match.
    pub score: f64,
}

impl FieldMatch {
    const NONE: FieldMatch = FieldMatch {
        is_match: false,
        score: 1.0,
    };
}

/// A lower-cased query prepared for Bitap search.
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    chunks: Vec<PatternChunk>,
}

#[derive(Debug, Clone)]
struct PatternChunk {
    len: usize,
    /// Bit `len - 1 - i` is set for every position `i` holding the char.
    alphabet: HashMap<char, u64>,
}

impl PatternChunk {
    fn new(chars: &[char]) -> Self {
        let len = chars.len();
        let mut alphabet = HashMap::new();
        for (i, &c) in chars.iter().enumerate() {
            *alphabet.entry(c).or_insert(0u64) |= 1 << (len - i - 1);
        }
        Self { len, alphabet }
    }
}

impl Pattern {
    pub fn new(query: &str) -> Self {
        let text = query.to_lowercase();
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();

        if chars.len() <= MAX_PATTERN_BITS {
            if !chars.is_empty() {
                chunks.push(PatternChunk::new(&chars));
            }
        } else {
            // Full-width pieces, then one right-aligned piece for the rest.
            let remainder = chars.len() % MAX_PATTERN_BITS;
            for piece in chars[..chars.len() - remainder].chunks(MAX_PATTERN_BITS)
            {
                chunks.push(PatternChunk::new(piece));
            }
            if remainder > 0 {
                let start = chars.len() - MAX_PATTERN_BITS;
                chunks.push(PatternChunk::new(&chars[start..]));
            }
        }

        Self { text, chunks }
    }

    /// Search one field value, case-insensitively.
    pub fn search_in(&self, value: &str, options: &FuzzyOptions) -> FieldMatch {
        if self.chunks.is_empty() {
            return FieldMatch::NONE;
        }

        let value = value.to_lowercase();
        if value == self.text {
            return FieldMatch {
                is_match: true,
                score: 0.0,
            };
        }

        let chars: Vec<char> = value.chars().collect();
        let mut total = 0.0;
        let mut any_match = false;
        for chunk in &self.chunks {
            let m = bitap(&chars, chunk, options);
            any_match |= m.is_match;
            total += m.score;
        }

        if any_match {
            FieldMatch {
                is_match: true,
                score: total / self.chunks.len() as f64,
            }
        } else {
            FieldMatch::NONE
        }
    }
}

/// Approximate search of `pattern` anywhere in `text`.
///
/// Row `i` of the shift-or table tracks matches with up to `i` edits.
/// Rows are added until the next error count would exceed the best score
/// found so far.
fn bitap(text: &[char], pattern: &PatternChunk, options: &FuzzyOptions) -> FieldMatch {
    let pattern_len = pattern.len;
    let text_len = text.len();
    let score_for = |errors: usize| errors as f64 / pattern_len as f64;
    let found_bit = 1u64 << (pattern_len - 1);

    let mut threshold = options.threshold;
    let mut best_location = None;
    let mut final_score = 1.0;
    let mut match_mask = vec![false; text_len];
    let mut last_row: Vec<u64> = vec![0; text_len + 2];

    for errors in 0..pattern_len {
        let mut row = vec![0u64; text_len + 2];
        row[text_len + 1] = (1u64 << errors) - 1;

        for j in (1..=text_len).rev() {
            let location = j - 1;
            let char_bits =
                pattern.alphabet.get(&text[location]).copied().unwrap_or(0);
            match_mask[location] = char_bits != 0;

            row[j] = ((row[j + 1] << 1) | 1) & char_bits;
            if errors > 0 {
                row[j] |= ((last_row[j + 1] | last_row[j]) << 1)
                    | 1
                    | last_row[j + 1];
            }

            if row[j] & found_bit != 0 {
                final_score = score_for(errors);
                if final_score <= threshold {
                    threshold = final_score;
                    best_location = Some(location);
                    if location == 0 {
                        break;
                    }
                }
            }
        }

        if score_for(errors + 1) > threshold {
            break;
        }
        last_row = row;
    }

    let is_match = best_location.is_some()
        && has_run(&match_mask, options.min_match_chars);
    FieldMatch {
        is_match,
        score: f64::max(MIN_FIELD_SCORE, final_score),
    }
}

/// True if `mask` has at least `min_len` consecutive set entries.
fn has_run(mask: &[bool], min_len: usize) -> bool {
    let mut run = 0;
    for &set in mask {
        run = if set { run + 1 } else { 0 };
        if run >= min_len {
            return true;
        }
    }
    false
}

/// Length normalisation: `1 / sqrt(tokens)` rounded to three decimals,
/// where tokens are runs of non-space characters.
///
/// Long fields are damped so a hit in a short header outweighs the same
/// hit buried in a long body.
pub fn field_norm(value: &str) -> f64 {
    let tokens = value.split(' ').filter(|t| !t.is_empty()).count().max(1);
    (1000.0 / (tokens as f64).sqrt()).round() / 1000.0
}

/// Ranks passages by weighted approximate matching of `text`, `header`
/// and `file`.
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    options: FuzzyOptions,
}

impl FuzzyMatcher {
    pub fn new(options: FuzzyOptions) -> Self {
        Self { options }
    }

    /// Score one passage; `None` if no field matches.
    ///
    /// Lower is better, as in the raw Bitap scores.
    pub fn score(&self, pattern: &Pattern, passage: &Passage) -> Option<f64> {
        let o = &self.options;
        let total_weight = o.text_weight + o.header_weight + o.file_weight;
        let fields = [
            (passage.text.as_str(), o.text_weight),
            (passage.header.as_str(), o.header_weight),
            (passage.file.as_str(), o.file_weight),
        ];

        let mut score = 1.0;
        let mut matched = false;
        for (value, weight) in fields {
            if value.trim().is_empty() {
                continue;
            }
            let m = pattern.search_in(value, o);
            if !m.is_match {
                continue;
            }
            matched = true;

            let weight = if total_weight > 0.0 { weight / total_weight } else { 1.0 };
            let base = if m.score == 0.0 && weight > 0.0 {
                f64::EPSILON
            } else {
                m.score
            };
            score *= base.powf(weight * field_norm(value));
        }

        matched.then_some(score)
    }

    /// Return at most `top_k` matching passages, best first.
    ///
    /// Passages with no matching field are left out. Ties keep corpus order.
    pub fn search(
        &self,
        query: &str,
        passages: &[Passage],
        top_k: usize,
    ) -> Vec<SearchResult> {
        if top_k == 0 {
            return Vec::new();
        }

        let pattern = Pattern::new(query);
        let mut scored: Vec<(usize, f64)> = passages
            .iter()
            .enumerate()
            .filter_map(|(i, p)| self.score(&pattern, p).map(|s| (i, s)))
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
        });

        scored
            .into_iter()
            .take(top_k)
            .map(|(i, score)| SearchResult {
                passage: passages[i].clone(),
                score: 1.0 - score,
            })
            .collect()
    }
}
