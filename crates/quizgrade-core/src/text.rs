//! Tiered free-text answer matcher.
//!
//! Both answers are trimmed and lowercased, then run through an ordered list
//! of rules. The first rule that produces a score wins; if none does, the
//! lexical bigram similarity is returned.
//!
//! | Tier | Rule              | Score                    |
//! |------|-------------------|--------------------------|
//! | 1    | exact             | 1.0                      |
//! | 2    | whole-word phrase | 0.9                      |
//! | 3    | significant word  | 0.85                     |
//! | 4    | translation       | 1.0 / 0.9                |
//! | 4    | typo              | 0.85                     |
//! | 5    | complexity        | `min(0.5, lexical)`      |
//! | 6    | lexical           | bigram Dice coefficient  |
//!
//! A short answer that matches one of tiers 1-4 is never penalised for being
//! short: tier 5 only caps answers that matched nothing above it.

use std::sync::OnceLock;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::similarity::{levenshtein, lexical_similarity, normalize};
use crate::translation::TranslationTable;

pub const EXACT_SCORE: f64 = 1.0;
pub const CONTAINMENT_SCORE: f64 = 0.9;
pub const SIGNIFICANT_WORD_SCORE: f64 = 0.85;
pub const TRANSLATION_SCORE: f64 = 0.9;
pub const TYPO_SCORE: f64 = 0.85;
pub const COMPLEXITY_CAP: f64 = 0.5;

/// Maximum edit distance accepted as a typo.
pub const MAX_TYPO_DISTANCE: usize = 2;

const MIN_CONTAINMENT_CHARS: usize = 3;
const MIN_TRANSLATION_WORD_CHARS: usize = 4;
const LONG_ANSWER_WORDS: usize = 5;
const SHORT_ANSWER_WORDS: usize = 3;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "i", "me", "my", "you", "your", "he", "him", "his", "she", "her", "it",
    "its", "we", "us", "our", "they", "them", "their", "this", "that", "these", "those", "who",
    "what", "which", "of", "in", "on", "at", "to", "for", "with", "by", "from", "into", "onto",
    "about", "over", "under", "and", "or", "but", "nor", "so", "yet", "if", "then", "than", "is",
    "are", "was", "were", "be", "not",
];

/// Which rule produced a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// One side was empty after normalization.
    Empty,
    Exact,
    Containment,
    SignificantWord,
    Translation,
    Typo,
    ComplexityPenalty,
    Lexical,
}

/// A similarity score and the tier that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextScore {
    pub similarity: f64,
    pub tier: MatchTier,
}

/// Normalized inputs shared by every rule.
struct Pair<'a> {
    student: &'a str,
    correct: &'a str,
    table: &'a TranslationTable,
}

type Rule = fn(&Pair<'_>) -> Option<TextScore>;

/// Tiers 1-5 in precedence order.
const RULES: &[Rule] = &[
    exact,
    containment,
    significant_word,
    translation_or_typo,
    complexity_penalty,
];

/// The free-text matcher, configured with a translation table.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    table: TranslationTable,
}

impl Default for TextMatcher {
    fn default() -> Self {
        Self::new(TranslationTable::builtin())
    }
}

impl TextMatcher {
    pub fn new(table: TranslationTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TranslationTable {
        &self.table
    }

    /// Score `student` against `correct`, reporting which tier decided it.
    pub fn score(&self, student: &str, correct: &str) -> TextScore {
        let student = normalize(student);
        let correct = normalize(correct);

        if student.is_empty() || correct.is_empty() {
            return TextScore {
                similarity: 0.0,
                tier: MatchTier::Empty,
            };
        }

        let pair = Pair {
            student: &student,
            correct: &correct,
            table: &self.table,
        };

        let score = RULES
            .iter()
            .find_map(|rule| rule(&pair))
            .unwrap_or_else(|| TextScore {
                similarity: lexical_similarity(&student, &correct),
                tier: MatchTier::Lexical,
            });

        tracing::debug!(
            tier = ?score.tier,
            similarity = score.similarity,
            "scored text answer"
        );
        score
    }

    /// Similarity in `[0, 1]` between a student answer and the correct answer.
    pub fn similarity(&self, student: &str, correct: &str) -> f64 {
        self.score(student, correct).similarity
    }

    /// Whether a text answer is accepted at `threshold` (inclusive).
    ///
    /// With `semantic` off, only the lexical baseline is consulted. An empty
    /// answer is never accepted, even at threshold 0.
    pub fn is_answer_correct(
        &self,
        student: &str,
        correct: &str,
        threshold: f64,
        semantic: bool,
    ) -> bool {
        if normalize(student).is_empty() {
            return false;
        }
        let similarity = if semantic {
            self.similarity(student, correct)
        } else {
            plain_lexical(student, correct)
        };
        similarity >= threshold
    }
}

/// Similarity using the built-in translation table.
pub fn text_similarity(student: &str, correct: &str) -> f64 {
    default_matcher().similarity(student, correct)
}

/// [`TextMatcher::is_answer_correct`] using the built-in translation table.
pub fn is_answer_correct(student: &str, correct: &str, threshold: f64, semantic: bool) -> bool {
    default_matcher().is_answer_correct(student, correct, threshold, semantic)
}

/// Lexical similarity of the normalized answers; empty answers score 0.
pub fn plain_lexical(student: &str, correct: &str) -> f64 {
    let student = normalize(student);
    let correct = normalize(correct);
    if student.is_empty() || correct.is_empty() {
        return 0.0;
    }
    lexical_similarity(&student, &correct)
}

fn default_matcher() -> &'static TextMatcher {
    static MATCHER: OnceLock<TextMatcher> = OnceLock::new();
    MATCHER.get_or_init(TextMatcher::default)
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Whitespace-split words with surrounding punctuation removed.
fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
}

/// Whether `phrase` occurs in `text` bounded by non-alphanumeric characters,
/// so "rome" is found in "ancient rome" but not in "chrome".
fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn exact(pair: &Pair<'_>) -> Option<TextScore> {
    (pair.student == pair.correct).then_some(TextScore {
        similarity: EXACT_SCORE,
        tier: MatchTier::Exact,
    })
}

fn containment(pair: &Pair<'_>) -> Option<TextScore> {
    if char_len(pair.student) < MIN_CONTAINMENT_CHARS || is_stopword(pair.student) {
        return None;
    }
    let pattern = format!(r"\b{}\b", regex::escape(pair.student));
    let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!("containment pattern rejected: {e}");
            return None;
        }
    };
    re.is_match(pair.correct).then_some(TextScore {
        similarity: CONTAINMENT_SCORE,
        tier: MatchTier::Containment,
    })
}

fn significant_word(pair: &Pair<'_>) -> Option<TextScore> {
    let mut student_words = pair.student.split_whitespace();
    let word = student_words.next()?;
    if student_words.next().is_some() || char_len(word) <= 3 || is_stopword(word) {
        return None;
    }
    pair.correct
        .split_whitespace()
        .any(|token| token == word)
        .then_some(TextScore {
            similarity: SIGNIFICANT_WORD_SCORE,
            tier: MatchTier::SignificantWord,
        })
}

fn translation_or_typo(pair: &Pair<'_>) -> Option<TextScore> {
    let correct_words: Vec<&str> = words(pair.correct).collect();

    for word in words(pair.student).filter(|w| char_len(w) >= MIN_TRANSLATION_WORD_CHARS) {
        for (canonical, variants) in pair.table.iter() {
            let correct_has_canonical = contains_phrase(pair.correct, canonical);
            let correct_has_variant = variants.iter().any(|v| contains_phrase(pair.correct, v));
            if !correct_has_canonical && !correct_has_variant {
                continue;
            }

            if contains_phrase(word, canonical) {
                let similarity = if correct_has_canonical {
                    EXACT_SCORE
                } else {
                    TRANSLATION_SCORE
                };
                return Some(TextScore {
                    similarity,
                    tier: MatchTier::Translation,
                });
            }
            if variants.iter().any(|v| contains_phrase(word, v)) {
                return Some(TextScore {
                    similarity: TRANSLATION_SCORE,
                    tier: MatchTier::Translation,
                });
            }
        }

        if char_len(word) > MIN_TRANSLATION_WORD_CHARS {
            let typo = correct_words.iter().any(|candidate| {
                char_len(candidate) > MIN_TRANSLATION_WORD_CHARS
                    && *candidate != word
                    && levenshtein(word, candidate) <= MAX_TYPO_DISTANCE
            });
            if typo {
                return Some(TextScore {
                    similarity: TYPO_SCORE,
                    tier: MatchTier::Typo,
                });
            }
        }
    }

    None
}

fn complexity_penalty(pair: &Pair<'_>) -> Option<TextScore> {
    let correct_words = pair.correct.split_whitespace().count();
    let student_words = pair.student.split_whitespace().count();
    if correct_words > LONG_ANSWER_WORDS && student_words < SHORT_ANSWER_WORDS {
        return Some(TextScore {
            similarity: COMPLEXITY_CAP.min(lexical_similarity(pair.student, pair.correct)),
            tier: MatchTier::ComplexityPenalty,
        });
    }
    None
}
