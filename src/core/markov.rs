/// Markov chain phrase generator — training and sentence-bounded generation.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkovError {
    #[error("no data for generation (model is empty or tag has no data)")]
    NoData,
    #[error("no sentence start found")]
    NoSentenceStart,
    #[error("n-gram depth must be 2-4, got {0}")]
    InvalidDepth(usize),
}

/// Special token marking sentence start.
const SENTENCE_START: &str = "<S>";
/// Special token marking sentence end.
const SENTENCE_END: &str = "</S>";

const SENTENCE_ENDERS: &[char] = &['.', '!', '?'];
const PUNCTUATION: &[char] = &['.', '!', '?', ',', ';', ':', '"', '\''];

type TransitionTable = HashMap<Vec<String>, Vec<(String, u32)>>;

/// A trained Markov model storing n-gram transition counts.
#[derive(Debug, Clone, Default)]
pub struct MarkovModel {
    /// N-gram depth (2 for bigrams, 3 for trigrams).
    pub n: usize,
    /// Prefix → [(next_token, count)] over the whole corpus.
    pub transitions: TransitionTable,
    /// Same tables restricted to `[tag]` sections of the corpus.
    pub tagged_transitions: HashMap<String, TransitionTable>,
}

impl MarkovModel {
    /// Generate text from this model.
    ///
    /// Starts from a sentence-start state, walks the chain selecting next
    /// tokens by weighted probability, and stops at the first sentence
    /// boundary reached after `min_words`. If `max_words` is hit first the
    /// output is cut back to the last complete sentence.
    pub fn generate(
        &self,
        rng: &mut StdRng,
        tag: Option<&str>,
        min_words: usize,
        max_words: usize,
    ) -> Result<String, MarkovError> {
        let transitions = match tag {
            Some(tag) => self.tagged_transitions.get(tag).ok_or(MarkovError::NoData)?,
            None => &self.transitions,
        };

        if transitions.is_empty() || self.n < 2 {
            return Err(MarkovError::NoData);
        }

        let mut result_tokens: Vec<String> = Vec::new();
        let mut state = self.start_state();
        let mut word_count = 0;
        let mut last_sentence_end = 0;

        // bounded walk; a chain with no sentence end must still terminate
        for _ in 0..(max_words * 3) {
            let Some(next) = pick_next(transitions, &state, rng) else {
                break;
            };

            if next == SENTENCE_END {
                last_sentence_end = result_tokens.len();
                if word_count >= min_words {
                    break;
                }
                state = self.start_state();
                continue;
            }

            if !is_punctuation(&next) {
                word_count += 1;
            }

            result_tokens.push(next.clone());

            state.push(next);
            if state.len() > self.n - 1 {
                state.remove(0);
            }

            if word_count >= max_words {
                if last_sentence_end > 0 {
                    result_tokens.truncate(last_sentence_end);
                }
                break;
            }
        }

        if result_tokens.is_empty() {
            return Err(MarkovError::NoSentenceStart);
        }

        Ok(reassemble_tokens(&result_tokens))
    }

    /// Returns true if the model has transitions for `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tagged_transitions
            .get(tag)
            .is_some_and(|table| !table.is_empty())
    }

    fn start_state(&self) -> Vec<String> {
        vec![SENTENCE_START.to_string(); self.n - 1]
    }
}

fn pick_next(transitions: &TransitionTable, state: &[String], rng: &mut StdRng) -> Option<String> {
    let options = transitions.get(state)?;
    if options.is_empty() {
        return None;
    }

    let weights: Vec<u32> = options.iter().map(|(_, count)| *count).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(options[dist.sample(rng)].0.clone())
}

fn is_punctuation(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if PUNCTUATION.contains(&c))
}

fn is_sentence_ender(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if SENTENCE_ENDERS.contains(&c))
}

/// Reassemble tokens into natural text (attach punctuation to previous word).
fn reassemble_tokens(tokens: &[String]) -> String {
    let mut result = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 && !is_punctuation(tok) {
            result.push(' ');
        }
        result.push_str(tok);
    }
    result
}

/// Trains Markov models from raw text.
pub struct MarkovTrainer;

impl MarkovTrainer {
    /// Train a Markov model from raw text with the given n-gram depth.
    ///
    /// Lines of the form `[tag]` open a tagged region that lasts until the
    /// next tag line. Tagged text feeds both the global table and the
    /// table for its tag.
    pub fn train(text: &str, n: usize) -> Result<MarkovModel, MarkovError> {
        if !(2..=4).contains(&n) {
            return Err(MarkovError::InvalidDepth(n));
        }

        let mut transitions = TransitionTable::new();
        let mut tagged_transitions: HashMap<String, TransitionTable> = HashMap::new();
        let mut current_tag: Option<String> = None;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(tag) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .filter(|tag| !tag.is_empty())
            {
                current_tag = Some(tag.to_string());
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tokens = tokenize(trimmed);
            for sentence in split_into_sentences(&tokens) {
                let mut padded = vec![SENTENCE_START.to_string(); n - 1];
                padded.extend(sentence);
                padded.push(SENTENCE_END.to_string());

                for window in padded.windows(n) {
                    let prefix: Vec<String> = window[..n - 1].to_vec();
                    let next = window[n - 1].clone();

                    add_transition(&mut transitions, prefix.clone(), next.clone());

                    if let Some(ref tag) = current_tag {
                        let tag_table = tagged_transitions.entry(tag.clone()).or_default();
                        add_transition(tag_table, prefix, next);
                    }
                }
            }
        }

        Ok(MarkovModel {
            n,
            transitions,
            tagged_transitions,
        })
    }
}

fn add_transition(table: &mut TransitionTable, prefix: Vec<String>, next: String) {
    let entries = table.entry(prefix).or_default();
    if let Some(entry) = entries.iter_mut().find(|(tok, _)| tok == &next) {
        entry.1 += 1;
    } else {
        entries.push((next, 1));
    }
}

/// Split on whitespace, with punctuation as separate tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        let mut remaining = word;
        while let Some(first) = remaining.chars().next() {
            if PUNCTUATION.contains(&first) {
                tokens.push(first.to_string());
                remaining = &remaining[first.len_utf8()..];
                continue;
            }

            match remaining.find(|c: char| PUNCTUATION.contains(&c)) {
                Some(pos) => {
                    tokens.push(remaining[..pos].to_string());
                    remaining = &remaining[pos..];
                }
                None => {
                    tokens.push(remaining.to_string());
                    break;
                }
            }
        }
    }
    tokens
}

/// Split a token sequence into sentences at sentence-ending punctuation.
fn split_into_sentences(tokens: &[String]) -> Vec<Vec<String>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for tok in tokens {
        current.push(tok.clone());
        if is_sentence_ender(tok) {
            sentences.push(std::mem::take(&mut current));
        }
    }

    // trailing tokens without an ender still form a sentence
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synth::LORE_CORPUS;
    use rand::SeedableRng;

    fn train_lore_corpus() -> MarkovModel {
        MarkovTrainer::train(LORE_CORPUS, 2).unwrap()
    }

    #[test]
    fn tokenize_basic() {
        let tokens = tokenize("Hello, world.");
        assert_eq!(tokens, vec!["Hello", ",", "world", "."]);
    }

    #[test]
    fn tokenize_quotes_and_questions() {
        let tokens = tokenize("The smith asked, \"Who?\" Nobody answered.");
        assert!(tokens.contains(&"smith".to_string()));
        assert!(tokens.contains(&",".to_string()));
        assert!(tokens.contains(&"?".to_string()));
        assert!(tokens.contains(&"\"".to_string()));
    }

    #[test]
    fn split_sentences_keeps_trailing_fragment() {
        let tokens = tokenize("One road. Two roads and no end");
        let sentences = split_into_sentences(&tokens);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].last().map(String::as_str), Some("."));
    }

    #[test]
    fn train_rejects_bad_depth() {
        assert!(matches!(
            MarkovTrainer::train("text.", 1),
            Err(MarkovError::InvalidDepth(1))
        ));
        assert!(MarkovTrainer::train("text.", 5).is_err());
    }

    #[test]
    fn train_creates_tagged_transitions() {
        let model = train_lore_corpus();
        assert_eq!(model.n, 2);
        assert!(!model.transitions.is_empty());
        assert!(model.has_tag("backstory"));
        assert!(model.has_tag("quest"));
        assert!(!model.has_tag("nonexistent"));
    }

    #[test]
    fn generate_deterministic() {
        let model = train_lore_corpus();
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        let a = model.generate(&mut rng1, Some("backstory"), 4, 24).unwrap();
        let b = model.generate(&mut rng2, Some("backstory"), 4, 24).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn generate_produces_words() {
        let model = train_lore_corpus();
        let mut rng = StdRng::seed_from_u64(7);

        let result = model.generate(&mut rng, Some("quest"), 3, 30).unwrap();
        let word_count = result.split_whitespace().count();
        assert!(word_count >= 3, "Expected at least 3 words, got: {}", result);
    }

    #[test]
    fn generate_invalid_tag_returns_error() {
        let model = train_lore_corpus();
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            model.generate(&mut rng, Some("nonexistent_tag"), 3, 20),
            Err(MarkovError::NoData)
        ));
    }

    #[test]
    fn empty_model_has_no_data() {
        let model = MarkovModel::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(model.generate(&mut rng, None, 1, 5).is_err());
    }

    #[test]
    fn trigram_model_generates() {
        let model = MarkovTrainer::train(LORE_CORPUS, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let result = model.generate(&mut rng, None, 3, 20).unwrap();
        assert!(!result.is_empty());
    }

    #[test]
    fn reassemble_attaches_punctuation() {
        let tokens: Vec<String> = ["Hello", ",", "world", "."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(reassemble_tokens(&tokens), "Hello, world.");
    }
}
