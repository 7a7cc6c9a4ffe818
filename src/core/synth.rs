/// Text synthesis — names, sentences, and paragraphs for generated lore.
///
/// `TextSynthesizer` is the seam the scenario generator talks to.
/// `LoreSynthesizer` implements it with the fantasy grammar and Markov
/// corpus bundled in `genre_data/fantasy/`.

use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::core::grammar::{ExpansionContext, GrammarError, GrammarSet};
use crate::core::markov::{MarkovError, MarkovModel, MarkovTrainer};

/// Fantasy grammar bundled with the crate.
pub const LORE_GRAMMAR: &str = include_str!("../../genre_data/fantasy/grammar.ron");
/// Fantasy training corpus bundled with the crate.
pub const LORE_CORPUS: &str = include_str!("../../genre_data/fantasy/corpus.txt");

/// Corpus id under which the lore model is exposed to `{markov:...}` refs.
pub const LORE_CORPUS_ID: &str = "lore";

/// Rules the synthesizer starts expansion from.
pub const NAME_RULE: &str = "name";
pub const SENTENCE_RULE: &str = "sentence";
pub const PARAGRAPH_SENTENCE_RULE: &str = "paragraph_sentence";

const LORE_NGRAM: usize = 2;
const SENTENCE_WORDS: (usize, usize) = (1, 30);
const PARAGRAPH_SENTENCES: (usize, usize) = (3, 5);

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("markov error: {0}")]
    Markov(#[from] MarkovError),
    #[error("synthesizer produced no text for '{0}'")]
    EmptyOutput(&'static str),
}

/// Produces plausible human-readable text for generated content.
///
/// Implementations draw all randomness from the `rng` they are handed so a
/// single seed fixes an entire scenario.
pub trait TextSynthesizer {
    /// A person's name, e.g. "Aldric Thornwood".
    fn name(&mut self, rng: &mut StdRng) -> Result<String, SynthError>;
    /// One sentence ending in terminal punctuation.
    fn sentence(&mut self, rng: &mut StdRng) -> Result<String, SynthError>;
    /// A short paragraph of several sentences.
    fn paragraph(&mut self, rng: &mut StdRng) -> Result<String, SynthError>;
}

/// Grammar + Markov implementation of `TextSynthesizer`.
#[derive(Debug, Clone)]
pub struct LoreSynthesizer {
    grammars: GrammarSet,
    corpus: MarkovModel,
}

impl LoreSynthesizer {
    /// Build from the bundled fantasy grammar and corpus.
    pub fn new() -> Result<Self, SynthError> {
        let grammars = GrammarSet::parse_ron(LORE_GRAMMAR)?;
        let corpus = MarkovTrainer::train(LORE_CORPUS, LORE_NGRAM)?;
        debug!(
            rules = grammars.rules.len(),
            prefixes = corpus.transitions.len(),
            "lore synthesizer loaded"
        );
        Ok(Self::with_content(grammars, corpus))
    }

    /// Build from caller-supplied content. The grammar must define
    /// `name`, `sentence` and `paragraph_sentence`.
    pub fn with_content(grammars: GrammarSet, corpus: MarkovModel) -> Self {
        Self { grammars, corpus }
    }

    pub fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }

    fn expand(&self, rule: &'static str, rng: &mut StdRng) -> Result<String, SynthError> {
        let mut ctx = ExpansionContext::new().with_model(LORE_CORPUS_ID, &self.corpus);
        ctx.min_words = SENTENCE_WORDS.0;
        ctx.max_words = SENTENCE_WORDS.1;

        let text = tidy(&self.grammars.expand(rule, &ctx, rng)?);
        if text.is_empty() {
            return Err(SynthError::EmptyOutput(rule));
        }
        Ok(text)
    }
}

impl TextSynthesizer for LoreSynthesizer {
    fn name(&mut self, rng: &mut StdRng) -> Result<String, SynthError> {
        self.expand(NAME_RULE, rng)
    }

    fn sentence(&mut self, rng: &mut StdRng) -> Result<String, SynthError> {
        self.expand(SENTENCE_RULE, rng).map(|s| terminate(&s))
    }

    fn paragraph(&mut self, rng: &mut StdRng) -> Result<String, SynthError> {
        let count = rng.gen_range(PARAGRAPH_SENTENCES.0..=PARAGRAPH_SENTENCES.1);
        let sentences = (0..count)
            .map(|_| self.expand(PARAGRAPH_SENTENCE_RULE, rng).map(|s| terminate(&s)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sentences.join(" "))
    }
}

/// Collapse runs of whitespace and capitalize the first letter.
fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ensure a sentence ends in `.`, `!` or `?`.
fn terminate(sentence: &str) -> String {
    let trimmed = sentence.trim_end_matches([',', ';', ':', ' ']);
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn bundled_content_loads() {
        let synth = LoreSynthesizer::new().unwrap();
        for rule in [NAME_RULE, SENTENCE_RULE, PARAGRAPH_SENTENCE_RULE] {
            assert!(synth.grammars().rules.contains_key(rule), "missing {}", rule);
        }
    }

    #[test]
    fn names_are_two_or_more_words() {
        let mut synth = LoreSynthesizer::new().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..25 {
            let name = synth.name(&mut rng).unwrap();
            assert!(name.split_whitespace().count() >= 2, "odd name: {}", name);
            assert!(name.chars().next().is_some_and(char::is_uppercase));
        }
    }

    #[test]
    fn sentences_are_terminated() {
        let mut synth = LoreSynthesizer::new().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..25 {
            let s = synth.sentence(&mut rng).unwrap();
            assert!(s.ends_with(['.', '!', '?']), "unterminated: {}", s);
            assert!(s.chars().next().is_some_and(char::is_uppercase), "{}", s);
        }
    }

    #[test]
    fn paragraphs_hold_several_sentences() {
        let mut synth = LoreSynthesizer::new().unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let p = synth.paragraph(&mut rng).unwrap();
        let enders = p.matches(['.', '!', '?']).count();
        assert!(enders >= PARAGRAPH_SENTENCES.0, "short paragraph: {}", p);
    }

    #[test]
    fn same_seed_same_text() {
        let mut synth = LoreSynthesizer::new().unwrap();
        let a = synth.paragraph(&mut StdRng::seed_from_u64(5)).unwrap();
        let b = synth.paragraph(&mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_entry_rule_is_a_grammar_error() {
        let mut synth = LoreSynthesizer::with_content(GrammarSet::default(), MarkovModel::default());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            synth.name(&mut rng),
            Err(SynthError::Grammar(GrammarError::RuleNotFound(_)))
        ));
    }

    #[test]
    fn tidy_and_terminate() {
        assert_eq!(tidy("  the  old   road "), "The old road");
        assert_eq!(tidy("   "), "");
        assert_eq!(terminate("It ended"), "It ended.");
        assert_eq!(terminate("It ended,"), "It ended.");
        assert_eq!(terminate("Did it?"), "Did it?");
    }
}
