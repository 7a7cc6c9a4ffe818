/// Stochastic grammar runtime — types, parsing, loading, and expansion.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::markov::{MarkovError, MarkovModel};

/// Expansion depth past which a rule chain is treated as runaway recursion.
pub const MAX_EXPANSION_DEPTH: usize = 16;

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("rule not found: {0}")]
    RuleNotFound(String),
    #[error("rule '{0}' has no selectable alternative")]
    EmptyRule(String),
    #[error("expansion of '{0}' exceeded the depth limit")]
    RecursionLimit(String),
    #[error("markov corpus not loaded: {0}")]
    MarkovCorpusNotFound(String),
    #[error("markov error: {0}")]
    Markov(#[from] MarkovError),
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Reference to another grammar rule: `{rule_name}`.
    RuleRef(String),
    /// Reference to a Markov generator: `{markov:corpus}` or `{markov:corpus:tag}`.
    MarkovRef { corpus: String, tag: Option<String> },
}

/// A parsed template — a sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{rule_name}` → `RuleRef`
    /// - `{markov:corpus}` / `{markov:corpus:tag}` → `MarkovRef`
    /// - `{{` / `}}` → literal `{` / `}`
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, GrammarError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' if i + 1 < len && chars[i + 1] == '{' => {
                    literal_buf.push('{');
                    i += 2;
                }
                '{' => {
                    if !literal_buf.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                    }

                    let start = i + 1;
                    let mut end = start;
                    while end < len && chars[end] != '}' {
                        if chars[end] == '{' {
                            return Err(GrammarError::TemplateParse(
                                "nested braces are not allowed".to_string(),
                            ));
                        }
                        end += 1;
                    }
                    if end == len {
                        return Err(GrammarError::TemplateParse("unclosed brace".to_string()));
                    }

                    let content: String = chars[start..end].iter().collect();
                    segments.push(Self::parse_segment(content.trim())?);
                    i = end + 1;
                }
                '}' if i + 1 < len && chars[i + 1] == '}' => {
                    literal_buf.push('}');
                    i += 2;
                }
                '}' => {
                    return Err(GrammarError::TemplateParse(
                        "unmatched closing brace".to_string(),
                    ));
                }
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    fn parse_segment(content: &str) -> Result<TemplateSegment, GrammarError> {
        if content.is_empty() {
            return Err(GrammarError::TemplateParse("empty braces".to_string()));
        }

        if let Some(rest) = content.strip_prefix("markov:") {
            let mut parts = rest.splitn(2, ':');
            let corpus = parts.next().unwrap_or_default();
            if corpus.is_empty() {
                return Err(GrammarError::TemplateParse(format!(
                    "markov reference needs a corpus: {{{}}}",
                    content
                )));
            }
            let tag = parts.next().filter(|t| !t.is_empty()).map(str::to_string);
            return Ok(TemplateSegment::MarkovRef {
                corpus: corpus.to_string(),
                tag,
            });
        }

        if content.contains(char::is_whitespace) {
            return Err(GrammarError::TemplateParse(format!(
                "rule names may not contain whitespace: {{{}}}",
                content
            )));
        }

        Ok(TemplateSegment::RuleRef(content.to_string()))
    }

    /// Names of the rules this template references.
    pub fn rule_refs(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::RuleRef(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// A weighted text alternative within a grammar rule.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub weight: u32,
    pub template: Template,
}

/// A single grammar rule with weighted alternatives.
#[derive(Debug, Clone)]
pub struct GrammarRule {
    pub name: String,
    pub alternatives: Vec<Alternative>,
}

impl GrammarRule {
    /// Pick one alternative by weight.
    fn pick(&self, rng: &mut StdRng) -> Result<&Alternative, GrammarError> {
        let weights: Vec<u32> = self.alternatives.iter().map(|a| a.weight).collect();
        let dist =
            WeightedIndex::new(&weights).map_err(|_| GrammarError::EmptyRule(self.name.clone()))?;
        Ok(&self.alternatives[dist.sample(rng)])
    }
}

/// Markov models and word bounds available while expanding a rule.
pub struct ExpansionContext<'a> {
    pub markov_models: FxHashMap<String, &'a MarkovModel>,
    pub min_words: usize,
    pub max_words: usize,
}

impl<'a> ExpansionContext<'a> {
    pub fn new() -> Self {
        Self {
            markov_models: FxHashMap::default(),
            min_words: 5,
            max_words: 25,
        }
    }

    pub fn with_model(mut self, corpus: &str, model: &'a MarkovModel) -> Self {
        self.markov_models.insert(corpus.to_string(), model);
        self
    }
}

impl Default for ExpansionContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of named grammar rules.
#[derive(Debug, Clone, Default)]
pub struct GrammarSet {
    pub rules: HashMap<String, GrammarRule>,
}

// The RON layout is keyed by rule name with raw template text, so it
// deserializes through these before templates are parsed.

#[derive(Debug, Deserialize)]
struct RonAlternative {
    weight: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Rule")]
struct RonRule {
    alternatives: Vec<RonAlternative>,
}

impl GrammarSet {
    /// Load a grammar set from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<GrammarSet, GrammarError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a grammar set from a RON string.
    pub fn parse_ron(input: &str) -> Result<GrammarSet, GrammarError> {
        let raw: HashMap<String, RonRule> = ron::from_str(input)?;
        let mut rules = HashMap::with_capacity(raw.len());

        for (name, ron_rule) in raw {
            let alternatives = ron_rule
                .alternatives
                .into_iter()
                .map(|alt| {
                    Ok(Alternative {
                        weight: alt.weight,
                        template: Template::parse(&alt.text)?,
                    })
                })
                .collect::<Result<Vec<_>, GrammarError>>()?;
            rules.insert(name.clone(), GrammarRule { name, alternatives });
        }

        Ok(GrammarSet { rules })
    }

    /// Expand `rule_name` into text.
    pub fn expand(
        &self,
        rule_name: &str,
        ctx: &ExpansionContext<'_>,
        rng: &mut StdRng,
    ) -> Result<String, GrammarError> {
        let mut out = String::new();
        self.expand_into(rule_name, ctx, rng, 0, &mut out)?;
        Ok(out)
    }

    fn expand_into(
        &self,
        rule_name: &str,
        ctx: &ExpansionContext<'_>,
        rng: &mut StdRng,
        depth: usize,
        out: &mut String,
    ) -> Result<(), GrammarError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(GrammarError::RecursionLimit(rule_name.to_string()));
        }

        let rule = self
            .rules
            .get(rule_name)
            .ok_or_else(|| GrammarError::RuleNotFound(rule_name.to_string()))?;
        let alternative = rule.pick(rng)?;

        for segment in &alternative.template.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::RuleRef(name) => {
                    self.expand_into(name, ctx, rng, depth + 1, out)?;
                }
                TemplateSegment::MarkovRef { corpus, tag } => {
                    let model = ctx
                        .markov_models
                        .get(corpus)
                        .ok_or_else(|| GrammarError::MarkovCorpusNotFound(corpus.clone()))?;
                    let text = model.generate(rng, tag.as_deref(), ctx.min_words, ctx.max_words)?;
                    out.push_str(&text);
                }
            }
        }

        Ok(())
    }

    /// Referenced rule names that have no definition, as `(referrer, missing)`.
    pub fn broken_references(&self) -> Vec<(String, String)> {
        let mut broken = Vec::new();
        for (name, rule) in &self.rules {
            for alt in &rule.alternatives {
                for target in alt.template.rule_refs() {
                    if !self.rules.contains_key(target) {
                        broken.push((name.clone(), target.to_string()));
                    }
                }
            }
        }
        broken.sort();
        broken
    }

    /// Rules that cannot finish expanding: every alternative reaches back
    /// into a rule that itself never terminates.
    pub fn non_terminating_rules(&self) -> Vec<String> {
        let mut terminating: FxHashSet<&str> = FxHashSet::default();

        loop {
            let before = terminating.len();
            for (name, rule) in &self.rules {
                if terminating.contains(name.as_str()) {
                    continue;
                }
                let finishes = rule.alternatives.iter().any(|alt| {
                    alt.weight > 0 && alt.template.rule_refs().all(|r| terminating.contains(r))
                });
                if finishes {
                    terminating.insert(name.as_str());
                }
            }
            if terminating.len() == before {
                break;
            }
        }

        let mut stuck: Vec<String> = self
            .rules
            .keys()
            .filter(|name| !terminating.contains(name.as_str()))
            .cloned()
            .collect();
        stuck.sort();
        stuck
    }

    /// Every rule reachable from `entry` through rule references.
    pub fn reachable_from(&self, entry: &str) -> FxHashSet<String> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![entry.to_string()];

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(rule) = self.rules.get(&name) {
                for alt in &rule.alternatives {
                    stack.extend(alt.template.rule_refs().map(str::to_string));
                }
            }
        }

        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::markov::MarkovTrainer;
    use rand::SeedableRng;

    const TEST_GRAMMAR: &str = r#"{
        "greeting": Rule(
            alternatives: [
                (weight: 3, text: "Hail, {title}."),
                (weight: 1, text: "Well met, {title}."),
            ],
        ),
        "title": Rule(
            alternatives: [
                (weight: 1, text: "traveller"),
                (weight: 1, text: "stranger"),
            ],
        ),
        "rumour": Rule(
            alternatives: [
                (weight: 1, text: "They say {markov:tavern}"),
            ],
        ),
    }"#;

    #[test]
    fn parse_literal_only() {
        let t = Template::parse("Hello, world.").unwrap();
        assert_eq!(
            t.segments,
            vec![TemplateSegment::Literal("Hello, world.".to_string())]
        );
    }

    #[test]
    fn parse_rule_ref() {
        let t = Template::parse("{given_name} {family_name}").unwrap();
        assert_eq!(t.segments.len(), 3);
        assert_eq!(
            t.segments[0],
            TemplateSegment::RuleRef("given_name".to_string())
        );
        assert_eq!(t.segments[1], TemplateSegment::Literal(" ".to_string()));
    }

    #[test]
    fn parse_markov_ref_with_and_without_tag() {
        let t = Template::parse("{markov:lore:backstory}").unwrap();
        assert_eq!(
            t.segments[0],
            TemplateSegment::MarkovRef {
                corpus: "lore".to_string(),
                tag: Some("backstory".to_string()),
            }
        );

        let t = Template::parse("{markov:lore}").unwrap();
        assert_eq!(
            t.segments[0],
            TemplateSegment::MarkovRef {
                corpus: "lore".to_string(),
                tag: None,
            }
        );
    }

    #[test]
    fn parse_escaped_braces() {
        let t = Template::parse("Use {{braces}} here.").unwrap();
        assert_eq!(
            t.segments,
            vec![TemplateSegment::Literal("Use {braces} here.".to_string())]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(Template::parse("Bad {} here").is_err());
        assert!(Template::parse("Bad {outer{inner}} here").is_err());
        assert!(Template::parse("Bad {unclosed here").is_err());
        assert!(Template::parse("Bad } here").is_err());
        assert!(Template::parse("{markov:}").is_err());
        assert!(Template::parse("{two words}").is_err());
    }

    #[test]
    fn rule_refs_lists_only_rules() {
        let t = Template::parse("{a} and {markov:lore} and {b}").unwrap();
        let refs: Vec<&str> = t.rule_refs().collect();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn load_grammar_from_ron_string() {
        let gs = GrammarSet::parse_ron(TEST_GRAMMAR).unwrap();
        assert_eq!(gs.rules.len(), 3);
        assert_eq!(gs.rules["greeting"].alternatives.len(), 2);
        assert_eq!(gs.rules["greeting"].name, "greeting");
    }

    #[test]
    fn expand_resolves_nested_rules() {
        let gs = GrammarSet::parse_ron(TEST_GRAMMAR).unwrap();
        let ctx = ExpansionContext::new();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            let text = gs.expand("greeting", &ctx, &mut rng).unwrap();
            assert!(
                text.ends_with("traveller.") || text.ends_with("stranger."),
                "unexpected expansion: {}",
                text
            );
        }
    }

    #[test]
    fn expand_is_deterministic_for_a_seed() {
        let gs = GrammarSet::parse_ron(TEST_GRAMMAR).unwrap();
        let ctx = ExpansionContext::new();
        let a = gs.expand("greeting", &ctx, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = gs.expand("greeting", &ctx, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn expand_markov_ref_uses_context_model() {
        let gs = GrammarSet::parse_ron(TEST_GRAMMAR).unwrap();
        let model = MarkovTrainer::train("The miller drowned in the mill pond.", 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let ctx = ExpansionContext::new();
        assert!(matches!(
            gs.expand("rumour", &ctx, &mut rng),
            Err(GrammarError::MarkovCorpusNotFound(c)) if c == "tavern"
        ));

        let mut ctx = ExpansionContext::new().with_model("tavern", &model);
        ctx.min_words = 1;
        let text = gs.expand("rumour", &ctx, &mut rng).unwrap();
        assert_eq!(text, "They say The miller drowned in the mill pond.");
    }

    #[test]
    fn expand_unknown_rule() {
        let gs = GrammarSet::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            gs.expand("missing", &ExpansionContext::new(), &mut rng),
            Err(GrammarError::RuleNotFound(r)) if r == "missing"
        ));
    }

    #[test]
    fn expand_zero_weight_rule_is_empty() {
        let gs = GrammarSet::parse_ron(
            r#"{ "mute": Rule(alternatives: [(weight: 0, text: "never")]) }"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            gs.expand("mute", &ExpansionContext::new(), &mut rng),
            Err(GrammarError::EmptyRule(_))
        ));
    }

    #[test]
    fn expand_stops_runaway_recursion() {
        let gs = GrammarSet::parse_ron(
            r#"{ "echo": Rule(alternatives: [(weight: 1, text: "again {echo}")]) }"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            gs.expand("echo", &ExpansionContext::new(), &mut rng),
            Err(GrammarError::RecursionLimit(_))
        ));
        assert_eq!(gs.non_terminating_rules(), vec!["echo".to_string()]);
    }

    #[test]
    fn broken_references_are_reported() {
        let gs = GrammarSet::parse_ron(
            r#"{ "a": Rule(alternatives: [(weight: 1, text: "{b} {c}")]),
                 "b": Rule(alternatives: [(weight: 1, text: "bee")]) }"#,
        )
        .unwrap();
        assert_eq!(
            gs.broken_references(),
            vec![("a".to_string(), "c".to_string())]
        );
    }

    #[test]
    fn reachability_follows_references() {
        let gs = GrammarSet::parse_ron(TEST_GRAMMAR).unwrap();
        let reached = gs.reachable_from("greeting");
        assert!(reached.contains("greeting"));
        assert!(reached.contains("title"));
        assert!(!reached.contains("rumour"));
    }
}
