/// Grammar Linter — validates a lore grammar before it ships.
///
/// Usage: grammar_linter [<grammar.ron>]
///
/// Without a path the bundled fantasy grammar is checked.

use questboard::core::grammar::{GrammarSet, TemplateSegment};
use questboard::core::markov::{MarkovModel, MarkovTrainer};
use questboard::core::synth::{
    LORE_CORPUS, LORE_CORPUS_ID, LORE_GRAMMAR, NAME_RULE, PARAGRAPH_SENTENCE_RULE, SENTENCE_RULE,
};
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        println!("Usage: grammar_linter [<grammar.ron>]");
        process::exit(0);
    }

    let grammars = match args.get(1) {
        Some(path) => GrammarSet::load_from_ron(Path::new(path)),
        None => GrammarSet::parse_ron(LORE_GRAMMAR),
    }
    .unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to load grammar: {}", e);
        process::exit(1);
    });

    let corpus = MarkovTrainer::train(LORE_CORPUS, 2).unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to train lore corpus: {}", e);
        process::exit(1);
    });

    println!("Loaded {} grammar rules", grammars.rules.len());

    let (errors, warnings) = lint_grammars(&grammars, &corpus);

    println!("\n=== Grammar Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn lint_grammars(grammars: &GrammarSet, corpus: &MarkovModel) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let entry_rules = [NAME_RULE, SENTENCE_RULE, PARAGRAPH_SENTENCE_RULE];
    let mut reachable: FxHashSet<String> = FxHashSet::default();
    for entry in entry_rules {
        if !grammars.rules.contains_key(entry) {
            errors.push(format!("Missing entry rule '{}'", entry));
        }
        reachable.extend(grammars.reachable_from(entry));
    }

    for (referrer, missing) in grammars.broken_references() {
        errors.push(format!(
            "Rule '{}' references non-existent rule '{}'",
            referrer, missing
        ));
    }

    for name in grammars.non_terminating_rules() {
        errors.push(format!(
            "Rule '{}' has no terminating alternative (infinite recursion)",
            name
        ));
    }

    let mut names: Vec<&String> = grammars.rules.keys().collect();
    names.sort();

    for name in names {
        let rule = &grammars.rules[name];

        if rule.alternatives.len() < 3 {
            warnings.push(format!(
                "Rule '{}' has only {} alternatives (minimum 3 recommended)",
                name,
                rule.alternatives.len()
            ));
        }

        if !reachable.contains(name.as_str()) {
            warnings.push(format!("Rule '{}' is never reached from an entry rule", name));
        }

        for alt in &rule.alternatives {
            for segment in &alt.template.segments {
                if let TemplateSegment::MarkovRef { corpus: id, tag } = segment {
                    if id != LORE_CORPUS_ID {
                        warnings.push(format!(
                            "Rule '{}' references Markov corpus '{}' which is not loaded",
                            name, id
                        ));
                    } else if let Some(tag) = tag {
                        if !corpus.has_tag(tag) {
                            warnings.push(format!(
                                "Rule '{}' uses tag '{}' which has no text in the corpus",
                                name, tag
                            ));
                        }
                    }
                }
            }
        }
    }

    (errors, warnings)
}
