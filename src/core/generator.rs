/// Scenario generation: grid, then characters, then quests.
///
/// Each pass reads only the configuration, the random source and, for
/// quests, the characters produced by the previous pass.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::synth::{LoreSynthesizer, SynthError, TextSynthesizer};
use crate::schema::character::{Character, Location, Role};
use crate::schema::quest::{Objective, Quest};
use crate::schema::scenario::Scenario;
use crate::schema::terrain::{Grid, Terrain};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid size must be at least 1")]
    ZeroGridSize,
    #[error("number of characters must be at least 1")]
    ZeroCharacters,
    #[error("number of quests must be at least 1")]
    ZeroQuests,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("text synthesis error: {0}")]
    Synth(#[from] SynthError),
    #[error("cannot generate {requested} quests without characters; generate characters first")]
    NoQuestGivers { requested: usize },
}

/// The three sizes that shape a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub grid_size: usize,
    pub num_characters: usize,
    pub num_quests: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            num_characters: 5,
            num_quests: 3,
        }
    }
}

impl ScenarioConfig {
    /// All three sizes must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::ZeroGridSize);
        }
        if self.num_characters == 0 {
            return Err(ConfigError::ZeroCharacters);
        }
        if self.num_quests == 0 {
            return Err(ConfigError::ZeroQuests);
        }
        Ok(())
    }
}

/// Generates one scenario. Built via `ScenarioGenerator::builder()`.
pub struct ScenarioGenerator {
    config: ScenarioConfig,
    rng: StdRng,
    synth: Box<dyn TextSynthesizer>,
    scenario: Scenario,
}

/// Builder for constructing a `ScenarioGenerator`.
pub struct ScenarioGeneratorBuilder {
    config: ScenarioConfig,
    seed: Option<u64>,
    /// Directly provided synthesizer (fakes in tests, custom lore).
    synth: Option<Box<dyn TextSynthesizer>>,
}

impl ScenarioGenerator {
    pub fn builder() -> ScenarioGeneratorBuilder {
        ScenarioGeneratorBuilder {
            config: ScenarioConfig::default(),
            seed: None,
            synth: None,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Everything generated so far.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn into_scenario(self) -> Scenario {
        self.scenario
    }

    /// Fill an N×N grid with uniformly drawn terrain.
    pub fn generate_grid(&mut self) -> &Grid {
        let n = self.config.grid_size;
        let rows = (0..n)
            .map(|_| {
                (0..n)
                    .map(|_| Terrain::ALL[self.rng.gen_range(0..Terrain::ALL.len())])
                    .collect()
            })
            .collect();
        self.scenario.grid = Grid { rows };
        debug!(size = n, "grid generated");
        &self.scenario.grid
    }

    /// Create the character roster. On a synthesis failure the roster is
    /// left empty. Existing quests are dropped since their givers are gone.
    pub fn generate_characters(&mut self) -> Result<&[Character], GenerationError> {
        self.scenario.characters.clear();
        self.scenario.quests.clear();

        let mut characters = Vec::with_capacity(self.config.num_characters);
        for _ in 0..self.config.num_characters {
            let name = self.synth.name(&mut self.rng).map_err(|e| self.synth_failed("characters", e))?;
            let role = Role::ALL[self.rng.gen_range(0..Role::ALL.len())];
            let backstory = self
                .synth
                .sentence(&mut self.rng)
                .map_err(|e| self.synth_failed("characters", e))?;
            let location = random_location(&mut self.rng, self.config.grid_size);

            characters.push(Character {
                name,
                role,
                backstory,
                location,
            });
        }

        self.scenario.characters = characters;
        debug!(count = self.scenario.characters.len(), "characters generated");
        Ok(&self.scenario.characters)
    }

    /// Create quests handed out by the existing characters, chosen with
    /// replacement. Fails without touching anything if no characters exist.
    pub fn generate_quests(&mut self) -> Result<&[Quest], GenerationError> {
        self.scenario.quests.clear();

        let requested = self.config.num_quests;
        if self.scenario.characters.is_empty() && requested > 0 {
            warn!(requested, "quest generation attempted before characters");
            return Err(GenerationError::NoQuestGivers { requested });
        }

        let mut quests = Vec::with_capacity(requested);
        for _ in 0..requested {
            let quest_giver = self
                .scenario
                .characters
                .choose(&mut self.rng)
                .map(|c| c.name.clone())
                .ok_or(GenerationError::NoQuestGivers { requested })?;
            let location = random_location(&mut self.rng, self.config.grid_size);
            let objective = Objective::ALL[self.rng.gen_range(0..Objective::ALL.len())];
            let details = self
                .synth
                .paragraph(&mut self.rng)
                .map_err(|e| self.synth_failed("quests", e))?;

            quests.push(Quest {
                quest_giver,
                objective,
                location,
                details,
            });
        }

        self.scenario.quests = quests;
        debug!(count = self.scenario.quests.len(), "quests generated");
        Ok(&self.scenario.quests)
    }

    /// Run all three passes in order.
    pub fn generate_all(&mut self) -> Result<&Scenario, GenerationError> {
        self.generate_grid();
        self.generate_characters()?;
        self.generate_quests()?;
        info!(
            grid_size = self.config.grid_size,
            characters = self.scenario.characters.len(),
            quests = self.scenario.quests.len(),
            "scenario generated"
        );
        Ok(&self.scenario)
    }

    fn synth_failed(&self, pass: &'static str, err: SynthError) -> GenerationError {
        warn!(pass, error = %err, "text synthesis failed; leaving collection empty");
        GenerationError::Synth(err)
    }
}

impl ScenarioGeneratorBuilder {
    pub fn config(mut self, config: ScenarioConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.config.grid_size = grid_size;
        self
    }

    pub fn num_characters(mut self, num_characters: usize) -> Self {
        self.config.num_characters = num_characters;
        self
    }

    pub fn num_quests(mut self, num_quests: usize) -> Self {
        self.config.num_quests = num_quests;
        self
    }

    /// Fix the random source. Without a seed every run differs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Provide a synthesizer directly instead of the bundled lore.
    pub fn with_synthesizer(mut self, synth: Box<dyn TextSynthesizer>) -> Self {
        self.synth = Some(synth);
        self
    }

    pub fn build(self) -> Result<ScenarioGenerator, GenerationError> {
        self.config.validate()?;

        let synth = match self.synth {
            Some(synth) => synth,
            None => Box::new(LoreSynthesizer::new()?),
        };
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(ScenarioGenerator {
            config: self.config,
            rng,
            synth,
            scenario: Scenario::default(),
        })
    }
}

fn random_location(rng: &mut StdRng, size: usize) -> Location {
    Location::new(rng.gen_range(0..size), rng.gen_range(0..size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grammar::GrammarError;

    /// Numbered, predictable text.
    struct CountingSynth {
        calls: usize,
    }

    impl TextSynthesizer for CountingSynth {
        fn name(&mut self, _rng: &mut StdRng) -> Result<String, SynthError> {
            self.calls += 1;
            Ok(format!("Person {}", self.calls))
        }

        fn sentence(&mut self, _rng: &mut StdRng) -> Result<String, SynthError> {
            self.calls += 1;
            Ok(format!("Sentence {}.", self.calls))
        }

        fn paragraph(&mut self, _rng: &mut StdRng) -> Result<String, SynthError> {
            self.calls += 1;
            Ok(format!("Paragraph {}. It goes on.", self.calls))
        }
    }

    /// Names work, everything else fails.
    struct BrokenSynth;

    impl TextSynthesizer for BrokenSynth {
        fn name(&mut self, _rng: &mut StdRng) -> Result<String, SynthError> {
            Ok("Solo".to_string())
        }

        fn sentence(&mut self, _rng: &mut StdRng) -> Result<String, SynthError> {
            Err(SynthError::Grammar(GrammarError::RuleNotFound("sentence".to_string())))
        }

        fn paragraph(&mut self, _rng: &mut StdRng) -> Result<String, SynthError> {
            Err(SynthError::EmptyOutput("paragraph"))
        }
    }

    fn counting(grid: usize, characters: usize, quests: usize) -> ScenarioGenerator {
        ScenarioGenerator::builder()
            .grid_size(grid)
            .num_characters(characters)
            .num_quests(quests)
            .seed(42)
            .with_synthesizer(Box::new(CountingSynth { calls: 0 }))
            .build()
            .unwrap()
    }

    #[test]
    fn default_config_values() {
        let config = ScenarioConfig::default();
        assert_eq!(config.grid_size, 10);
        assert_eq!(config.num_characters, 5);
        assert_eq!(config.num_quests, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn build_rejects_zero_sizes() {
        let err = |b: ScenarioGeneratorBuilder| match b.build() {
            Err(GenerationError::Config(e)) => e,
            _ => panic!("expected a configuration error"),
        };
        assert_eq!(err(ScenarioGenerator::builder().grid_size(0)), ConfigError::ZeroGridSize);
        assert_eq!(
            err(ScenarioGenerator::builder().num_characters(0)),
            ConfigError::ZeroCharacters
        );
        assert_eq!(err(ScenarioGenerator::builder().num_quests(0)), ConfigError::ZeroQuests);
    }

    #[test]
    fn grid_is_square() {
        let mut generator = counting(4, 1, 1);
        let grid = generator.generate_grid();
        assert_eq!(grid.size(), 4);
        assert!(grid.rows.iter().all(|row| row.len() == 4));
    }

    #[test]
    fn characters_use_synthesized_text() {
        let mut generator = counting(5, 3, 1);
        let characters = generator.generate_characters().unwrap();
        assert_eq!(characters.len(), 3);
        assert_eq!(characters[0].name, "Person 1");
        assert_eq!(characters[0].backstory, "Sentence 2.");
        assert!(characters.iter().all(|c| c.location.within(5)));
    }

    #[test]
    fn quests_before_characters_fail() {
        let mut generator = counting(3, 2, 2);
        assert!(matches!(
            generator.generate_quests(),
            Err(GenerationError::NoQuestGivers { requested: 2 })
        ));
        assert!(generator.scenario().quests.is_empty());
    }

    #[test]
    fn quest_givers_resolve() {
        let mut generator = counting(3, 2, 6);
        generator.generate_all().unwrap();
        let scenario = generator.scenario();
        assert_eq!(scenario.quests.len(), 6);
        for quest in &scenario.quests {
            assert!(scenario.has_character(&quest.quest_giver));
            assert!(quest.details.starts_with("Paragraph"));
        }
    }

    #[test]
    fn regenerating_replaces_quests() {
        let mut generator = counting(3, 2, 2);
        generator.generate_all().unwrap();
        generator.generate_quests().unwrap();
        assert_eq!(generator.scenario().quests.len(), 2);
    }

    #[test]
    fn synthesis_failure_leaves_characters_empty() {
        let mut generator = ScenarioGenerator::builder()
            .grid_size(3)
            .num_characters(2)
            .num_quests(1)
            .seed(1)
            .with_synthesizer(Box::new(BrokenSynth))
            .build()
            .unwrap();

        assert!(matches!(
            generator.generate_characters(),
            Err(GenerationError::Synth(_))
        ));
        assert!(generator.scenario().characters.is_empty());
        assert!(generator.generate_all().is_err());
        assert!(generator.scenario().quests.is_empty());
    }

    #[test]
    fn seeded_runs_match() {
        let mut a = counting(6, 4, 4);
        let mut b = counting(6, 4, 4);
        assert_eq!(a.generate_all().unwrap(), b.generate_all().unwrap());
    }
}
