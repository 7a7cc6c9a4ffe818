//! Questboard — procedural fantasy board-game scenarios.
//!
//! Generates a terrain grid, a roster of characters and a set of quests
//! that reference them, then lays the result out as a paginated PDF.
//! Names, backstories and quest details come from a small stochastic
//! grammar backed by Markov-trained phrase generation.

pub mod core;
pub mod schema;
pub mod telemetry;

pub use crate::core::export::{DocumentExporter, ExportError, ExportReport};
pub use crate::core::generator::{
    ConfigError, GenerationError, ScenarioConfig, ScenarioGenerator,
};
pub use crate::core::synth::{LoreSynthesizer, SynthError, TextSynthesizer};
pub use crate::schema::scenario::Scenario;
