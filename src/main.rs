//! Generates one demo scenario and writes it to `board_game_quest.pdf`.

use std::path::Path;
use std::process;

use questboard::{telemetry, DocumentExporter, ScenarioGenerator};
use tracing::info;

const OUTPUT_PATH: &str = "board_game_quest.pdf";

fn main() {
    telemetry::init();

    let mut generator = ScenarioGenerator::builder()
        .grid_size(8)
        .num_characters(6)
        .num_quests(4)
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        });

    info!(config = ?generator.config(), "generating scenario");
    if let Err(e) = generator.generate_all() {
        eprintln!("Error generating scenario: {}", e);
        process::exit(1);
    }

    let exporter = DocumentExporter::default();
    if let Err(e) = exporter.export_pdf(generator.scenario(), Path::new(OUTPUT_PATH)) {
        eprintln!("Error saving quest to '{}': {}", OUTPUT_PATH, e);
        process::exit(1);
    }

    println!("Quest saved to {}", OUTPUT_PATH);
}
