/// Preview — generate a scenario and print it to stdout instead of a PDF.
///
/// Usage: preview [--seed <n>] [--grid <n>] [--characters <n>] [--quests <n>] [--ron]

use questboard::core::export::DocumentExporter;
use questboard::core::render::TranscriptRenderer;
use questboard::{telemetry, ScenarioConfig, ScenarioGenerator};
use std::process;

const USAGE: &str =
    "Usage: preview [--seed <n>] [--grid <n>] [--characters <n>] [--quests <n>] [--ron]";

/// What the command line asked for.
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Preview {
        config: ScenarioConfig,
        seed: Option<u64>,
        as_ron: bool,
    },
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut config = ScenarioConfig::default();
    let mut seed: Option<u64> = None;
    let mut as_ron = false;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            flag @ ("--seed" | "--grid" | "--characters" | "--quests") => {
                let value = rest
                    .next()
                    .ok_or_else(|| format!("{} expects a value", flag))?;
                match flag {
                    "--seed" => seed = Some(parse_number(value, flag)?),
                    "--grid" => config.grid_size = parse_number(value, flag)?,
                    "--characters" => config.num_characters = parse_number(value, flag)?,
                    _ => config.num_quests = parse_number(value, flag)?,
                }
            }
            "--ron" => as_ron = true,
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(Command::Preview {
        config,
        seed,
        as_ron,
    })
}

fn main() {
    telemetry::init();

    let args: Vec<String> = std::env::args().collect();
    let (config, seed, as_ron) = match parse_args(&args) {
        Ok(Command::Preview {
            config,
            seed,
            as_ron,
        }) => (config, seed, as_ron),
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    let mut builder = ScenarioGenerator::builder().config(config);
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    let mut generator = builder.build().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let scenario = generator.generate_all().unwrap_or_else(|e| {
        eprintln!("Error generating scenario: {}", e);
        process::exit(1);
    });

    if as_ron {
        match scenario.to_ron() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing scenario: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let mut transcript = TranscriptRenderer::new();
    DocumentExporter::default().render(scenario, &mut transcript);
    print!("{}", transcript.to_text());
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a non-negative integer, got '{}'", flag, value))
}
