use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use crate::{config::Config, runner::Simulation, scenario::Scenario};

const MIN_SPEED: f64 = 0.001;
const MAX_SPEED: f64 = 1000.0;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(help = "The scenario file describing the page layout and the scripted events.")]
    pub scenario: PathBuf,

    #[arg(
        short,
        long,
        help = "The path to the config file. The default is `config.toml`."
    )]
    pub config: Option<String>,

    #[arg(
        short,
        long,
        value_parser = parse_speed,
        help = "Replay in real time scaled by this factor. Without it the scenario runs as fast as possible."
    )]
    pub speed: Option<f64>,

    #[arg(short, long, help = "Print the final page state as JSON.")]
    pub report: bool,
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value.parse().map_err(|err| format!("{err}"))?;
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(format!("speed must be between {MIN_SPEED} and {MAX_SPEED}"));
    }
    Ok(speed)
}

pub async fn start() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("CENTER_AUTOPLAY_LOG")
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli_args(&cli)?;
    let scenario = Scenario::read_path(&cli.scenario)?;

    let report = Simulation::new(scenario, config).run(cli.speed).await?;

    if cli.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        match report.page.active {
            Some(id) => log::info!(
                "Finished after {}ms with candidate {id} active ({:?})",
                report.ended_at_ms,
                report.page.audio
            ),
            None => log::info!("Finished after {}ms with no active candidate", report.ended_at_ms),
        }
    }

    Ok(())
}
