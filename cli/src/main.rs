use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use throughput_forecast_core_rs::progress::ensemble_progress_message;
use throughput_forecast_core_rs::{
    EnsembleConfig, EnsembleGenerator, ExecutionMode, JsonFileStore, ProgressObserver,
    SimulationInputs, DEFAULT_BATCH_SIZE, DEFAULT_PERCENTILES, DEFAULT_RUN_COUNT,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_ENV: &str = "THROUGHPUT_FORECAST_LOG";

fn print_usage() {
    eprintln!("throughput-forecast <forecast.json> [--store <path>] [--percentiles 90,50,10]");
    eprintln!("  generates an ensemble and prints its summary as JSON");
    eprintln!("throughput-forecast show --store <path> [--percentiles 90,50,10]");
    eprintln!("  prints the summary of a previously stored ensemble");
    eprintln!("log level: {}=debug", LOG_ENV);
}

/// Forecast request read from disk
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastFile {
    milestone: u64,
    simulation_periods: usize,
    historical_data: Vec<u32>,
    #[serde(default = "default_run_count")]
    simulation_run_count: usize,
    #[serde(default = "default_batch_size")]
    simulation_batch_size: usize,
    #[serde(default)]
    rng_seed: Option<u64>,
    #[serde(default)]
    percentiles: Option<Vec<u8>>,
    #[serde(default)]
    parallel: bool,
}

fn default_run_count() -> usize {
    DEFAULT_RUN_COUNT
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

#[derive(Debug, Default)]
struct Options {
    forecast_path: Option<PathBuf>,
    show: bool,
    store_path: Option<PathBuf>,
    percentiles: Option<Vec<u8>>,
}

fn parse_percentiles(value: Option<&String>) -> Result<Vec<u8>, String> {
    let raw = value.ok_or_else(|| "missing percentiles".to_string())?;
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u8>()
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| format!("invalid percentile: {part}"))
        })
        .collect()
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--store" => {
                let path = args
                    .get(index + 1)
                    .ok_or_else(|| "missing store path".to_string())?;
                options.store_path = Some(PathBuf::from(path));
                index += 2;
            }
            "--percentiles" => {
                options.percentiles = Some(parse_percentiles(args.get(index + 1))?);
                index += 2;
            }
            "show" if options.forecast_path.is_none() && !options.show => {
                options.show = true;
                index += 1;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option: {flag}")),
            path if options.forecast_path.is_none() && !options.show => {
                options.forecast_path = Some(PathBuf::from(path));
                index += 1;
            }
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }
    Ok(options)
}

/// Logs the loading message after every batch
struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_batch_complete(&mut self, completed: usize, total: usize) {
        tracing::info!("{}", ensemble_progress_message(completed, total));
    }
}

fn read_forecast_file(path: &PathBuf) -> Result<ForecastFile, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| format!("invalid forecast file {}: {err}", path.display()))
}

fn print_summary(generator: &EnsembleGenerator, percentiles: &[u8]) -> Result<(), String> {
    let view = generator
        .view()
        .ok_or_else(|| "no generated ensemble available".to_string())?;
    let json = serde_json::to_string_pretty(&view.summary(percentiles))
        .map_err(|err| format!("failed to encode summary: {err}"))?;
    println!("{json}");
    Ok(())
}

fn run_forecast(path: &PathBuf, options: &Options) -> Result<(), String> {
    let file = read_forecast_file(path)?;

    let inputs = SimulationInputs::new(file.milestone, file.simulation_periods, file.historical_data);
    inputs.validate().map_err(|err| err.to_string())?;

    let execution = if file.parallel {
        ExecutionMode::Parallel
    } else {
        ExecutionMode::Sequential
    };
    let mut config = EnsembleConfig::new(file.simulation_run_count, file.simulation_batch_size)
        .with_execution(execution);
    config.rng_seed = file.rng_seed;

    let mut generator = EnsembleGenerator::new(config);
    if let Some(store_path) = &options.store_path {
        generator = generator.with_persistence(Box::new(JsonFileStore::new(store_path)));
    }

    generator
        .generate(&inputs, &mut LogProgress)
        .map_err(|err| err.to_string())?;

    let percentiles = options
        .percentiles
        .clone()
        .or(file.percentiles)
        .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec());
    print_summary(&generator, &percentiles)
}

fn run_show(options: &Options) -> Result<(), String> {
    let store_path = options
        .store_path
        .as_ref()
        .ok_or_else(|| "show requires --store <path>".to_string())?;

    let store = JsonFileStore::new(store_path);
    let mut generator = EnsembleGenerator::default();
    let report = generator.load_from(&store).map_err(|err| err.to_string())?;
    for discarded in &report.discarded {
        eprintln!("discarded {}: {}", discarded.key, discarded.reason);
    }

    let percentiles = options
        .percentiles
        .clone()
        .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec());
    print_summary(&generator, &percentiles)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let result = parse_options(&args).and_then(|options| {
        if options.show {
            run_show(&options)
        } else if let Some(path) = &options.forecast_path {
            run_forecast(path, &options)
        } else {
            print_usage();
            Err("missing forecast file".to_string())
        }
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("throughput-forecast")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_forecast_with_flags() {
        let options =
            parse_options(&args(&["in.json", "--store", "out.json", "--percentiles", "90, 50,10"]))
                .unwrap();
        assert_eq!(options.forecast_path, Some(PathBuf::from("in.json")));
        assert_eq!(options.store_path, Some(PathBuf::from("out.json")));
        assert_eq!(options.percentiles, Some(vec![90, 50, 10]));
        assert!(!options.show);
    }

    #[test]
    fn test_parse_show() {
        let options = parse_options(&args(&["show", "--store", "s.json"])).unwrap();
        assert!(options.show);
        assert_eq!(options.forecast_path, None);
    }

    #[test]
    fn test_rejects_bad_percentile() {
        assert!(parse_options(&args(&["in.json", "--percentiles", "90,101"])).is_err());
        assert!(parse_options(&args(&["in.json", "--bogus"])).is_err());
    }

    #[test]
    fn test_forecast_file_defaults() {
        let file: ForecastFile = serde_json::from_str(
            r#"{"milestone": 40, "simulationPeriods": 6, "historicalData": [3, 8, 5]}"#,
        )
        .unwrap();
        assert_eq!(file.simulation_run_count, DEFAULT_RUN_COUNT);
        assert_eq!(file.simulation_batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(file.rng_seed, None);
        assert!(!file.parallel);
    }
}
