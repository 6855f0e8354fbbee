use anyhow::{bail, Context};
use aqnhe::config::{ConfigManager, LoggingConfig};
use aqnhe::data::CsvConnector;
use aqnhe::engines::evaluation::Backtester;
use aqnhe::engines::generation::{
    EvolutionController, JsonLinesSink, LogProgressCallback, PopulationManager,
};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USAGE: &str = "usage: aqnhe <market.csv> [config.toml] [results.jsonl]";

/// Writes log lines to stderr and a log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&logging.level));

    if let Some(path) = &logging.file_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
    }

    builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.len() > 3 {
        bail!(USAGE);
    }
    let data_path = PathBuf::from(&args[0]);
    let config_path = args.get(1).map(PathBuf::from);
    let output_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("results/evolution.jsonl"));

    let mut manager = ConfigManager::new();
    manager
        .load_layered(config_path.as_deref())
        .context("loading configuration")?;
    let config = manager.get();

    init_logging(&config.logging)?;

    let backtester = Backtester::from_config(&config.trading);
    let population = PopulationManager::new(config.evolution.clone())?;

    let (data, _) = CsvConnector::load_market_data(
        &data_path,
        &config.trading.symbol,
        config.trading.timeframe,
        None,
    )
    .with_context(|| format!("loading market data from {}", data_path.display()))?;
    let data = match config.trading.backtest_bars() {
        Some(bars) => data.tail(bars)?,
        None => data,
    };

    let sink = JsonLinesSink::create(&output_path)
        .with_context(|| format!("opening result file {}", output_path.display()))?;

    let mut controller = EvolutionController::new(config, backtester, population, sink)?;
    let result = controller.run(Arc::new(data), &mut LogProgressCallback)?;

    report(&result, &output_path);
    Ok(())
}

fn report(result: &aqnhe::engines::generation::EvolutionResult, output: &Path) {
    let fitness = &result.best_fitness;
    println!(
        "{:?} after {} generations (seed {})",
        result.termination, result.generations_completed, result.seed
    );
    println!(
        "Best genome {} from generation {}: score {:.4}, sharpe {:.3}, drawdown {:.3}, win rate {:.2}, {} trades",
        result.best_genome.id(),
        result.best_generation,
        fitness.composite_score,
        fitness.sharpe_ratio,
        fitness.max_drawdown,
        fitness.win_rate,
        fitness.trade_count
    );
    println!(
        "Parameters: lookback {}, entry threshold {:.3}, position scale {:.3}",
        result.best_parameters.lookback,
        result.best_parameters.entry_threshold,
        result.best_parameters.position_scale
    );
    println!(
        "{} strategies ready for promotion; records written to {}",
        result.promotable().count(),
        output.display()
    );
}
