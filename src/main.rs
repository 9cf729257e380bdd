//! SteadyState DAQ CLI
//!
//! Polls thermocouple and voltage boards, flags steady channels and logs
//! every cycle.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use steadystate_daq::{
    config::Config,
    output::{create_run_log, LogFormat, RecordSink, TerminalPresenter},
    runlog::{load_persisted, RunLog},
    source::{self, SampleSource},
    Acquisition, AcquisitionError, RpmSampler, VERSION,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File in the data directory holding cumulative run counters.
const COUNTERS_FILE: &str = "run_counters.json";

/// Longest single sleep between cycles, so Ctrl+C is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "steadystate")]
#[command(version = VERSION)]
#[command(about = "Steady-state detection and RPM logging for DAQ boards", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start polling and logging
    Run {
        /// Use the built-in simulated boards instead of hardware
        #[arg(long)]
        simulate: bool,

        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Log format (csv or jsonl)
        #[arg(long, default_value = "csv")]
        format: LogFormat,

        /// Directory for the run log (overrides the configured log_dir)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Don't print the live channel view
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show cumulative run statistics and recent logs
    Status,

    /// Show configuration
    Config,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::config_path);

    match cli.command {
        Commands::Run {
            simulate,
            cycles,
            format,
            output,
            quiet,
        } => cmd_run(&config_path, simulate, cycles, format, output, quiet),
        Commands::Status => cmd_status(&config_path),
        Commands::Config => cmd_config(&config_path),
        Commands::Init { force } => cmd_init(&config_path, force),
    }
}

fn cmd_run(
    config_path: &Path,
    simulate: bool,
    max_cycles: Option<u64>,
    format: LogFormat,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let config = Config::load_from(config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    if let Err(e) = config.ensure_directories() {
        tracing::warn!(error = %e, "could not create data directories");
    }

    println!("SteadyState DAQ v{VERSION}");
    println!();

    let mut source = source::open_source(&config, simulate)?;
    let acquisition = Acquisition::new(&config);
    acquisition
        .setup(source.as_mut())
        .context("setting up acquisition boards")?;

    println!("  Channels: {}", acquisition.slots().len());
    println!("  Classified: {}", acquisition.classifiers().len());
    println!(
        "  Window: {} readings, threshold {}",
        config.classifier.window_size, config.classifier.deviation_threshold
    );
    println!("  Poll interval: {} ms", config.poll_interval.as_millis());

    // The sampler gets its own source so it never contends with polling.
    let sampler = if config.rpm.enabled {
        let tach = source::open_source(&config, simulate)?;
        let sampler = RpmSampler::spawn(tach, config.rpm.channel_id(), config.rpm.sample_interval)
            .context("starting RPM sampler")?;
        println!(
            "  RPM: channel {}, {} samples every {} ms",
            config.rpm.channel_id(),
            config.rpm.sample_count,
            config.rpm.sample_interval.as_millis()
        );
        Some(sampler)
    } else {
        println!("  RPM: disabled");
        None
    };

    let header = acquisition.header();
    let log_dir = output.unwrap_or_else(|| config.log_dir.clone());
    let (log_path, sink) = create_run_log(&log_dir, format, &header)
        .with_context(|| format!("creating run log in {}", log_dir.display()))?;
    println!("  Run ID: {}", header.run_id);
    println!("  Logging to {}", log_path.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let run_log = RunLog::with_persistence(config.data_dir.join(COUNTERS_FILE));

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut run = Run {
        acquisition,
        source,
        sampler,
        sink,
        run_log,
        presenter: (!quiet).then(TerminalPresenter::new),
    };
    let outcome = run.poll_until_stopped(config.poll_interval, max_cycles, &running);

    println!();
    println!("Stopping acquisition...");
    let run_log = run.finish();

    if let Err(e) = run_log.save() {
        tracing::warn!(error = %e, "could not save run counters");
    }
    println!();
    println!("{}", run_log.summary());
    println!("Run log: {}", log_path.display());

    outcome.context("acquisition stopped")
}

/// Everything a run owns between setup and shutdown.
struct Run {
    acquisition: Acquisition,
    source: Box<dyn SampleSource>,
    sampler: Option<RpmSampler>,
    sink: Box<dyn RecordSink>,
    run_log: RunLog,
    presenter: Option<TerminalPresenter>,
}

impl Run {
    fn poll_until_stopped(
        &mut self,
        interval: Duration,
        max_cycles: Option<u64>,
        running: &AtomicBool,
    ) -> Result<(), AcquisitionError> {
        let mut next_cycle = Instant::now();
        let mut completed = 0u64;

        while running.load(Ordering::SeqCst) {
            if max_cycles.is_some_and(|max| completed >= max) {
                break;
            }

            self.cycle()?;
            completed += 1;

            next_cycle += interval;
            loop {
                let now = Instant::now();
                if next_cycle <= now || !running.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep((next_cycle - now).min(SLEEP_SLICE));
            }
            if next_cycle < Instant::now() {
                next_cycle = Instant::now();
            }
        }

        tracing::info!(cycles = completed, "polling stopped");
        Ok(())
    }

    fn cycle(&mut self) -> Result<(), AcquisitionError> {
        if let Some(sampler) = &self.sampler {
            let acquisition = &mut self.acquisition;
            let drained = sampler.drain(|v| acquisition.ingest_rpm_sample(v))?;
            self.run_log.record_rpm_samples(drained as u64);
        }

        let record = self.acquisition.poll(self.source.as_mut())?;
        self.sink.write_record(&record)?;
        self.run_log.record_cycle(&record);

        if let Some(presenter) = &self.presenter {
            let mut stdout = std::io::stdout().lock();
            presenter.present(&record, &mut stdout)?;
            stdout.flush()?;
        } else {
            tracing::debug!(
                sequence = record.sequence,
                steady = record.steady_count(),
                faults = record.fault_count(),
                "cycle logged"
            );
        }
        Ok(())
    }

    /// Stop the sampler and flush the log, returning the counters.
    fn finish(mut self) -> RunLog {
        if let Some(sampler) = self.sampler.take() {
            sampler.stop();
        }
        if let Err(e) = self.sink.flush() {
            tracing::warn!(error = %e, "could not flush run log");
        }
        self.run_log
    }
}

fn cmd_status(config_path: &Path) -> Result<()> {
    let config = Config::load_from(config_path).unwrap_or_default();

    println!("SteadyState DAQ Status");
    println!("======================");
    println!();
    println!("Configuration:");
    println!("  Config file: {}", config_path.display());
    println!(
        "  Thermocouple channels: {} ({:?}, {:?})",
        config.thermo_channels().len(),
        config.thermo.thermocouple_type,
        config.thermo.unit
    );
    println!("  Voltage channels: {}", config.voltage_channels().len());
    println!(
        "  RPM: {}",
        if config.rpm.enabled {
            format!("channel {}", config.rpm.channel_id())
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Pressure: {}",
        match &config.pressure {
            Some(p) => format!("channel {}", p.channel_id()),
            None => "disabled".to_string(),
        }
    );
    println!();

    let counters_path = config.data_dir.join(COUNTERS_FILE);
    match load_persisted(&counters_path) {
        Ok(counters) => {
            println!("Cumulative Statistics:");
            println!("  Cycles completed: {}", counters.cycles_completed);
            println!("  Readings logged: {}", counters.readings_logged);
            let faults = counters.open_circuit_faults
                + counters.over_range_faults
                + counters.common_mode_faults;
            let faults_text = format!("{faults}");
            println!(
                "  Sensor faults: {}",
                if faults > 0 {
                    faults_text.yellow()
                } else {
                    faults_text.normal()
                }
            );
            println!("  Tachometer samples: {}", counters.rpm_samples);
            println!("  Last updated: {}", counters.last_updated.format("%Y-%m-%d %H:%M:%S"));
        }
        Err(_) => println!("No previous run data found."),
    }
    println!();

    let mut logs: Vec<PathBuf> = std::fs::read_dir(&config.log_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("run_"))
                })
                .collect()
        })
        .unwrap_or_default();
    logs.sort();

    if logs.is_empty() {
        println!("No run logs in {}", config.log_dir.display());
    } else {
        println!("Recent run logs ({} total):", logs.len());
        for path in logs.iter().rev().take(5) {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

fn cmd_config(config_path: &Path) -> Result<()> {
    let config = Config::load_from(config_path)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", config_path.display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = Config::default();
    config.save_to(config_path)?;
    config.ensure_directories()?;
    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
