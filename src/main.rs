// Sun Feb 22 2026 - Alex

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use gamestate_bridge::{
    config::Config,
    driver::{CorrelationDriver, Driver, SharedMemoryDriver, StaticDriver},
    mapper::JsonFileSource,
    memory::Address,
    orchestrator::{ChannelSink, Instance, Notification},
    property::PropertySnapshot,
    scripting::{NoHooks, TransformRegistry},
    utils::{hex_string_spaced, LoggingUtils},
};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Decode live emulator memory into named game properties", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file; defaults are used when absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explicit level (error, warn, info, debug, trace); wins over -v.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Stay faulted after a session reset instead of reconnecting.
    #[arg(long, global = true)]
    no_reconnect: bool,

    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll a running emulator and print every change batch.
    Run {
        #[arg(short, long)]
        mapper: PathBuf,

        #[arg(short, long, value_enum, default_value_t = DriverKind::Auto)]
        driver: DriverKind,

        /// Stop after this many seconds.
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Check whether the shared-memory peer answers.
    Probe,
    /// Decode a mapper once against a raw memory dump.
    Inspect {
        #[arg(short, long)]
        mapper: PathBuf,

        #[arg(short, long)]
        dump: PathBuf,

        /// Address of the first byte of the dump, decimal or 0x-prefixed hex.
        #[arg(long, default_value = "0")]
        base: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    /// Shared memory when the peer answers a ping, otherwise correlation.
    Auto,
    Correlation,
    SharedMemory,
}

fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }
    let level = match &args.log_level {
        Some(level) => LoggingUtils::level_from_str(level),
        None => LoggingUtils::level_from_verbosity(args.verbose),
    };
    LoggingUtils::init(level, !args.no_color);

    if let Err(e) = execute(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn execute(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).map_err(anyhow::Error::msg)?,
        None => Config::default(),
    };
    if args.no_reconnect {
        config = config.with_auto_reconnect(false);
    }

    match args.command {
        Command::Run {
            mapper,
            driver,
            duration,
        } => run(&config, mapper, driver, duration.map(Duration::from_secs)),
        Command::Probe => {
            probe(&config);
            Ok(())
        }
        Command::Inspect { mapper, dump, base } => inspect(&config, mapper, dump, &base),
    }
}

fn select_driver(config: &Config, kind: DriverKind) -> Arc<dyn Driver> {
    let use_shared_memory = match kind {
        DriverKind::SharedMemory => true,
        DriverKind::Correlation => false,
        DriverKind::Auto => SharedMemoryDriver::probe(&config.shared_memory),
    };

    if use_shared_memory {
        println!("{} Using shared-memory driver ({})", "[*]".blue(), config.shared_memory.peer());
        Arc::new(SharedMemoryDriver::new(config.shared_memory.clone()))
    } else {
        println!("{} Using correlation driver ({})", "[*]".blue(), config.correlation.peer());
        Arc::new(CorrelationDriver::new(config.correlation.clone()))
    }
}

fn run(config: &Config, mapper: PathBuf, kind: DriverKind, duration: Option<Duration>) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let instance = Instance::new(
        config.instance.clone(),
        Arc::new(NoHooks),
        Arc::new(TransformRegistry::default()),
        Arc::new(ChannelSink::new(tx)),
    );

    let driver = select_driver(config, kind);
    instance
        .load(driver, Arc::new(JsonFileSource::new(&mapper)))
        .with_context(|| format!("Failed to load {}", mapper.display()))?;

    let started = Instant::now();
    loop {
        if let Some(limit) = duration {
            if started.elapsed() >= limit {
                break;
            }
        }

        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(Notification::MapperLoaded(metadata)) => {
                println!(
                    "{} Loaded {} ({})",
                    "[+]".green(),
                    metadata.game_name.cyan().bold(),
                    metadata.game_platform
                );
            }
            Ok(Notification::PropertiesChanged(batch)) => print_batch(&batch),
            Ok(Notification::SessionReset) => println!("{} Session reset", "[!]".yellow()),
            Ok(Notification::Error(problem)) => println!("{} {}", "[!]".yellow(), problem),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    instance.stop();
    Ok(())
}

fn probe(config: &Config) {
    let peer = config.shared_memory.peer();
    if SharedMemoryDriver::probe(&config.shared_memory) {
        println!("{} Shared-memory peer answered at {}", "[+]".green(), peer);
    } else {
        println!("{} No shared-memory peer at {}", "[-]".red(), peer);
    }
}

fn inspect(config: &Config, mapper: PathBuf, dump: PathBuf, base: &str) -> Result<()> {
    let base = parse_address(base)?;
    let driver = StaticDriver::from_file(&dump, base)
        .with_context(|| format!("Failed to read dump {}", dump.display()))?;

    let instance = Instance::new(
        config.instance.clone(),
        Arc::new(NoHooks),
        Arc::new(TransformRegistry::default()),
        Arc::new(gamestate_bridge::orchestrator::LoggingSink),
    );
    instance
        .load_once(Arc::new(driver), Arc::new(JsonFileSource::new(&mapper)))
        .with_context(|| format!("Failed to load {}", mapper.display()))?;
    instance.run_cycle()?;

    if let Some(metadata) = instance.metadata() {
        println!("{}", metadata.game_name.cyan().bold());
        println!("{}", "=".repeat(50).cyan());
    }
    for snapshot in instance.properties() {
        print_property(&snapshot);
    }
    Ok(())
}

fn parse_address(text: &str) -> Result<Address> {
    let text = text.trim();
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    match value {
        Ok(v) => Ok(Address::new(v)),
        Err(e) => bail!("Invalid address '{}': {}", text, e),
    }
}

fn print_batch(batch: &[PropertySnapshot]) {
    println!("{}", "-".repeat(40).cyan());
    for snapshot in batch {
        print_property(snapshot);
    }
}

fn print_property(snapshot: &PropertySnapshot) {
    let address = snapshot
        .address
        .map(|a| format!("{}", a))
        .unwrap_or_else(|| "-".to_string());
    let bytes = snapshot
        .bytes
        .as_deref()
        .map(hex_string_spaced)
        .unwrap_or_default();
    let frozen = if snapshot.frozen { " [frozen]".blue().to_string() } else { String::new() };

    println!(
        "  {} {} = {} {}{}",
        snapshot.path.cyan(),
        address.dimmed(),
        snapshot.value.to_string().green(),
        bytes.dimmed(),
        frozen
    );
}
