use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{error, info};
use pitwall::{
    FileLapProvider, LapProvider, LapQuery, LapSelector, PitwallError, SessionKey, SessionType,
    analysis::{assemble, compute_kpis},
    config::AppConfig,
    writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Directory holding stored session files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct SessionArgs {
    #[arg(short, long)]
    year: Option<u16>,

    #[arg(short, long)]
    event: Option<String>,

    #[arg(short, long)]
    session: Option<SessionType>,
}

impl SessionArgs {
    fn session_key(&self, config: &AppConfig) -> SessionKey {
        SessionKey::new(
            self.year.unwrap_or(config.default_year),
            self.event.clone().unwrap_or_else(|| config.default_event.clone()),
            self.session.unwrap_or(config.default_session),
        )
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two laps on a shared distance axis
    Compare {
        #[command(flatten)]
        session: SessionArgs,

        #[arg(long)]
        driver_a: String,

        /// 0 or "fastest" for the fastest lap, otherwise the lap number
        #[arg(long, default_value_t = LapSelector::Fastest)]
        lap_a: LapSelector,

        #[arg(long)]
        driver_b: String,

        #[arg(long, default_value_t = LapSelector::Fastest)]
        lap_b: LapSelector,

        /// Session of lap B when it differs from lap A's
        #[arg(long)]
        session_b: Option<SessionType>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the aligned telemetry as JSON lines
        #[arg(long)]
        aligned_output: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
    /// Summary KPIs of a single lap
    Kpis {
        #[command(flatten)]
        session: SessionArgs,

        #[arg(short, long)]
        driver: String,

        #[arg(short, long, default_value_t = LapSelector::Fastest)]
        lap: LapSelector,
    },
    /// Seasons with stored sessions
    Years,
    /// Events stored for a season
    Events {
        #[arg(short, long)]
        year: Option<u16>,
    },
    /// Sessions stored for an event
    Sessions {
        #[arg(short, long)]
        year: Option<u16>,

        #[arg(short, long)]
        event: Option<String>,
    },
    /// Drivers that set a lap in a session
    Drivers {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Lap numbers of a driver in a session
    Laps {
        #[command(flatten)]
        session: SessionArgs,

        #[arg(short, long)]
        driver: String,
    },
    /// Show or initialize the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Init,
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), PitwallError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| PitwallError::ExportSerializeError { source: e })?;
    println!("{json}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn compare(
    provider: &impl LapProvider,
    config: &AppConfig,
    session: SessionKey,
    driver_a: &str,
    lap_a: LapSelector,
    driver_b: &str,
    lap_b: LapSelector,
    session_b: Option<SessionType>,
    output: Option<&Path>,
    aligned_output: Option<&Path>,
    pretty: bool,
) -> Result<(), PitwallError> {
    let query_b = LapQuery {
        session: SessionKey {
            session_type: session_b.unwrap_or(session.session_type),
            ..session.clone()
        },
        driver: driver_b.to_string(),
        lap: lap_b,
    };
    let query_a = LapQuery {
        session,
        driver: driver_a.to_string(),
        lap: lap_a,
    };

    let first = provider.lap(&query_a)?;
    let second = provider.lap(&query_b)?;
    let result = assemble(&first, &second)?;
    info!("Compared {} with {}", query_a, query_b);

    let pretty = pretty || config.pretty_output;
    match output {
        Some(path) => {
            writer::write_comparison(path, &result, pretty)?;
            info!("Comparison written to {:?}", path);
        }
        None => println!("{}", writer::comparison_to_string(&result, pretty)?),
    }
    if let Some(path) = aligned_output {
        writer::write_aligned_jsonl(path, &result)?;
        info!("Aligned telemetry written to {:?}", path);
    }
    Ok(())
}

fn config_command(action: &ConfigAction, config: &AppConfig) -> Result<(), PitwallError> {
    match action {
        ConfigAction::Show => print_json(config, true),
        ConfigAction::Init => {
            let path = AppConfig::default_path()?;
            if path.exists() {
                return Err(PitwallError::InvalidUserInput {
                    field: "config".to_string(),
                    reason: format!("{path:?} already exists"),
                });
            }
            config.save_to(&path)?;
            info!("Config written to {:?}", path);
            Ok(())
        }
    }
}

fn run(cli: &Args) -> Result<(), PitwallError> {
    let config = AppConfig::from_local_file()?.unwrap_or_default();
    let provider = FileLapProvider::new(config.session_root(cli.data_dir.as_deref())?);
    let pretty = config.pretty_output;

    match &cli.command {
        Commands::Compare {
            session,
            driver_a,
            lap_a,
            driver_b,
            lap_b,
            session_b,
            output,
            aligned_output,
            pretty,
        } => compare(
            &provider,
            &config,
            session.session_key(&config),
            driver_a,
            *lap_a,
            driver_b,
            *lap_b,
            *session_b,
            output.as_deref(),
            aligned_output.as_deref(),
            *pretty,
        ),
        Commands::Kpis {
            session,
            driver,
            lap,
        } => {
            let lap = provider.lap(&LapQuery {
                session: session.session_key(&config),
                driver: driver.clone(),
                lap: *lap,
            })?;
            print_json(&compute_kpis(&lap)?, pretty)
        }
        Commands::Years => print_json(&provider.years()?, pretty),
        Commands::Events { year } => {
            print_json(&provider.events(year.unwrap_or(config.default_year))?, pretty)
        }
        Commands::Sessions { year, event } => print_json(
            &provider.sessions(
                year.unwrap_or(config.default_year),
                event.as_deref().unwrap_or(&config.default_event),
            )?,
            pretty,
        ),
        Commands::Drivers { session } => {
            print_json(&provider.drivers(&session.session_key(&config))?, pretty)
        }
        Commands::Laps { session, driver } => print_json(
            &provider.lap_numbers(&session.session_key(&config), driver)?,
            pretty,
        ),
        Commands::Config { action } => config_command(action, &config),
    }
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();
    #[cfg(not(debug_assertions))]
    colog::default_builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Args::parse();
    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
