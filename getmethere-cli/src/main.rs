//! GetMeThere CLI - Command-line interface
//!
//! Exposes the geodesy, projection and compass pieces of the library for
//! scripting and manual checks: parse geo URIs, run WGS84 transforms, place
//! points on a static map and feed one sensor snapshot through the compass.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use getmethere::config::ConfigFile;
use tracing_subscriber::EnvFilter;

use commands::compass::CompassArgs;
use commands::config::ConfigCommands;
use commands::geodesy::{ArArgs, EcefArgs, EnuArgs};
use commands::locate::{BearingArgs, ParseArgs};
use commands::map::{ProjectArgs, RadiusArgs};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "getmethere")]
#[command(version, about = "Orientation and geodesy toolkit", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a geo: URI
    Parse(ParseArgs),

    /// Initial great-circle bearing and distance between two points
    Bearing(BearingArgs),

    /// Convert a geodetic point to ECEF
    Ecef(EcefArgs),

    /// Local East-North-Up vector from observer to target
    Enu(EnuArgs),

    /// Place a target on a camera viewport from a rotation vector
    Ar(ArArgs),

    /// Place points on a static map raster
    Project(ProjectArgs),

    /// Convert a ground radius around the map center to pixels
    Radius(RadiusArgs),

    /// Feed one sensor snapshot through the compass engine
    Compass(CompassArgs),

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let json = cli.json;

    match cli.command {
        Commands::Parse(args) => commands::locate::run_parse(args, json),
        Commands::Bearing(args) => commands::locate::run_bearing(args, json),
        Commands::Ecef(args) => commands::geodesy::run_ecef(args, json),
        Commands::Enu(args) => commands::geodesy::run_enu(args, json),
        Commands::Ar(args) => commands::geodesy::run_ar(args, json),
        Commands::Project(args) => {
            let config = ConfigFile::load()?;
            commands::map::run_project(args, &config, json)
        }
        Commands::Radius(args) => {
            let config = ConfigFile::load()?;
            commands::map::run_radius(args, &config, json)
        }
        Commands::Compass(args) => {
            let config = ConfigFile::load()?;
            commands::compass::run(args, &config, json)
        }
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
