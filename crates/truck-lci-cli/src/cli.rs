//! CLI definition using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use truck_lci_types::OutputFormat;

#[derive(Parser)]
#[command(name = "truck-lci")]
#[command(version)]
#[command(about = "Life-cycle inventories and impacts of trucks")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path. Uses the user config directory if not specified.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Calculate impacts for a vehicle parameter file
    Calculate {
        /// Vehicle parameter CSV (parameter;size;powertrain;year;sample;value)
        #[arg(long, short = 'p')]
        parameters: PathBuf,

        /// Restrict the calculation to these years (repeat or comma-separate)
        #[arg(long, short = 'y', value_delimiter = ',')]
        year: Vec<u16>,

        /// Write results to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Reference data directory (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Grid country (overrides config)
        #[arg(long)]
        country: Option<String>,

        /// Impact method (overrides config)
        #[arg(long)]
        method: Option<String>,

        /// Background scenario (overrides config)
        #[arg(long)]
        scenario: Option<String>,

        /// Functional unit, tkm or vkm (overrides config)
        #[arg(long)]
        functional_unit: Option<String>,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,

        /// Set reference data directory
        #[arg(long)]
        set_data_dir: Option<PathBuf>,

        /// Set grid country
        #[arg(long)]
        set_country: Option<String>,

        /// Set impact method and scenario, e.g. "recipe:SSP2-Base"
        #[arg(long)]
        set_method: Option<String>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,
    },
}
