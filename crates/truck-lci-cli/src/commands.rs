//! Command handlers

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use truck_lci_app::app::{self, CalculationOptions, Progress, ProgressCallback};
use truck_lci_app::config::Config;
use truck_lci_app::repository::{load_parameters, open_reference_repo};
use truck_lci_types::{FunctionalUnit, OutputFormat, Result};

use crate::cli::{Cli, Commands};
use crate::output::write_output;

pub fn execute(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::config_path()?,
    };

    match &cli.command {
        Commands::Calculate {
            parameters,
            year,
            output,
            data_dir,
            country,
            method,
            scenario,
            functional_unit,
            quiet,
        } => {
            let mut config = Config::load_from(&config_path)?;

            // Override from CLI args
            if let Some(dir) = data_dir {
                config.data_dir = Some(dir.clone());
            }
            if let Some(country) = country {
                config.country = country.clone();
            }
            if let Some(method) = method {
                config.method = method.clone();
            }
            if let Some(scenario) = scenario {
                config.scenario = scenario.clone();
            }
            if let Some(unit) = functional_unit {
                config.functional_unit = unit.parse::<FunctionalUnit>()?;
            }

            let output_format = cli.format.unwrap_or(config.output_format);
            cmd_calculate(
                &config,
                parameters,
                year,
                output.as_deref(),
                output_format,
                *quiet,
            )
        }

        Commands::Config {
            show,
            init,
            set_data_dir,
            set_country,
            set_method,
            set_output,
        } => cmd_config(
            &config_path,
            *show,
            *init,
            set_data_dir.clone(),
            set_country.clone(),
            set_method.clone(),
            *set_output,
        ),
    }
}

fn progress_bar(samples: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(samples as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn cmd_calculate(
    config: &Config,
    parameters: &Path,
    years: &[u16],
    output_path: Option<&Path>,
    output_format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let repo = open_reference_repo(config)?;
    let params = load_parameters(config, parameters.to_path_buf(), years)?;
    let options = CalculationOptions::from_config(config)?;
    info!(
        parameters = %parameters.display(),
        method = %options.method,
        scenario = %options.scenario,
        country = %options.country,
        "starting calculation"
    );

    let pb = progress_bar(params.samples(), quiet);
    let bar = pb.clone();
    let progress: ProgressCallback = Box::new(move |p: Progress| match p {
        Progress::Phase(phase) => bar.set_message(phase),
        Progress::Sample { done, total } => {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }
    });

    let result = app::calculate(&repo, &params, &options, Some(progress));
    pb.finish_and_clear();
    let output = result?;

    if !output.unclaimed.is_empty() {
        eprintln!(
            "Warning: {} first-tier activities have no result category and were not counted",
            output.unclaimed.len()
        );
    }

    match output_path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_output(&mut writer, output_format, &output)?;
            writer.flush()?;
            eprintln!("Results written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_output(&mut lock, output_format, &output)?;
        }
    }

    Ok(())
}

fn cmd_config(
    config_path: &Path,
    show: bool,
    init: bool,
    set_data_dir: Option<PathBuf>,
    set_country: Option<String>,
    set_method: Option<String>,
    set_output: Option<OutputFormat>,
) -> Result<()> {
    if init {
        if config_path.exists() {
            println!("Configuration already exists at {}", config_path.display());
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            println!("Configuration written to {}", config_path.display());
            println!("\n{}", config);
        }
        return Ok(());
    }

    let mut config = Config::load_from(config_path)?;
    let mut modified = false;

    if let Some(dir) = set_data_dir {
        config.data_dir = Some(dir);
        modified = true;
    }

    if let Some(country) = set_country {
        config.country = country;
        modified = true;
    }

    if let Some(method) = set_method {
        match method.split_once(':') {
            Some((method, scenario)) => {
                config.method = method.trim().to_string();
                config.scenario = scenario.trim().to_string();
            }
            None => config.method = method.trim().to_string(),
        }
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if modified {
        config.validate()?;
        config.save_to(config_path)?;
        println!("Configuration saved");
    }

    if show || !modified {
        println!("\n{}", config);
    }

    Ok(())
}
