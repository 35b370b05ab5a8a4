//! Exoplanet disposition prediction CLI
//!
//! Prints exactly one JSON value per result on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use exoplanet::predict::Outcome;
use exoplanet::{Config, Result};

#[derive(Parser)]
#[command(name = "exoplanet")]
#[command(about = "Predict exoplanet dispositions from raw measurements", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "exoplanet.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the artifact directory
    #[arg(long, global = true)]
    artifacts: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the disposition for one JSON record
    Predict {
        /// JSON object, e.g. '{"orb_period": 10, "planet_radius": 2}'
        input: String,
        /// Include per-label probabilities
        #[arg(long)]
        probabilities: bool,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
        /// Exit with status 1 when the output is an error object
        #[arg(long)]
        fail_on_error: bool,
    },
    /// Print the derived feature vector for one JSON record
    Features {
        /// JSON object with raw measurements
        input: String,
    },
    /// Predict one JSON record per stdin line, loading artifacts once
    Batch {
        /// Include per-label probabilities
        #[arg(long)]
        probabilities: bool,
    },
    /// Print the canonical feature column order
    Columns,
    /// Show information about the loaded artifacts
    Info,
    /// Write a default config file
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", Outcome::failure(&e).to_json(false));
                std::process::exit(config_error_exit_code(&cli.command));
            }
        }
    } else {
        Config::default()
    };
    if let Some(dir) = cli.artifacts {
        config.artifacts.dir = dir;
    }

    let result = match cli.command {
        Commands::Predict {
            input,
            probabilities,
            pretty,
            fail_on_error,
        } => commands::predict(&config, &input, probabilities, pretty, fail_on_error),
        Commands::Features { input } => commands::features(&input),
        Commands::Batch { probabilities } => commands::batch(&config, probabilities),
        Commands::Columns => commands::columns(),
        Commands::Info => commands::info(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Exit status after printing a config error object
///
/// `predict` keeps its usual policy: status 0 unless `--fail-on-error` is set.
/// Every other command fails with status 1.
fn config_error_exit_code(command: &Commands) -> i32 {
    match command {
        Commands::Predict { fail_on_error, .. } => i32::from(*fail_on_error),
        _ => 1,
    }
}

mod commands {
    use super::*;
    use exoplanet::features::{derive, RawRecord, FEATURE_COLUMNS};
    use exoplanet::predict::{run_batch, run_once, Predictor};
    use exoplanet::ExoplanetError;

    fn json_error(e: impl std::fmt::Display) -> ExoplanetError {
        ExoplanetError::Io(std::io::Error::other(format!("Failed to serialize output: {}", e)))
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);
        println!(
            "Place {}.mpk, {}.json and {} under {}/",
            config.artifacts.model_name,
            config.artifacts.model_name,
            config.artifacts.encoder_file,
            config.artifacts.dir
        );
        Ok(())
    }

    pub fn predict(
        config: &Config,
        input: &str,
        probabilities: bool,
        pretty: bool,
        fail_on_error: bool,
    ) -> Result<()> {
        let mut config = config.clone();
        config.output.include_probabilities |= probabilities;

        let outcome = match RawRecord::from_json_str(input) {
            Ok(raw) => run_once(&raw, &config),
            Err(e) => Outcome::failure(&e),
        };

        println!("{}", outcome.to_json(pretty || config.output.pretty));

        if fail_on_error && outcome.is_error() {
            std::process::exit(1);
        }
        Ok(())
    }

    pub fn features(input: &str) -> Result<()> {
        let raw = RawRecord::from_json_str(input)?;
        let features = derive(&raw);
        println!(
            "{}",
            serde_json::to_string_pretty(&features).map_err(json_error)?
        );
        Ok(())
    }

    pub fn batch(config: &Config, probabilities: bool) -> Result<()> {
        let mut config = config.clone();
        config.output.include_probabilities |= probabilities;

        let predictor = Predictor::load(&config);
        if let Err(e) = &predictor {
            log::warn!("{}", e);
        }

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let count = run_batch(&predictor, stdin.lock(), stdout.lock())?;

        log::debug!("Processed {} records", count);
        Ok(())
    }

    pub fn columns() -> Result<()> {
        println!(
            "{}",
            serde_json::to_string(&FEATURE_COLUMNS).map_err(json_error)?
        );
        Ok(())
    }

    pub fn info(config: &Config) -> Result<()> {
        let predictor = Predictor::load(config)?;
        let artifacts = predictor.artifacts();

        let json = serde_json::json!({
            "model": config.artifacts.model_path().display().to_string(),
            "encoder": config.artifacts.encoder_path().display().to_string(),
            "n_classes": artifacts.classifier().n_classes(),
            "hidden_dims": artifacts.metadata().map(|m| m.config.hidden_dims.clone()),
            "classes": artifacts.codec().classes(),
            "feature_columns": FEATURE_COLUMNS,
        });
        println!("{}", serde_json::to_string_pretty(&json).map_err(json_error)?);
        Ok(())
    }
}
