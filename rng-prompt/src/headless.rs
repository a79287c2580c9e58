//! Headless runner for scripted use.
//!
//! Prints rendered outputs to stdout, one per roll, so the composer can be
//! piped into other tools or exercised by automated tests.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rng_core::{sample_catalog, PromptSession, SessionConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Configuration for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Number of whole-pool rerolls to print.
    pub rolls: u32,
    /// Seed for reproducible output; `None` uses the thread RNG.
    pub seed: Option<u64>,
    /// Content API base URL override.
    pub base_url: Option<String>,
    /// Skip the content API entirely.
    pub offline: bool,
    /// Sample without replacement through shuffle bags.
    pub cycled: bool,
    /// File backing the key-value store.
    pub store_path: Option<PathBuf>,
}

/// Parse headless configuration from command line arguments.
pub fn parse_config_from_args(args: &[String]) -> HeadlessConfig {
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    HeadlessConfig {
        rolls: value_of("--rolls")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        seed: value_of("--seed").and_then(|v| v.parse().ok()),
        base_url: value_of("--api"),
        offline: args.iter().any(|a| a == "--offline"),
        cycled: args.iter().any(|a| a == "--cycled"),
        store_path: value_of("--store").map(PathBuf::from),
    }
}

/// Run the composer headlessly and print each rolled output.
pub async fn run_headless(config: HeadlessConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut session_config = SessionConfig::new();
    if let Some(base) = &config.base_url {
        session_config = session_config.with_base_url(base.clone());
    }
    if config.cycled {
        session_config = session_config.with_cycled_sampling();
    }
    if let Some(path) = &config.store_path {
        session_config = session_config.with_store_path(path.clone());
    }

    let mut session = if config.offline {
        PromptSession::with_catalog_and_config(sample_catalog(), session_config)
    } else {
        PromptSession::new(session_config).await
    };

    if session.used_fallback() {
        eprintln!("content API unreachable, using built-in dataset");
    }

    match config.seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..config.rolls {
                session.roll_all_with_rng(&mut rng);
                println!("{}", session.output_text());
            }
        }
        None => {
            for _ in 0..config.rolls {
                session.roll_all();
                println!("{}", session.output_text());
            }
        }
    }

    Ok(())
}
