// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal CLI that prints the settings of one service.
//!
//!  Usage: `consul-settings <service> [hosting]`
//!  Connection settings come from CONSUL_URL, CONSUL_ENVIRONMENT and friends.
//!  Logging is configured through CONSUL_LOG_* (CONSUL_LOG_STRUCTURED=true,
//!  CONSUL_LOG_FORMAT=json, ...); RUST_LOG_LEVEL overrides CONSUL_LOG_LEVEL.

use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::process::ExitCode;

use consul_settings::logging;
use consul_settings::logging::config::LoggingConfig;
use consul_settings::{ConsulConfig, ConsulOptions, ExternalConfigurationProvider};
use consul_settings::{error_fmt, info_fmt};
use log::LevelFilter;

fn log_level(config: &LoggingConfig) -> LevelFilter {
    env::var("RUST_LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or_else(|| config.level_filter())
}

async fn run(service: &str, hosting: Option<&str>) -> Result<(), Box<dyn Error>> {
    let options = ConsulOptions::from_env()?;
    let config = ConsulConfig::try_from(options)?;
    info_fmt!(
        "Startup",
        "Querying {} in environment '{}'",
        config.connection().address(),
        config.environment()
    );

    let provider = ExternalConfigurationProvider::from_config(&config)?;

    match provider.get_service_config(service, hosting).await? {
        Some(settings) => {
            let ordered: BTreeMap<&String, &String> = settings.iter().collect();
            println!("{}", serde_json::to_string_pretty(&ordered)?);
        }
        None => println!("no settings found"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_config = match LoggingConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_with_config(log_level(&log_config), &log_config);

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(service) = args.first() else {
        eprintln!("usage: consul-settings <service> [hosting]");
        return ExitCode::from(2);
    };
    let hosting = args.get(1).map(String::as_str);

    match run(service, hosting).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error_fmt!("Startup", "Lookup failed: {}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
