use crate::config::settings::Config;
use log::error;
use std::env;

pub const REQUIRED_ENV_VARS: &[&str] = &["REDIS_URL", "ACCOUNTS"];

pub fn check_and_print_env_vars() {
    let mut missing = Vec::new();

    for &key in REQUIRED_ENV_VARS {
        if env::var(key).is_err() {
            error!("ERROR: {key} is not set!");
            missing.push(key);
        }
    }

    if !missing.is_empty() {
        error!("Missing required environment variables: {:?}", missing);
        std::process::exit(1);
    }
}

pub fn load_config() -> Config {
    // First check that all required variables are set
    check_and_print_env_vars();

    // Then load the full configuration
    Config::from_env()
}
