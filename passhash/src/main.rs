//! `passhash` command line: hashes, verifies and grades bcrypt records using
//! the cost from `passhash.json` or `PASSHASH_COST` unless one is given.

use std::env;

use passhash::config::{load_config, ConfigError, HasherConfig};
use passhash::{HashService, Verification};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Commands:\n  make <plaintext> [cost]\n  check <plaintext> <hash>\n  weak <hash> [cost]\n  upgrade <plaintext> <hash> [cost]\n  show-config");
}

fn init_logging(config: &HasherConfig) {
    let fallback = config.debug_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Explicit cost argument if present, otherwise the configured default.
fn cost_arg(arg: Option<&String>, service: &HashService) -> Result<u32, String> {
    match arg {
        Some(raw) => raw.parse().map_err(|_| format!("cost must be a number, got {raw:?}")),
        None => Ok(service.default_cost()),
    }
}

/// Builds the service from the loaded configuration. A broken configuration
/// stops the run; it never falls back to the default cost.
fn setup(loaded: Result<HasherConfig, ConfigError>) -> Result<(HasherConfig, HashService), String> {
    let config = loaded.map_err(|err| format!("config load failed: {err}"))?;
    let service =
        HashService::from_config(&config).map_err(|err| format!("service setup failed: {err}"))?;
    Ok((config, service))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let (config, service) = match setup(load_config()) {
        Ok(ready) => ready,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(1);
        }
    };
    init_logging(&config);

    match args[1].as_str() {
        "make" => {
            if !(3..=4).contains(&args.len()) {
                return print_usage();
            }
            let cost = match cost_arg(args.get(3), &service) {
                Ok(cost) => cost,
                Err(msg) => return eprintln!("{msg}"),
            };
            match service.make(args[2].as_str(), cost) {
                Ok(record) => println!("{record}"),
                Err(err) => eprintln!("hashing failed: {err}"),
            }
        }
        "check" => {
            if args.len() != 4 {
                return print_usage();
            }
            match service.check(args[2].as_str(), &args[3]) {
                Ok(matches) => println!("{}", if matches { "match" } else { "no-match" }),
                Err(err) => eprintln!("verification failed: {err}"),
            }
        }
        "weak" => {
            if !(3..=4).contains(&args.len()) {
                return print_usage();
            }
            let cost = match cost_arg(args.get(3), &service) {
                Ok(cost) => cost,
                Err(msg) => return eprintln!("{msg}"),
            };
            match service.weak(&args[2], cost) {
                Ok(weak) => println!("{}", if weak { "weak" } else { "current" }),
                Err(err) => eprintln!("grading failed: {err}"),
            }
        }
        "upgrade" => {
            if !(4..=5).contains(&args.len()) {
                return print_usage();
            }
            let cost = match cost_arg(args.get(4), &service) {
                Ok(cost) => cost,
                Err(msg) => return eprintln!("{msg}"),
            };
            match service.verify_and_upgrade(args[2].as_str(), &args[3], cost) {
                Ok(Verification::Mismatch) => println!("no-match"),
                Ok(Verification::Match) => println!("match"),
                Ok(Verification::Rehashed(record)) => println!("{record}"),
                Err(err) => eprintln!("upgrade failed: {err}"),
            }
        }
        "show-config" => match serde_json::to_string_pretty(&config) {
            Ok(printable) => println!("{printable}"),
            Err(err) => {
                warn!("config serialization failed");
                eprintln!("config serialization failed: {err}");
            }
        },
        _ => print_usage(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_stop_setup() {
        let loaded = Err(ConfigError::Env {
            var: passhash::config::COST_ENV,
            value: "1 4".to_string(),
        });
        let msg = setup(loaded).err().expect("setup must fail");
        assert!(msg.starts_with("config load failed"));
        assert!(msg.contains("PASSHASH_COST"));
    }

    #[test]
    fn setup_uses_configured_cost() {
        let config = HasherConfig {
            cost: 12,
            debug_level: None,
        };
        let (_, service) = setup(Ok(config)).expect("valid config");
        assert_eq!(service.default_cost(), 12);
    }

    #[test]
    fn explicit_cost_argument_wins() {
        let service = HashService::new();
        assert_eq!(cost_arg(Some(&"7".to_string()), &service), Ok(7));
        assert_eq!(cost_arg(None, &service), Ok(10));
        assert!(cost_arg(Some(&"seven".to_string()), &service).is_err());
    }
}
