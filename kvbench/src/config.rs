//! Configuration for the benchmark.
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `KVBENCH__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! The number of operations and clients always come from the command line and are combined with
//! the loaded [`Config`] into a [`RunConfig`].
//!
//! # Environment Variables
//!
//! Environment variables use double underscores (`__`) to denote nested structures:
//!
//! - `KVBENCH__REMOTE=10.0.0.1:6000` sets the service address
//! - `KVBENCH__WAIT_FOR=all` waits for every client before exiting
//! - `KVBENCH__KEYS__TYPE=uniform` draws keys from a seeded RNG
//!
//! # YAML Configuration File
//!
//! ```yaml
//! remote: 10.0.0.1:6000
//! window: 2s
//! wait_for: all
//! max_duration: 5m
//! keys:
//!   type: uniform
//!   seed: 1212
//!   key_space: 10000
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::{Error, Result};
use crate::window::{DEFAULT_WINDOW, HUNDREDTH_OF_SECOND};
use crate::workload::KeyDistribution;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "KVBENCH__";

/// When the benchmark is considered finished.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaitFor {
    /// Exit as soon as the client on the main task has finished.
    ///
    /// Clients on spawned tasks are abandoned, and their failures are never surfaced.
    #[default]
    Main,
    /// Wait for every client to finish and print a summary of each.
    All,
}

/// Logging configuration.
///
/// Logs are always written to stderr. The `RUST_LOG` environment variable takes precedence.
#[derive(Debug, Deserialize, Serialize)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// # Default
    ///
    /// `INFO`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
        }
    }
}

/// Benchmark configuration loaded from defaults, file and environment.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Address of the replicated service.
    ///
    /// # Default
    ///
    /// `127.0.0.1:6000`
    pub remote: SocketAddr,

    /// Length of a reporting window.
    ///
    /// # Default
    ///
    /// `2s`
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Whether the process waits for all clients or only the main one.
    ///
    /// # Default
    ///
    /// `main`
    pub wait_for: WaitFor,

    /// Optional deadline after which every client stops issuing operations.
    ///
    /// Without a deadline, a command the service never answers blocks its client forever.
    #[serde(default, with = "humantime_serde")]
    pub max_duration: Option<Duration>,

    /// How operation keys are generated.
    pub keys: KeyDistribution,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: SocketAddr::from(([127, 0, 0, 1], 6000)),
            window: DEFAULT_WINDOW,
            wait_for: WaitFor::default(),
            max_duration: None,
            keys: KeyDistribution::default(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the given YAML file (if any) and `KVBENCH__` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Combines this configuration with the command line parameters of a run.
    ///
    /// Fails if either count is zero or the configuration holds unusable values.
    pub fn into_run_config(self, total: u64, clients: usize) -> Result<RunConfig> {
        if total == 0 {
            return Err(Error::InvalidArguments(
                "total must be a positive integer".into(),
            ));
        }
        if clients == 0 {
            return Err(Error::InvalidArguments(
                "client count must be a positive integer".into(),
            ));
        }
        if self.window < HUNDREDTH_OF_SECOND {
            return Err(Error::InvalidConfig(format!(
                "window must be at least {HUNDREDTH_OF_SECOND:?}"
            )));
        }
        if let KeyDistribution::Uniform { key_space, .. } = self.keys {
            if key_space == 0 || key_space > i64::MAX as u64 {
                return Err(Error::InvalidConfig(format!(
                    "key_space must be between 1 and {}",
                    i64::MAX
                )));
            }
        }

        Ok(RunConfig {
            total,
            clients,
            window: self.window,
            wait_for: self.wait_for,
            max_duration: self.max_duration,
            keys: self.keys,
        })
    }
}

/// Immutable parameters of one benchmark run, shared by all clients.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Number of operations each client issues.
    pub total: u64,
    /// Number of concurrent clients, including the one on the main task.
    pub clients: usize,
    /// Length of a reporting window.
    pub window: Duration,
    /// Whether to wait for all clients or only the main one.
    pub wait_for: WaitFor,
    /// Optional deadline for the run, measured from each client's start.
    pub max_duration: Option<Duration>,
    /// How operation keys are generated.
    pub keys: KeyDistribution,
}

impl RunConfig {
    /// Creates a run configuration with default settings.
    pub fn new(total: u64, clients: usize) -> Self {
        Self {
            total,
            clients,
            window: DEFAULT_WINDOW,
            wait_for: WaitFor::default(),
            max_duration: None,
            keys: KeyDistribution::default(),
        }
    }
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.remote, "127.0.0.1:6000".parse().unwrap());
            assert_eq!(config.window, Duration::from_secs(2));
            assert_eq!(config.wait_for, WaitFor::Main);
            assert_eq!(config.max_duration, None);
            assert_eq!(config.keys, KeyDistribution::Sequential);
            assert_eq!(config.logging.level, LevelFilter::INFO);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("KVBENCH__REMOTE", "10.0.0.1:7000");
            jail.set_env("KVBENCH__WINDOW", "500ms");
            jail.set_env("KVBENCH__WAIT_FOR", "all");
            jail.set_env("KVBENCH__MAX_DURATION", "1m");
            jail.set_env("KVBENCH__KEYS__TYPE", "uniform");
            jail.set_env("KVBENCH__KEYS__KEY_SPACE", "50");
            jail.set_env("KVBENCH__LOGGING__LEVEL", "debug");

            let config = Config::load(None).unwrap();

            assert_eq!(config.remote, "10.0.0.1:7000".parse().unwrap());
            assert_eq!(config.window, Duration::from_millis(500));
            assert_eq!(config.wait_for, WaitFor::All);
            assert_eq!(config.max_duration, Some(Duration::from_secs(60)));
            assert_eq!(
                config.keys,
                KeyDistribution::Uniform {
                    seed: 1212,
                    key_space: 50
                }
            );
            assert_eq!(config.logging.level, LevelFilter::DEBUG);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            remote: 192.168.1.2:6000
            window: 1s
            keys:
                type: uniform
                seed: 7
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("KVBENCH__WINDOW", "3s");

            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.remote, "192.168.1.2:6000".parse().unwrap());
            // Env should overwrite the yaml config
            assert_eq!(config.window, Duration::from_secs(3));
            assert_eq!(
                config.keys,
                KeyDistribution::Uniform {
                    seed: 7,
                    key_space: 10_000
                }
            );

            Ok(())
        });
    }

    #[test]
    fn rejects_zero_counts() {
        let err = Config::default().into_run_config(0, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));

        let err = Config::default().into_run_config(1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }

    #[test]
    fn rejects_tiny_window() {
        let config = Config {
            window: Duration::from_millis(1),
            ..Default::default()
        };
        let err = config.into_run_config(10, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unusable_key_space() {
        for key_space in [0, i64::MAX as u64 + 1, u64::MAX] {
            let config = Config {
                keys: KeyDistribution::Uniform { seed: 1, key_space },
                ..Default::default()
            };
            let err = config.into_run_config(10, 1).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "{key_space}");
        }

        let config = Config {
            keys: KeyDistribution::Uniform {
                seed: 1,
                key_space: i64::MAX as u64,
            },
            ..Default::default()
        };
        assert!(config.into_run_config(10, 1).is_ok());
    }

    #[test]
    fn run_config_from_config() {
        let config = Config {
            wait_for: WaitFor::All,
            ..Default::default()
        };
        let run = config.into_run_config(100, 4).unwrap();

        assert_eq!(run.total, 100);
        assert_eq!(run.clients, 4);
        assert_eq!(run.wait_for, WaitFor::All);
        assert_eq!(run.window, DEFAULT_WINDOW);
    }
}
