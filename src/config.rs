//! Configuration loading via `ortho-config`.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// In-cluster address of the Longhorn manager service.
pub const DEFAULT_BACKEND_URL: &str = "http://longhorn-backend.longhorn-system.svc:9500";

/// Plugin configuration key overriding the probe concurrency window.
pub const PROBE_CONCURRENCY_KEY: &str = "probeConcurrency";

/// Snapshotter configuration derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "LONGHORN")]
pub struct SnapshotterConfig {
    /// Base URL of the Longhorn manager REST API.
    #[ortho_config(default = DEFAULT_BACKEND_URL.to_owned())]
    pub backend_url: String,
    /// Number of volume probes allowed in flight while locating the owner of
    /// a snapshot. `1` probes volumes strictly one after another.
    #[ortho_config(default = 1)]
    pub probe_concurrency: usize,
    /// Per-request transport timeout in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to longhorn-snapshotter.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

impl SnapshotterConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("longhorn-snapshotter")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide the value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty or
    /// zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_url.trim().is_empty() {
            return Err(FieldMetadata::new(
                "Longhorn backend URL",
                "LONGHORN_BACKEND_URL",
                "backend_url",
            )
            .missing());
        }
        if self.probe_concurrency == 0 {
            return Err(FieldMetadata::new(
                "probe concurrency (at least 1)",
                "LONGHORN_PROBE_CONCURRENCY",
                "probe_concurrency",
            )
            .missing());
        }
        if self.request_timeout_secs == 0 {
            return Err(FieldMetadata::new(
                "request timeout (seconds, at least 1)",
                "LONGHORN_REQUEST_TIMEOUT_SECS",
                "request_timeout_secs",
            )
            .missing());
        }
        Ok(())
    }

    /// Returns the backend URL without trailing slashes.
    #[must_use]
    pub fn normalised_backend_url(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }

    /// Returns the per-request transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the probe concurrency window, clamped to at least one.
    #[must_use]
    pub fn probe_window(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.probe_concurrency).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Settings the orchestrator may override through the plugin configuration
/// map passed to `init`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PluginOverrides {
    /// Replacement probe concurrency window.
    pub probe_concurrency: Option<NonZeroUsize>,
}

impl PluginOverrides {
    /// Extracts recognised keys from the plugin configuration map. Unknown
    /// keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a recognised key carries a
    /// value that does not parse.
    pub fn from_map<S: std::hash::BuildHasher>(
        config: &HashMap<String, String, S>,
    ) -> Result<Self, ConfigError> {
        let probe_concurrency = config
            .get(PROBE_CONCURRENCY_KEY)
            .map(|raw| {
                raw.trim()
                    .parse::<NonZeroUsize>()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: PROBE_CONCURRENCY_KEY.to_owned(),
                        message: format!("{raw:?}: {err}"),
                    })
            })
            .transpose()?;
        Ok(Self { probe_concurrency })
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a plugin configuration value could not be parsed.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Configuration key carrying the bad value.
        key: String,
        /// Parser error message.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn valid_config() -> SnapshotterConfig {
        SnapshotterConfig {
            backend_url: String::from(DEFAULT_BACKEND_URL),
            probe_concurrency: 1,
            request_timeout_secs: 30,
        }
    }

    #[rstest]
    fn default_config_validates(valid_config: SnapshotterConfig) {
        assert_eq!(valid_config.validate(), Ok(()));
    }

    #[rstest]
    #[case::blank_url(
        SnapshotterConfig { backend_url: String::from("  "), ..valid_config() },
        "LONGHORN_BACKEND_URL",
        "backend_url"
    )]
    #[case::zero_probes(
        SnapshotterConfig { probe_concurrency: 0, ..valid_config() },
        "LONGHORN_PROBE_CONCURRENCY",
        "probe_concurrency"
    )]
    #[case::zero_timeout(
        SnapshotterConfig { request_timeout_secs: 0, ..valid_config() },
        "LONGHORN_REQUEST_TIMEOUT_SECS",
        "request_timeout_secs"
    )]
    fn validation_errors_are_actionable(
        #[case] config: SnapshotterConfig,
        #[case] env_var: &str,
        #[case] toml_key: &str,
    ) {
        let message = config
            .validate()
            .expect_err("validation should fail")
            .to_string();
        assert!(message.contains(env_var), "missing env var: {message}");
        assert!(message.contains(toml_key), "missing TOML key: {message}");
        assert!(
            message.contains("longhorn-snapshotter.toml"),
            "missing config file: {message}"
        );
    }

    #[rstest]
    fn backend_url_drops_trailing_slashes(valid_config: SnapshotterConfig) {
        let config = SnapshotterConfig {
            backend_url: String::from("http://longhorn:9500//"),
            ..valid_config
        };
        assert_eq!(config.normalised_backend_url(), "http://longhorn:9500");
    }

    #[rstest]
    fn overrides_parse_probe_concurrency() {
        let map = HashMap::from([
            (String::from(PROBE_CONCURRENCY_KEY), String::from(" 4 ")),
            (String::from("region"), String::from("ignored")),
        ]);
        let overrides = PluginOverrides::from_map(&map).expect("overrides parse");
        assert_eq!(overrides.probe_concurrency, NonZeroUsize::new(4));
    }

    #[rstest]
    #[case("0")]
    #[case("many")]
    fn overrides_reject_invalid_probe_concurrency(#[case] raw: &str) {
        let map = HashMap::from([(String::from(PROBE_CONCURRENCY_KEY), raw.to_owned())]);
        let err = PluginOverrides::from_map(&map).expect_err("value should be rejected");
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == PROBE_CONCURRENCY_KEY));
    }

    #[rstest]
    fn empty_map_yields_no_overrides() {
        let overrides = PluginOverrides::from_map(&HashMap::new()).expect("empty map parses");
        assert_eq!(overrides, PluginOverrides::default());
    }
}
