//! Environment-driven settings for model-backed deployments.
//!
//! Everything here is optional: the runtime itself needs none of it, but
//! applications wiring real [`ChatModel`](crate::clients::ChatModel)
//! implementations usually want provider credentials and per-run limits
//! from the environment rather than code.

use crate::runtimes::DEFAULT_RECURSION_LIMIT;

/// Settings resolved from environment variables (and a `.env` file when
/// present).
///
/// | Variable                    | Field             |
/// |-----------------------------|-------------------|
/// | `RELAYGRAPH_MODEL`          | `model`           |
/// | `RELAYGRAPH_BASE_URL`       | `base_url`        |
/// | `RELAYGRAPH_API_KEY`        | `api_key`         |
/// | `RELAYGRAPH_RECURSION_LIMIT`| `recursion_limit` |
/// | `SQLITE_DB_NAME`            | `sqlite_db_name`  |
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Model identifier handed to the provider.
    pub model: Option<String>,
    /// Override of the provider endpoint.
    pub base_url: Option<String>,
    /// Provider credential.
    pub api_key: Option<String>,
    /// Superstep ceiling; falls back to [`DEFAULT_RECURSION_LIMIT`].
    pub recursion_limit: u64,
    /// Database file for the SQLite checkpointer.
    pub sqlite_db_name: Option<String>,
}

impl Settings {
    /// Read settings from the environment. Malformed numeric values fall
    /// back to the default rather than failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let recursion_limit =
            Self::recursion_limit_from(std::env::var("RELAYGRAPH_RECURSION_LIMIT").ok());
        Self {
            model: std::env::var("RELAYGRAPH_MODEL").ok(),
            base_url: std::env::var("RELAYGRAPH_BASE_URL").ok(),
            api_key: std::env::var("RELAYGRAPH_API_KEY").ok(),
            recursion_limit,
            sqlite_db_name: std::env::var("SQLITE_DB_NAME").ok(),
        }
    }

    /// Parse a raw limit value. Malformed or zero values fall back to
    /// [`DEFAULT_RECURSION_LIMIT`].
    fn recursion_limit_from(raw: Option<String>) -> u64 {
        raw.and_then(|raw| raw.parse::<u64>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_RECURSION_LIMIT)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: None,
            base_url: None,
            api_key: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            sqlite_db_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursion_limit_parses_positive_values() {
        assert_eq!(Settings::recursion_limit_from(Some("7".into())), 7);
    }

    #[test]
    fn malformed_or_zero_limits_fall_back_to_default() {
        assert_eq!(
            Settings::recursion_limit_from(Some("not-a-number".into())),
            DEFAULT_RECURSION_LIMIT
        );
        assert_eq!(
            Settings::recursion_limit_from(Some("0".into())),
            DEFAULT_RECURSION_LIMIT
        );
        assert_eq!(
            Settings::recursion_limit_from(None),
            DEFAULT_RECURSION_LIMIT
        );
    }

    #[test]
    fn defaults_leave_provider_fields_unset() {
        let settings = Settings::default();
        assert_eq!(settings.model, None);
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.recursion_limit, DEFAULT_RECURSION_LIMIT);
    }
}
