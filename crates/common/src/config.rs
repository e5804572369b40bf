//! Environment-driven configuration.
//!
//! Every check reads its settings from an [`EnvSnapshot`] captured once when the
//! run starts. Tests build snapshots from a `HashMap` instead of mutating the
//! process environment.

use crate::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use tracing::warn;

/// Values accepted as "enabled" by [`env_bool`], compared case-insensitively.
pub const TRUTHY_VALUES: [&str; 4] = ["1", "true", "yes", "on"];

/// Resolve a boolean flag.
///
/// Absent or empty values yield `fallback`. Anything else is `true` only if it
/// matches one of [`TRUTHY_VALUES`]; unrecognised values are `false`.
#[must_use]
pub fn env_bool(vars: &HashMap<String, String>, name: &str, fallback: bool) -> bool {
    match vars.get(name) {
        None => fallback,
        Some(value) if value.is_empty() => fallback,
        Some(value) => {
            let lower = value.to_lowercase();
            TRUTHY_VALUES.contains(&lower.as_str())
        }
    }
}

/// Immutable copy of the environment variables a run reads.
#[derive(Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

/// Only variable names are shown; values may hold credentials.
impl fmt::Debug for EnvSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EnvSnapshot").field("names", &names).finish()
    }
}

impl EnvSnapshot {
    /// Capture the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars().collect())
    }

    /// Build a snapshot from explicit variables (for testing).
    #[must_use]
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Resolve a boolean flag, see [`env_bool`].
    #[must_use]
    pub fn flag(&self, name: &str, fallback: bool) -> bool {
        env_bool(&self.vars, name, fallback)
    }

    /// Raw lookup. Empty values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// String value with a default.
    #[must_use]
    pub fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_string()
    }

    /// First variable in `names` that is set, otherwise `default`.
    #[must_use]
    pub fn first_of(&self, names: &[&str], default: &str) -> String {
        names
            .iter()
            .find_map(|name| self.get(name))
            .unwrap_or(default)
            .to_string()
    }

    /// Secret value with a default. The value is redacted in `Debug` output.
    #[must_use]
    pub fn secret(&self, name: &str, default: &str) -> SecretString {
        SecretString::from(self.string(name, default))
    }

    /// Port value with a default. Unparseable values fall back to the default.
    #[must_use]
    pub fn port(&self, name: &str, default: u16) -> u16 {
        self.port_of(&[name], default)
    }

    /// Port from the first variable in `names` that is set.
    #[must_use]
    pub fn port_of(&self, names: &[&str], default: u16) -> u16 {
        let Some((name, raw)) = names
            .iter()
            .find_map(|name| self.get(name).map(|raw| (*name, raw)))
        else {
            return default;
        };

        match raw.trim().parse::<u16>() {
            Ok(port) => port,
            Err(e) => {
                warn!(
                    target: "conn_check.config",
                    variable = name,
                    value = raw,
                    error = %e,
                    default,
                    "Ignoring invalid port value"
                );
                default
            }
        }
    }
}
