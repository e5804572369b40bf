//! Builder for `EnvSnapshot`s used in tests.

use common::config::EnvSnapshot;
use conn_check::checks::{kafka, minio, mysql, opensearch, postgres, valkey};
use std::collections::HashMap;

/// Enable flags of every registered check, in registry order.
pub const ALL_FLAGS: [&str; 6] = [
    postgres::ENV_FLAG,
    mysql::ENV_FLAG,
    valkey::ENV_FLAG,
    kafka::ENV_FLAG,
    opensearch::ENV_FLAG,
    minio::ENV_FLAG,
];

/// Fluent builder over a plain variable map.
#[derive(Debug, Default, Clone)]
pub struct EnvBuilder {
    vars: HashMap<String, String>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.insert(name.to_string(), value.into());
        self
    }

    pub fn enable(self, flag: &str) -> Self {
        self.set(flag, "true")
    }

    pub fn disable(self, flag: &str) -> Self {
        self.set(flag, "false")
    }

    /// Turn every service check off, including the ones enabled by default.
    pub fn disable_all(self) -> Self {
        ALL_FLAGS.iter().fold(self, |builder, flag| builder.disable(flag))
    }

    pub fn build(self) -> EnvSnapshot {
        EnvSnapshot::from_vars(self.vars)
    }
}
