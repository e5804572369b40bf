//! Scripted `ServiceCheck` implementations for runner tests.

use async_trait::async_trait;
use common::error::CheckError;
use common::types::TestOutcome;
use conn_check::checks::{CheckContext, ServiceCheck};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What a [`ScriptedCheck`] does when run.
#[derive(Debug, Clone)]
pub enum Script {
    /// Return this outcome as-is.
    Outcome(TestOutcome),
    /// Return `CheckError::Internal` with this message.
    Error(String),
    /// Panic with this message.
    Panic(String),
}

/// A check that follows a fixed script and counts its invocations.
pub struct ScriptedCheck {
    service: &'static str,
    client: &'static str,
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedCheck {
    pub fn new(service: &'static str, client: &'static str, script: Script) -> Self {
        Self {
            service,
            client,
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn passing(service: &'static str, client: &'static str, detail: &str) -> Self {
        Self::new(
            service,
            client,
            Script::Outcome(TestOutcome::pass(service, client, detail)),
        )
    }

    pub fn skipping(service: &'static str, client: &'static str, detail: &str) -> Self {
        Self::new(
            service,
            client,
            Script::Outcome(TestOutcome::skip(service, client, detail)),
        )
    }

    pub fn erroring(service: &'static str, client: &'static str, message: &str) -> Self {
        Self::new(service, client, Script::Error(message.to_string()))
    }

    pub fn panicking(service: &'static str, client: &'static str, message: &str) -> Self {
        Self::new(service, client, Script::Panic(message.to_string()))
    }

    /// Shared invocation counter, readable after the check is boxed.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ServiceCheck for ScriptedCheck {
    fn service(&self) -> &'static str {
        self.service
    }

    fn client(&self) -> &'static str {
        self.client
    }

    async fn run(&self, _ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Outcome(outcome) => Ok(outcome.clone()),
            Script::Error(message) => Err(CheckError::Internal(message.clone())),
            Script::Panic(message) => panic!("{message}"),
        }
    }
}
