//! Run configuration for [`StepVerifier`](super::StepVerifier).

use crate::config::{verify_timeout_from_env, DEFAULT_VERIFY_TIMEOUT};
use crate::context::ContextMap;
use std::time::Duration;

/// Configuration of one verification run.
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    /// Name reported in failure messages.
    pub scenario_name: Option<String>,
    /// Upper bound on the whole run, measured from subscription.
    pub timeout: Duration,
    /// Context attached to the verifier's subscription.
    pub initial_context: ContextMap,
}

impl VerifierOptions {
    /// Creates options with the default timeout, honoring
    /// `CTXSCOPE_VERIFY_TIMEOUT_MS` when it is set and valid.
    #[must_use]
    pub fn create() -> Self {
        let timeout = match verify_timeout_from_env() {
            Ok(Some(timeout)) => timeout,
            Ok(None) => DEFAULT_VERIFY_TIMEOUT,
            Err(error) => {
                tracing::warn!(%error, "ignoring verification timeout override");
                DEFAULT_VERIFY_TIMEOUT
            }
        };
        Self {
            scenario_name: None,
            timeout,
            initial_context: ContextMap::empty(),
        }
    }

    /// Sets the scenario name.
    #[must_use]
    pub fn scenario_name(mut self, name: impl Into<String>) -> Self {
        self.scenario_name = Some(name.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the initial context.
    #[must_use]
    pub fn with_initial_context(mut self, ctx: ContextMap) -> Self {
        self.initial_context = ctx;
        self
    }

    /// Label used in failure messages.
    #[must_use]
    pub fn label(&self) -> &str {
        self.scenario_name.as_deref().unwrap_or("unnamed")
    }
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::create()
    }
}
