//! One generated, independently runnable test variant.

use super::companion::Companion;
use super::dynamic::Named;
use super::interceptor::{self, CONTEXT_KEY, CONTEXT_VALUE};
use crate::error::{Error, Result};
use crate::flow::Sequence;
use crate::scheduler::HookRegistry;
use crate::verify::{FirstStep, StepVerifier, VerifierOptions};
use std::fmt;
use std::sync::Arc;

/// Lazily assembles a variant's full pipeline (source plus operator under test).
pub type PipelineFactory<T> = Arc<dyn Fn() -> Sequence<T> + Send + Sync>;

/// A named variant checking context propagation through scheduled work.
///
/// Every entry point re-arms the capture hook for this variant's name, then
/// assembles a fresh pipeline, then hands it to the [`StepVerifier`] with the
/// `"key" -> "customized"` initial context.
pub struct ScheduledContextCase<T, R> {
    name: String,
    factory: PipelineFactory<T>,
    companion: Arc<Companion<R>>,
    registry: Arc<HookRegistry>,
}

impl<T, R> ScheduledContextCase<T, R>
where
    T: fmt::Debug + Send + 'static,
    R: Send + Sync + 'static,
{
    pub(crate) fn new(
        name: String,
        factory: PipelineFactory<T>,
        companion: Arc<Companion<R>>,
        registry: Arc<HookRegistry>,
    ) -> Self {
        Self {
            name,
            factory,
            companion,
            registry,
        }
    }

    /// Name of this variant.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource supplied for this variant.
    #[must_use]
    pub fn resource(&self) -> &R {
        self.companion.resource()
    }

    /// This variant's companion.
    #[must_use]
    pub fn companion(&self) -> &Arc<Companion<R>> {
        &self.companion
    }

    /// Verification of the pipeline with each item suffixed by the value held
    /// in the capture cell at the moment the item is produced.
    pub fn mapping_test(&self) -> Result<FirstStep<String>>
    where
        T: fmt::Display,
    {
        let companion = Arc::clone(&self.companion);
        let transformed = self
            .prepare()?
            .map(move |item| format!("{item}{}", companion.capture().get()));
        Ok(StepVerifier::create(transformed, self.options(VerifierOptions::create())))
    }

    /// Verification of the untransformed pipeline.
    pub fn raw_test(&self) -> Result<FirstStep<T>> {
        let sequence = self.prepare()?;
        Ok(StepVerifier::create(sequence, self.options(VerifierOptions::create())))
    }

    /// Like [`raw_test`](Self::raw_test), after `configure` adjusted the run
    /// options. The `"key" -> "customized"` binding is merged into the
    /// configured initial context last: it always wins for `"key"`, and any
    /// other entries `configure` put there are kept.
    pub fn raw_test_with<F>(&self, configure: F) -> Result<FirstStep<T>>
    where
        F: FnOnce(&mut VerifierOptions),
    {
        let mut options = VerifierOptions::create();
        configure(&mut options);
        let sequence = self.prepare()?;
        Ok(StepVerifier::create(sequence, self.options(options)))
    }

    /// Arms the hook, then assembles the pipeline.
    fn prepare(&self) -> Result<Sequence<T>> {
        interceptor::install(&self.registry, &self.name, &self.companion);
        self.build()
    }

    /// Assembles the pipeline, refusing to do so unless this variant's hook is
    /// the active one.
    fn build(&self) -> Result<Sequence<T>> {
        let active = self.registry.active_name();
        if active.as_deref() != Some(self.name.as_str()) {
            return Err(Error::hook_not_installed(&self.name, active.as_deref()));
        }
        Ok((self.factory)())
    }

    fn options(&self, options: VerifierOptions) -> VerifierOptions {
        let scenario = options
            .scenario_name
            .clone()
            .unwrap_or_else(|| self.name.clone());
        let ctx = options.initial_context.put(CONTEXT_KEY, CONTEXT_VALUE);
        options.scenario_name(scenario).with_initial_context(ctx)
    }
}

impl<T, R> Named for ScheduledContextCase<T, R> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<T, R: fmt::Debug> fmt::Debug for ScheduledContextCase<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledContextCase")
            .field("name", &self.name)
            .field("companion", &self.companion)
            .finish_non_exhaustive()
    }
}
