//! Installs the capture hook for a variant.
//!
//! The hook reads [`CONTEXT_KEY`] from the requesting subscription's context
//! when work is submitted, then wraps the work so that the value sits in the
//! companion's capture cell, on the executing thread, for exactly the extent
//! of that work.

use super::companion::Companion;
use crate::context::ContextMap;
use crate::scheduler::{HookRegistry, Task};
use std::sync::Arc;

/// Context key carrying the propagated value.
pub const CONTEXT_KEY: &str = "key";
/// Value bound to [`CONTEXT_KEY`] in every verification run.
pub const CONTEXT_VALUE: &str = "customized";
/// Value captured when the subscription's context lacks [`CONTEXT_KEY`].
pub const CONTEXT_FALLBACK: &str = "notFound";

/// The context every generated verification subscribes with.
#[must_use]
pub fn scoped_context() -> ContextMap {
    ContextMap::of(CONTEXT_KEY, CONTEXT_VALUE)
}

/// Registers (or re-registers) the capture hook for `name`.
///
/// Idempotent per name: a second call replaces the first registration and
/// makes `name` the active hook again.
pub fn install<R>(registry: &HookRegistry, name: &str, companion: &Arc<Companion<R>>)
where
    R: Send + Sync + 'static,
{
    let companion = Arc::clone(companion);
    let hook_name: Arc<str> = Arc::from(name);
    registry.register_hook(name, move |task: Task, ctx: &ContextMap| -> Task {
        let from_context = ctx.get_or(CONTEXT_KEY, CONTEXT_FALLBACK).to_string();
        let companion = Arc::clone(&companion);
        let hook_name = Arc::clone(&hook_name);
        Box::new(move || {
            tracing::trace!(hook = %hook_name, value = %from_context, "capture armed");
            companion.capture().set(from_context);
            let _reset = ClearOnExit(&companion);
            task();
        })
    });
}

/// Clears the calling thread's capture slot when dropped, panics included.
struct ClearOnExit<'a, R>(&'a Companion<R>);

impl<R> Drop for ClearOnExit<'_, R> {
    fn drop(&mut self) {
        self.0.capture().clear();
    }
}
