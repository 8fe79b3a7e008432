//! Named scheduling hooks.
//!
//! A [`HookRegistry`] maps a name to a wrapping function applied to every unit
//! of work a scheduler is about to accept. The registry is an explicit object
//! shared (via `Arc`) between whoever installs hooks and the schedulers that
//! consult them; there is no process-global state.
//!
//! Registration is last-write-wins: the most recently registered name becomes
//! the *active* hook, and only the active hook decorates newly submitted work.
//! Older entries stay in the map until [`HookRegistry::clear`] is called.
//! Decoration happens when work is submitted, so work already queued keeps the
//! wrapper that was active at submission time.

use crate::context::ContextMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A unit of work accepted by a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A wrapping function applied to scheduled work.
///
/// Receives the work and the context of the subscription that requested it,
/// and returns the work that will actually run.
pub type ScheduleHook = Arc<dyn Fn(Task, &ContextMap) -> Task + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    hooks: BTreeMap<String, ScheduleHook>,
    active: Option<String>,
}

/// Registry of named scheduling hooks.
#[derive(Default)]
pub struct HookRegistry {
    state: RwLock<RegistryState>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry behind an `Arc`, ready to be shared.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Registers `hook` under `name` and makes it the active hook.
    ///
    /// Overwrites any previous registration for the same name.
    pub fn register_hook<F>(&self, name: &str, hook: F)
    where
        F: Fn(Task, &ContextMap) -> Task + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        let replaced = state
            .hooks
            .insert(name.to_string(), Arc::new(hook))
            .is_some();
        state.active = Some(name.to_string());
        drop(state);
        tracing::debug!(hook = %name, replaced, "schedule hook registered");
    }

    /// Returns the name of the active hook, if any.
    #[must_use]
    pub fn active_name(&self) -> Option<String> {
        self.state.read().active.clone()
    }

    /// Returns true if a hook is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().hooks.contains_key(name)
    }

    /// Number of registered hooks, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().hooks.len()
    }

    /// Returns true when no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().hooks.is_empty()
    }

    /// Removes every hook and clears the active name.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let removed = state.hooks.len();
        state.hooks.clear();
        state.active = None;
        drop(state);
        tracing::debug!(removed, "schedule hook registry reset");
    }

    /// Applies the active hook to `task`, or returns it untouched.
    #[must_use]
    pub fn decorate(&self, task: Task, ctx: &ContextMap) -> Task {
        let hook = {
            let state = self.state.read();
            state
                .active
                .as_ref()
                .and_then(|name| state.hooks.get(name))
                .cloned()
        };
        match hook {
            Some(hook) => hook(task, ctx),
            None => task,
        }
    }

    /// Applies the hook registered under `name` to `task`, or returns it untouched.
    #[must_use]
    pub fn decorate_with(&self, name: &str, task: Task, ctx: &ContextMap) -> Task {
        let hook = self.state.read().hooks.get(name).cloned();
        match hook {
            Some(hook) => hook(task, ctx),
            None => task,
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HookRegistry")
            .field("hooks", &state.hooks.keys().collect::<Vec<_>>())
            .field("active", &state.active)
            .finish()
    }
}
