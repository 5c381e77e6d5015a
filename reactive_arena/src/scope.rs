use crate::{node::NodeId, runtime::with_runtime};

/// Creates an effect scope: a handle that collects every effect created
/// while it is [running](EffectScope::run), so they can all be stopped at
/// once.
///
/// ```
/// # use reactive_arena::*;
/// # use std::{cell::Cell, rc::Rc};
/// let (count, set_count) = create_signal(0);
/// let runs = Rc::new(Cell::new(0));
/// let scope = create_effect_scope();
/// scope.run(|| {
///     create_effect({
///         let runs = Rc::clone(&runs);
///         move |_| {
///             count.get();
///             runs.set(runs.get() + 1);
///         }
///     });
/// });
/// set_count.set(1);
/// assert_eq!(runs.get(), 2);
/// scope.stop();
/// set_count.set(2);
/// assert_eq!(runs.get(), 2);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
#[track_caller]
pub fn create_effect_scope() -> EffectScope {
    let id = with_runtime(|runtime| runtime.create_scope_node());
    EffectScope {
        id,
        #[cfg(debug_assertions)]
        defined_at: std::panic::Location::caller(),
    }
}

/// A collector for effects. See [`create_effect_scope`].
///
/// Scopes do not nest implicitly: a scope created inside another scope's
/// `run` is not owned by it unless an effect in between holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectScope {
    pub(crate) id: NodeId,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl EffectScope {
    /// Runs `f` with this scope as the owner of any effect created while
    /// it runs, except effects created under a nested tracking pass, which
    /// belong to that subscriber.
    pub fn run<U>(&self, f: impl FnOnce() -> U) -> U {
        with_runtime(|runtime| {
            let prev_scope = runtime.owner_scope.replace(Some(self.id));
            let value = f();
            runtime.owner_scope.set(prev_scope);
            value
        })
    }

    /// Stops every effect the scope owns and retires the scope itself.
    pub fn stop(self) {
        with_runtime(|runtime| runtime.dispose_node(self.id));
    }
}
