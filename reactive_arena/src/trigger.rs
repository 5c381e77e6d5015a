#![forbid(unsafe_code)]

use crate::{node::NodeId, runtime::with_runtime};

/// Creates a trigger: a notifier with no value attached.
///
/// A trigger is useful when some piece of state lives outside the
/// reactive graph but its consumers still need to re-run when it changes.
/// Reading a trigger with [`Trigger::track`] subscribes the running
/// observer; [`Trigger::notify`] wakes every subscriber.
///
/// ```
/// # use reactive_arena::*;
/// # use std::{cell::Cell, rc::Rc};
/// let external = Rc::new(Cell::new(1));
/// let rerun = create_trigger();
/// let seen = Rc::new(Cell::new(0));
/// create_effect({
///     let external = Rc::clone(&external);
///     let seen = Rc::clone(&seen);
///     move |_| {
///         rerun.track();
///         seen.set(external.get());
///     }
/// });
/// assert_eq!(seen.get(), 1);
/// external.set(5);
/// rerun.notify();
/// assert_eq!(seen.get(), 5);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
#[track_caller]
pub fn create_trigger() -> Trigger {
    let id = with_runtime(|runtime| runtime.create_trigger_node());
    Trigger {
        id,
        #[cfg(debug_assertions)]
        defined_at: std::panic::Location::caller(),
    }
}

/// A valueless notifier. See [`create_trigger`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub(crate) id: NodeId,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl Trigger {
    /// Notifies every subscriber. Outside a batch, queued effects run
    /// before this returns.
    ///
    /// # Panics
    /// Panics if the trigger has been disposed.
    #[track_caller]
    pub fn notify(&self) {
        assert!(
            self.try_notify(),
            "tried to notify a trigger after it was disposed"
        );
    }

    /// Like [`Trigger::notify`], but returns `false` instead of panicking
    /// once the trigger has been disposed.
    pub fn try_notify(&self) -> bool {
        with_runtime(|runtime| {
            if !runtime.nodes.borrow().contains_key(self.id) {
                return false;
            }
            runtime.mark_dirty(self.id);
            runtime.run_effects();
            true
        })
    }

    /// Subscribes the running observer to this trigger.
    ///
    /// # Panics
    /// Panics if the trigger has been disposed.
    #[track_caller]
    pub fn track(&self) {
        assert!(
            self.try_track(),
            "tried to track a trigger after it was disposed"
        );
    }

    /// Like [`Trigger::track`], but returns `false` instead of panicking
    /// once the trigger has been disposed.
    pub fn try_track(&self) -> bool {
        with_runtime(|runtime| {
            if !runtime.nodes.borrow().contains_key(self.id) {
                return false;
            }
            self.id.subscribe(runtime);
            true
        })
    }

    /// Removes the trigger from the reactive graph.
    pub fn dispose(self) {
        with_runtime(|runtime| runtime.dispose_node(self.id));
    }
}
