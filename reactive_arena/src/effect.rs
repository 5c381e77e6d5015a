use crate::{node::NodeId, runtime::with_runtime};
use std::{any::Any, cell::RefCell, marker::PhantomData, rc::Rc};

/// A type-erased computation stored on a reactive node: given the node's
/// value cell, runs and reports whether the stored value changed.
pub trait AnyComputation {
    fn run(&self, value: Rc<RefCell<dyn Any>>) -> bool;
}

/// Creates an effect, which runs immediately and re-runs whenever any
/// reactive value it read has changed.
///
/// Effects are for pushing reactive values out into the non-reactive
/// world: logging, rendering, writing to a channel. Deriving one reactive
/// value from others belongs in a memo instead.
///
/// The closure receives whatever it returned the last time it ran, `None`
/// the first time.
///
/// ```
/// # use reactive_arena::*;
/// # use std::{cell::RefCell, rc::Rc};
/// let (name, set_name) = create_signal("Alice".to_string());
/// let log = Rc::new(RefCell::new(Vec::new()));
/// create_effect({
///     let log = Rc::clone(&log);
///     move |_| log.borrow_mut().push(name.get())
/// });
/// set_name.set("Bob".to_string());
/// assert_eq!(*log.borrow(), ["Alice", "Bob"]);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
#[track_caller]
pub fn create_effect<T>(f: impl Fn(Option<T>) -> T + 'static) -> Effect
where
    T: 'static,
{
    let id = with_runtime(|runtime| {
        let id = runtime.create_concrete_effect(
            Rc::new(RefCell::new(None::<T>)) as Rc<RefCell<dyn Any>>,
            Rc::new(EffectState { f, ty: PhantomData }),
        );
        runtime.run_effect_node(id);
        id
    });
    Effect {
        id,
        #[cfg(debug_assertions)]
        defined_at: std::panic::Location::caller(),
    }
}

/// A handle to a running effect. See [`create_effect`].
///
/// An effect created inside another effect or memo is owned by it: when
/// the parent re-runs without re-creating it, or is stopped, the child is
/// stopped too. An effect created inside [`crate::EffectScope::run`] is
/// owned by that scope. The handle is only needed to stop the effect
/// early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Effect {
    pub(crate) id: NodeId,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl Effect {
    /// Stops the effect. It never runs again, its subscriptions are
    /// cleared, and any effect it created is stopped with it.
    pub fn stop(self) {
        with_runtime(|runtime| runtime.dispose_node(self.id));
    }
}

struct EffectState<T, F>
where
    T: 'static,
    F: Fn(Option<T>) -> T,
{
    f: F,
    ty: PhantomData<T>,
}

impl<T, F> AnyComputation for EffectState<T, F>
where
    T: 'static,
    F: Fn(Option<T>) -> T,
{
    fn run(&self, value: Rc<RefCell<dyn Any>>) -> bool {
        // take the old value out before running, so the closure can read
        // other reactive values without the cell borrowed
        let prev_value = {
            let mut value = value.borrow_mut();
            let value = value
                .downcast_mut::<Option<T>>()
                .expect("to downcast effect value");
            value.take()
        };

        let new_value = (self.f)(prev_value);

        let mut value = value.borrow_mut();
        let value = value
            .downcast_mut::<Option<T>>()
            .expect("to downcast effect value");
        *value = Some(new_value);

        true
    }
}
