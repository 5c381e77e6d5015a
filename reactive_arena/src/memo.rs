#![forbid(unsafe_code)]
use crate::{
    diagnostics::ReactiveError,
    node::NodeId,
    runtime::with_runtime,
    signal::read_value,
    AnyComputation,
};
use std::{any::Any, cell::RefCell, marker::PhantomData, rc::Rc};

/// Creates a memo: a derived reactive value that caches its result and
/// recomputes only when one of the values it reads has actually changed.
///
/// The computation receives its previous value, `None` on the first run.
/// Nothing runs until the memo is first read; after that, a changed
/// dependency marks it stale and the next read recomputes it. If the new
/// result compares equal to the cached one, subscribers are not notified.
///
/// ```
/// # use reactive_arena::*;
/// let (value, set_value) = create_signal(2);
/// let double = create_memo(move |_| value.get() * 2);
/// assert_eq!(double.get(), 4);
/// set_value.set(5);
/// assert_eq!(double.get(), 10);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
#[track_caller]
pub fn create_memo<T>(f: impl Fn(Option<&T>) -> T + 'static) -> Memo<T>
where
    T: PartialEq + 'static,
{
    let id = with_runtime(|runtime| {
        runtime.create_concrete_memo(
            Rc::new(RefCell::new(None::<T>)) as Rc<RefCell<dyn Any>>,
            Rc::new(MemoState { f, ty: PhantomData }),
        )
    });
    Memo {
        id,
        ty: PhantomData,
        #[cfg(debug_assertions)]
        defined_at: std::panic::Location::caller(),
    }
}

/// A cached derived value. See [`create_memo`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Memo<T>
where
    T: 'static,
{
    pub(crate) id: NodeId,
    pub(crate) ty: PhantomData<T>,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Memo<T> {}

impl<T> Memo<T>
where
    T: 'static,
{
    /// Clones the current value out, recomputing first if the memo is
    /// stale and subscribing the running observer.
    ///
    /// # Panics
    /// Panics if the memo has been disposed, or if this read happens
    /// inside the memo's own computation.
    #[track_caller]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(Clone::clone)
    }

    /// Like [`Memo::get`], but returns `None` once the memo has been
    /// disposed.
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.try_with(Clone::clone).ok()
    }

    /// Applies a closure to the current value without cloning it,
    /// recomputing first if the memo is stale and subscribing the running
    /// observer.
    ///
    /// # Panics
    /// Panics if the memo has been disposed, or if this read happens
    /// inside the memo's own computation.
    #[track_caller]
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.try_with(f)
            .expect("tried to access a memo after it was disposed")
    }

    /// Like [`Memo::with`], but returns an error once the memo has been
    /// disposed.
    pub fn try_with<U>(&self, f: impl FnOnce(&T) -> U) -> Result<U, ReactiveError> {
        with_runtime(|runtime| {
            runtime.update_if_necessary(self.id);
            self.id.subscribe(runtime);
            read_value::<Option<T>, U>(runtime, self.id, |value| {
                // the value is always Some here: update_if_necessary ran
                // the computation if it had never produced one
                f(value.as_ref().unwrap())
            })
        })
    }

    /// Clones the current value out without subscribing. The memo is
    /// still brought up to date first.
    #[track_caller]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(Clone::clone)
    }

    /// Applies a closure to the current value without subscribing. The
    /// memo is still brought up to date first.
    #[track_caller]
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        with_runtime(|runtime| {
            runtime.update_if_necessary(self.id);
            read_value::<Option<T>, U>(runtime, self.id, |value| {
                f(value.as_ref().unwrap())
            })
        })
        .expect("tried to access a memo after it was disposed")
    }

    /// Removes the memo from the reactive graph, detaching it from its
    /// dependencies.
    pub fn dispose(self) {
        with_runtime(|runtime| runtime.dispose_node(self.id));
    }
}

struct MemoState<T, F>
where
    T: PartialEq + 'static,
    F: Fn(Option<&T>) -> T,
{
    f: F,
    ty: PhantomData<T>,
}

impl<T, F> AnyComputation for MemoState<T, F>
where
    T: PartialEq + 'static,
    F: Fn(Option<&T>) -> T,
{
    fn run(&self, value: Rc<RefCell<dyn Any>>) -> bool {
        let (new_value, is_different) = {
            let value = value.borrow();
            let curr_value = value
                .downcast_ref::<Option<T>>()
                .expect("to downcast memo value");

            // compute the new value
            let new_value = (self.f)(curr_value.as_ref());
            let is_different = curr_value.as_ref() != Some(&new_value);
            (new_value, is_different)
        };
        if is_different {
            let mut value = value.borrow_mut();
            let curr_value = value
                .downcast_mut::<Option<T>>()
                .expect("to downcast memo value");
            *curr_value = Some(new_value);
        }

        is_different
    }
}
