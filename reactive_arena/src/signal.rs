use crate::{
    diagnostics::ReactiveError,
    node::NodeId,
    runtime::{with_runtime, Runtime},
};
use std::{any::Any, cell::RefCell, marker::PhantomData, rc::Rc};

/// Creates a signal, the basic reactive primitive: a value that notifies
/// its subscribers when it changes.
///
/// Returns the reading and writing halves as separate handles. Both are
/// `Copy`, so they can be moved into any number of closures.
///
/// ```
/// # use reactive_arena::*;
/// let (count, set_count) = create_signal(0);
/// assert_eq!(count.get(), 0);
/// set_count.set(1);
/// assert_eq!(count.get(), 1);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
#[track_caller]
pub fn create_signal<T>(value: T) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: 'static,
{
    let id = with_runtime(|runtime| {
        runtime.create_concrete_signal(Rc::new(RefCell::new(value)) as Rc<RefCell<dyn Any>>)
    });
    (
        ReadSignal {
            id,
            ty: PhantomData,
            #[cfg(debug_assertions)]
            defined_at: std::panic::Location::caller(),
        },
        WriteSignal {
            id,
            ty: PhantomData,
            #[cfg(debug_assertions)]
            defined_at: std::panic::Location::caller(),
        },
    )
}

/// Creates a signal whose reading and writing halves share one handle.
///
/// ```
/// # use reactive_arena::*;
/// let count = create_rw_signal(0);
/// count.update(|n| *n += 1);
/// assert_eq!(count.get(), 1);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
#[track_caller]
pub fn create_rw_signal<T>(value: T) -> RwSignal<T>
where
    T: 'static,
{
    let id = with_runtime(|runtime| {
        runtime.create_concrete_signal(Rc::new(RefCell::new(value)) as Rc<RefCell<dyn Any>>)
    });
    RwSignal {
        id,
        ty: PhantomData,
        #[cfg(debug_assertions)]
        defined_at: std::panic::Location::caller(),
    }
}

/// The reading half of a signal.
///
/// Reads inside an effect or memo subscribe it to this signal; the
/// `_untracked` variants read without subscribing.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ReadSignal<T>
where
    T: 'static,
{
    pub(crate) id: NodeId,
    pub(crate) ty: PhantomData<T>,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ReadSignal<T> {}

impl<T> ReadSignal<T>
where
    T: 'static,
{
    /// Clones the current value out, subscribing the running observer.
    ///
    /// # Panics
    /// Panics if the signal has been disposed.
    #[track_caller]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(Clone::clone)
    }

    /// Like [`ReadSignal::get`], but returns `None` once the signal has
    /// been disposed.
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.try_with(Clone::clone).ok()
    }

    /// Applies a closure to the current value without cloning it,
    /// subscribing the running observer.
    ///
    /// # Panics
    /// Panics if the signal has been disposed.
    #[track_caller]
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.try_with(f)
            .expect("tried to access a signal after it was disposed")
    }

    /// Like [`ReadSignal::with`], but returns an error once the signal has
    /// been disposed.
    pub fn try_with<U>(&self, f: impl FnOnce(&T) -> U) -> Result<U, ReactiveError> {
        with_runtime(|runtime| {
            self.id.subscribe(runtime);
            read_value(runtime, self.id, f)
        })
    }

    /// Clones the current value out without subscribing.
    #[track_caller]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(Clone::clone)
    }

    /// Applies a closure to the current value without subscribing.
    #[track_caller]
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        with_runtime(|runtime| read_value(runtime, self.id, f))
            .expect("tried to access a signal after it was disposed")
    }

    /// Removes the signal from the reactive graph. Subscribers keep
    /// running but no longer receive notifications from it, and any handle
    /// to it only works through the `try_` accessors afterwards.
    pub fn dispose(self) {
        with_runtime(|runtime| runtime.dispose_node(self.id));
    }
}

/// The writing half of a signal.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct WriteSignal<T>
where
    T: 'static,
{
    pub(crate) id: NodeId,
    pub(crate) ty: PhantomData<T>,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WriteSignal<T> {}

impl<T> WriteSignal<T>
where
    T: 'static,
{
    /// Replaces the value and notifies subscribers, unless the new value
    /// compares equal to the current one, in which case nothing runs.
    ///
    /// Outside a batch, queued effects run before this returns.
    ///
    /// # Panics
    /// Panics if the signal has been disposed.
    #[track_caller]
    pub fn set(&self, new_value: T)
    where
        T: PartialEq,
    {
        if self.try_set(new_value).is_some() {
            panic!("tried to set a signal after it was disposed");
        }
    }

    /// Like [`WriteSignal::set`], but hands the value back instead of
    /// panicking once the signal has been disposed.
    pub fn try_set(&self, new_value: T) -> Option<T>
    where
        T: PartialEq,
    {
        with_runtime(|runtime| {
            let Some(value) = value_cell(runtime, self.id) else {
                return Some(new_value);
            };
            let changed = {
                let mut value = value.borrow_mut();
                match value.downcast_mut::<T>() {
                    Some(current) if *current == new_value => false,
                    Some(current) => {
                        *current = new_value;
                        true
                    }
                    None => return Some(new_value),
                }
            };
            if changed {
                runtime.mark_dirty(self.id);
                runtime.run_effects();
            }
            None
        })
    }

    /// Applies a closure to the value in place and notifies subscribers,
    /// whether or not the closure changed anything.
    ///
    /// # Panics
    /// Panics if the signal has been disposed.
    #[track_caller]
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        if self.try_update(f).is_none() {
            panic!("tried to update a signal after it was disposed");
        }
    }

    /// Like [`WriteSignal::update`], but returns the closure's result, or
    /// `None` once the signal has been disposed.
    pub fn try_update<U>(&self, f: impl FnOnce(&mut T) -> U) -> Option<U> {
        with_runtime(|runtime| {
            let value = value_cell(runtime, self.id)?;
            let result = {
                let mut value = value.borrow_mut();
                let value = value.downcast_mut::<T>()?;
                f(value)
            };
            runtime.mark_dirty(self.id);
            runtime.run_effects();
            Some(result)
        })
    }

    /// Replaces the value without notifying anyone.
    #[track_caller]
    pub fn set_untracked(&self, new_value: T) {
        if self.try_update_untracked(|value| *value = new_value).is_none() {
            panic!("tried to set a signal after it was disposed");
        }
    }

    /// Applies a closure to the value in place without notifying anyone.
    #[track_caller]
    pub fn update_untracked(&self, f: impl FnOnce(&mut T)) {
        if self.try_update_untracked(f).is_none() {
            panic!("tried to update a signal after it was disposed");
        }
    }

    fn try_update_untracked<U>(&self, f: impl FnOnce(&mut T) -> U) -> Option<U> {
        with_runtime(|runtime| {
            let value = value_cell(runtime, self.id)?;
            let mut value = value.borrow_mut();
            let value = value.downcast_mut::<T>()?;
            Some(f(value))
        })
    }
}

/// A signal that can be read from and written to through one handle.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RwSignal<T>
where
    T: 'static,
{
    pub(crate) id: NodeId,
    pub(crate) ty: PhantomData<T>,
    #[cfg(debug_assertions)]
    pub(crate) defined_at: &'static std::panic::Location<'static>,
}

impl<T> Clone for RwSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RwSignal<T> {}

impl<T> RwSignal<T>
where
    T: 'static,
{
    /// Returns a read-only handle to the same signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            id: self.id,
            ty: PhantomData,
            #[cfg(debug_assertions)]
            defined_at: self.defined_at,
        }
    }

    /// Returns a write-only handle to the same signal.
    pub fn write_only(&self) -> WriteSignal<T> {
        WriteSignal {
            id: self.id,
            ty: PhantomData,
            #[cfg(debug_assertions)]
            defined_at: self.defined_at,
        }
    }

    /// See [`ReadSignal::get`].
    #[track_caller]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.read_only().get()
    }

    /// See [`ReadSignal::try_get`].
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.read_only().try_get()
    }

    /// See [`ReadSignal::with`].
    #[track_caller]
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.read_only().with(f)
    }

    /// See [`ReadSignal::try_with`].
    pub fn try_with<U>(&self, f: impl FnOnce(&T) -> U) -> Result<U, ReactiveError> {
        self.read_only().try_with(f)
    }

    /// See [`ReadSignal::get_untracked`].
    #[track_caller]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.read_only().get_untracked()
    }

    /// See [`ReadSignal::with_untracked`].
    #[track_caller]
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.read_only().with_untracked(f)
    }

    /// See [`WriteSignal::set`].
    #[track_caller]
    pub fn set(&self, new_value: T)
    where
        T: PartialEq,
    {
        self.write_only().set(new_value)
    }

    /// See [`WriteSignal::try_set`].
    pub fn try_set(&self, new_value: T) -> Option<T>
    where
        T: PartialEq,
    {
        self.write_only().try_set(new_value)
    }

    /// See [`WriteSignal::update`].
    #[track_caller]
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.write_only().update(f)
    }

    /// See [`WriteSignal::try_update`].
    pub fn try_update<U>(&self, f: impl FnOnce(&mut T) -> U) -> Option<U> {
        self.write_only().try_update(f)
    }

    /// See [`WriteSignal::set_untracked`].
    #[track_caller]
    pub fn set_untracked(&self, new_value: T) {
        self.write_only().set_untracked(new_value)
    }

    /// See [`WriteSignal::update_untracked`].
    #[track_caller]
    pub fn update_untracked(&self, f: impl FnOnce(&mut T)) {
        self.write_only().update_untracked(f)
    }

    /// See [`ReadSignal::dispose`].
    pub fn dispose(self) {
        with_runtime(|runtime| runtime.dispose_node(self.id));
    }
}

/// Reads a node's value cell and applies `f` to the inner `T`.
pub(crate) fn read_value<T, U>(
    runtime: &Runtime,
    id: NodeId,
    f: impl FnOnce(&T) -> U,
) -> Result<U, ReactiveError>
where
    T: 'static,
{
    let Some(value) = value_cell(runtime, id) else {
        return Err(ReactiveError::Disposed);
    };
    let value = value.borrow();
    let value = value
        .downcast_ref::<T>()
        .expect("to downcast the stored value");
    Ok(f(value))
}

fn value_cell(runtime: &Runtime, id: NodeId) -> Option<Rc<RefCell<dyn Any>>> {
    let nodes = runtime.nodes.borrow();
    nodes.get(id).map(|node| node.value())
}
