#![forbid(unsafe_code)]
use crate::{
    node::{Epoch, Link, LinkId, NodeId, ReactiveNode, ReactiveNodeType},
    AnyComputation,
};
use slotmap::SlotMap;
use std::{
    any::Any,
    cell::{Cell, RefCell},
    rc::Rc,
};

/// The whole reactive graph for one thread: node and link arenas, the
/// current observer and owner scope, the epoch counter, and the effect
/// notification queue.
#[derive(Default)]
pub(crate) struct Runtime {
    pub(crate) nodes: RefCell<SlotMap<NodeId, ReactiveNode>>,
    pub(crate) links: RefCell<SlotMap<LinkId, Link>>,
    /// The subscriber currently inside a tracking pass, if any.
    pub(crate) observer: Cell<Option<NodeId>>,
    /// The effect scope new effects attach to when no observer is running.
    pub(crate) owner_scope: Cell<Option<NodeId>>,
    pub(crate) epoch: Cell<Epoch>,
    pub(crate) batch_depth: Cell<usize>,
    pub(crate) queue_head: Cell<Option<NodeId>>,
    pub(crate) queue_tail: Cell<Option<NodeId>>,
}

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::default();
}

/// Runs the given code with this thread's reactive runtime.
pub(crate) fn with_runtime<T>(f: impl FnOnce(&Runtime) -> T) -> T {
    RUNTIME.with(|runtime| f(runtime))
}

impl Runtime {
    pub(crate) fn next_epoch(&self) -> Epoch {
        let epoch = self.epoch.get().next();
        self.epoch.set(epoch);
        epoch
    }

    pub(crate) fn create_concrete_signal(&self, value: Rc<RefCell<dyn Any>>) -> NodeId {
        self.nodes
            .borrow_mut()
            .insert(ReactiveNode::new(Some(value), ReactiveNodeType::Signal))
    }

    pub(crate) fn create_trigger_node(&self) -> NodeId {
        self.nodes
            .borrow_mut()
            .insert(ReactiveNode::new(None, ReactiveNodeType::Trigger))
    }

    pub(crate) fn create_concrete_memo(
        &self,
        value: Rc<RefCell<dyn Any>>,
        f: Rc<dyn AnyComputation>,
    ) -> NodeId {
        self.nodes.borrow_mut().insert(ReactiveNode::new(
            Some(value),
            ReactiveNodeType::Memo { f },
        ))
    }

    /// Inserts an effect node and links it as a dependency of the running
    /// subscriber, or of the current owner scope when nothing is tracking.
    /// The caller runs it afterwards.
    pub(crate) fn create_concrete_effect(
        &self,
        value: Rc<RefCell<dyn Any>>,
        f: Rc<dyn AnyComputation>,
    ) -> NodeId {
        let id = self.nodes.borrow_mut().insert(ReactiveNode::new(
            Some(value),
            ReactiveNodeType::Effect { f },
        ));
        if let Some(parent) = self.observer.get().or(self.owner_scope.get()) {
            self.link_dependency(id, parent);
        }
        id
    }

    pub(crate) fn create_scope_node(&self) -> NodeId {
        self.nodes
            .borrow_mut()
            .insert(ReactiveNode::new(None, ReactiveNodeType::Scope))
    }

    /// Pushes a dirty mark out from a node whose value just changed.
    pub(crate) fn mark_dirty(&self, id: NodeId) {
        let subs = {
            let nodes = self.nodes.borrow();
            nodes.get(id).and_then(|node| node.subs_head)
        };
        if let Some(head) = subs {
            self.propagate(head);
        }
    }

    /// Drains the notification queue unless a batch is open. Effects queued
    /// while draining are picked up by the same loop.
    pub(crate) fn run_effects(&self) {
        if self.batch_depth.get() > 0 {
            return;
        }
        while let Some(id) = self.queue_head.get() {
            let next = {
                let mut nodes = self.nodes.borrow_mut();
                match nodes.get_mut(id) {
                    Some(node) => {
                        node.queued = false;
                        node.queued_next.take()
                    }
                    None => None,
                }
            };
            match next {
                Some(next) => self.queue_head.set(Some(next)),
                None => {
                    self.queue_head.set(None);
                    self.queue_tail.set(None);
                }
            }
            self.notify(id);
        }
        #[cfg(debug_assertions)]
        self.debug_assert_consistent();
    }

    /// Unlinks a node from the notification queue if it is waiting there.
    pub(crate) fn remove_from_queue(
        &self,
        nodes: &mut SlotMap<NodeId, ReactiveNode>,
        id: NodeId,
    ) {
        let mut prev: Option<NodeId> = None;
        let mut cursor = self.queue_head.get();
        while let Some(current) = cursor {
            let next = nodes.get(current).and_then(|node| node.queued_next);
            if current == id {
                match prev {
                    Some(prev) => {
                        if let Some(prev) = nodes.get_mut(prev) {
                            prev.queued_next = next;
                        }
                    }
                    None => self.queue_head.set(next),
                }
                if self.queue_tail.get() == Some(id) {
                    self.queue_tail.set(prev);
                }
                if let Some(node) = nodes.get_mut(id) {
                    node.queued = false;
                    node.queued_next = None;
                }
                return;
            }
            prev = Some(current);
            cursor = next;
        }
    }

    /// Removes a node from the graph: its dependency links are cleared with
    /// the usual ownership cascade, it leaves the notification queue, and
    /// its slot is freed. Links from surviving subscribers are healed
    /// lazily the next time a wave passes them.
    pub(crate) fn dispose_node(&self, id: NodeId) {
        let (deps, queued) = {
            let mut nodes = self.nodes.borrow_mut();
            let Some(node) = nodes.get_mut(id) else {
                return;
            };
            let deps = node.deps_head.take();
            node.deps_tail = None;
            (deps, node.queued)
        };
        if let Some(head) = deps {
            self.clear_track(head);
        }
        {
            let mut nodes = self.nodes.borrow_mut();
            if queued {
                self.remove_from_queue(&mut nodes, id);
            }
            nodes.remove(id);
        }
        tracing::trace!("disposed reactive node {id:?}");
    }

    pub(crate) fn untrack<T>(&self, f: impl FnOnce() -> T) -> T {
        let prev_observer = self.observer.take();
        let value = f();
        self.observer.set(prev_observer);
        value
    }

    pub(crate) fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let value = {
            struct RestoreDepth<'a>(&'a Runtime);
            impl Drop for RestoreDepth<'_> {
                fn drop(&mut self) {
                    let depth = self.0.batch_depth.get();
                    debug_assert!(depth > 0);
                    self.0.batch_depth.set(depth - 1);
                }
            }
            let _restore = RestoreDepth(self);
            f()
        };
        self.run_effects();
        value
    }
}

/// Batches reactive updates: effect notifications raised inside `f` are
/// held until `f` returns, so an effect reading several of the values
/// written runs once rather than once per write.
///
/// ```
/// # use reactive_arena::*;
/// # use std::{cell::Cell, rc::Rc};
/// let (a, set_a) = create_signal(0);
/// let (b, set_b) = create_signal(0);
/// let runs = Rc::new(Cell::new(0));
/// create_effect({
///     let runs = Rc::clone(&runs);
///     move |_| {
///         a.get();
///         b.get();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
/// batch(move || {
///     set_a.set(1);
///     set_b.set(1);
/// });
/// assert_eq!(runs.get(), 2);
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_runtime(|runtime| runtime.batch(f))
}

/// Opens a batch without a closure. Every `start_batch` must be paired
/// with exactly one [`end_batch`]; prefer [`batch`] where the region is a
/// single block.
pub fn start_batch() {
    with_runtime(|runtime| {
        runtime.batch_depth.set(runtime.batch_depth.get() + 1);
    })
}

/// Closes a batch opened by [`start_batch`], draining held notifications
/// if this was the outermost one.
///
/// # Panics
/// Panics if no batch is open.
pub fn end_batch() {
    with_runtime(|runtime| {
        let depth = runtime.batch_depth.get();
        if depth == 0 {
            panic!("called `end_batch` without a matching `start_batch`");
        }
        runtime.batch_depth.set(depth - 1);
        runtime.run_effects();
    })
}

/// Runs `f` with dependency tracking paused: reads inside it do not
/// subscribe the running effect or memo.
///
/// ```
/// # use reactive_arena::*;
/// let (a, _) = create_signal(3);
/// create_effect(move |_| {
///     // this read does not make the effect depend on `a`
///     let value = untrack(move || a.get());
///     assert_eq!(value, 3);
/// });
/// ```
#[cfg_attr(debug_assertions, tracing::instrument(level = "trace", skip_all))]
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    with_runtime(|runtime| runtime.untrack(f))
}

/// The number of live dependency links in this thread's runtime.
#[doc(hidden)]
pub fn live_link_count() -> usize {
    with_runtime(|runtime| runtime.links.borrow().len())
}

/// The number of live nodes in this thread's runtime.
#[doc(hidden)]
pub fn live_node_count() -> usize {
    with_runtime(|runtime| runtime.nodes.borrow().len())
}
