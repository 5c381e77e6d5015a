use crate::{
    node::{DirtyLevel, LinkId, NodeId, ReactiveNode, ReactiveNodeType, SubscriberState},
    runtime::Runtime,
    AnyComputation,
};
use slotmap::SlotMap;
use std::{any::Any, cell::RefCell, rc::Rc};

/// How far `resolve_maybe_dirty` recurses before switching to the
/// stack-based `check_dirty` walk.
const MAX_RECURSION_DEPTH: usize = 4;

/// What the `check_dirty` scan does with one dependency link.
enum DepStep {
    Skip,
    Descend(Option<LinkId>),
    Update,
}

/// Restores the previous observer and prunes stale dependencies when a
/// tracking pass ends, including by panic.
struct TrackGuard<'a> {
    runtime: &'a Runtime,
    id: NodeId,
    prev_observer: Option<NodeId>,
}

impl Drop for TrackGuard<'_> {
    fn drop(&mut self) {
        self.runtime.end_track(self.id, self.prev_observer);
    }
}

impl Runtime {
    /// Opens a tracking pass for `id`: the node becomes the observer, its
    /// dependency cursor rewinds, and a fresh epoch stamps the pass.
    pub(crate) fn start_track(&self, id: NodeId) -> Option<NodeId> {
        let epoch = self.next_epoch();
        {
            let mut nodes = self.nodes.borrow_mut();
            if let Some(node) = nodes.get_mut(id) {
                node.deps_tail = None;
                node.epoch = epoch;
                node.state = SubscriberState::Tracking {
                    raised: DirtyLevel::Clean,
                };
            }
        }
        self.observer.replace(Some(id))
    }

    /// Closes the tracking pass opened by [`Runtime::start_track`]. Any
    /// dependency links past the cursor were not re-read this pass and are
    /// cleared; marks raised against the node while it ran become its idle
    /// dirty level.
    pub(crate) fn end_track(&self, id: NodeId, prev_observer: Option<NodeId>) {
        self.observer.set(prev_observer);
        let stale = {
            let mut nodes = self.nodes.borrow_mut();
            let mut links = self.links.borrow_mut();
            let Some(node) = nodes.get_mut(id) else {
                return;
            };
            let stale = match node.deps_tail {
                Some(tail) => links
                    .get_mut(tail)
                    .and_then(|tail| tail.next_dep.take()),
                // the pass read nothing, so every old dependency is stale
                None => node.deps_head.take(),
            };
            if let SubscriberState::Tracking { raised } = node.state {
                node.state = SubscriberState::Idle(raised);
            }
            stale
        };
        if let Some(head) = stale {
            self.clear_track(head);
        }
    }

    /// Runs a node's computation inside a tracking pass and reports whether
    /// the stored value changed.
    pub(crate) fn run_computation(
        &self,
        id: NodeId,
        f: Rc<dyn AnyComputation>,
        value: Rc<RefCell<dyn Any>>,
    ) -> bool {
        let prev_observer = self.start_track(id);
        let _guard = TrackGuard {
            runtime: self,
            id,
            prev_observer,
        };
        f.run(value)
    }

    /// Recomputes a memo now, pushing a dirty mark to its subscribers if the
    /// value changed. Returns whether it changed.
    pub(crate) fn update_memo(&self, id: NodeId) -> bool {
        let memo = {
            let nodes = self.nodes.borrow();
            nodes.get(id).and_then(|node| match &node.node_type {
                ReactiveNodeType::Memo { f } => Some((Rc::clone(f), node.value())),
                _ => None,
            })
        };
        let Some((f, value)) = memo else {
            return false;
        };
        let changed = self.run_computation(id, f, value);
        if changed {
            let subs = {
                let nodes = self.nodes.borrow();
                nodes.get(id).and_then(|node| node.subs_head)
            };
            if let Some(head) = subs {
                self.propagate(head);
            }
        }
        changed
    }

    /// Runs an effect's body inside a tracking pass.
    pub(crate) fn run_effect_node(&self, id: NodeId) {
        let effect = {
            let nodes = self.nodes.borrow();
            nodes.get(id).and_then(|node| match &node.node_type {
                ReactiveNodeType::Effect { f } => Some((Rc::clone(f), node.value())),
                _ => None,
            })
        };
        let Some((f, value)) = effect else {
            return;
        };
        self.run_computation(id, f, value);
    }

    /// Walks the subscriber graph from one subscriber list, raising dirty
    /// levels and queueing any effect that has no subscribers of its own.
    ///
    /// Direct subscribers are marked `Dirty`; subscribers reached through a
    /// memo are marked `MaybeDirty` and subscribers reached through an
    /// effect `SideEffectsOnly`, each restored exactly when the walk climbs
    /// back out. A subscriber that is mid-pass takes the mark on its
    /// tracking state instead and is never queued; `can_propagate` buys it
    /// one more full notification on the next wave.
    pub(crate) fn propagate(&self, head: LinkId) {
        let mut nodes = self.nodes.borrow_mut();
        let mut links = self.links.borrow_mut();

        let mut current = Some(head);
        let mut dirty_level = DirtyLevel::Dirty;
        let mut stack: Vec<(LinkId, DirtyLevel)> = Vec::new();

        loop {
            let Some(link_id) = current else {
                let Some((parent_link, level)) = stack.pop() else {
                    break;
                };
                dirty_level = level;
                current = links.get(parent_link).and_then(|link| link.next_sub);
                continue;
            };
            let Some(link) = links.get(link_id).copied() else {
                current = None;
                continue;
            };
            let next = link.next_sub;
            let sub_id = link.sub;

            let Some(sub) = nodes.get_mut(sub_id) else {
                // the subscriber was disposed: drop the dead edge in passing
                tracing::trace!("dropped edge to disposed subscriber {sub_id:?}");
                Self::detach_sub_link(&mut nodes, &mut links, link_id);
                current = next;
                continue;
            };

            let is_current = link.epoch == sub.epoch;
            let mut queue_sub = false;
            let mut descend = None;

            match sub.state {
                SubscriberState::Idle(level) if is_current => {
                    let was_clean = level == DirtyLevel::Clean;
                    if level < dirty_level {
                        sub.state = SubscriberState::Idle(dirty_level);
                    }
                    if was_clean || sub.can_propagate {
                        if !was_clean {
                            sub.can_propagate = false;
                        }
                        if sub.subs_head.is_some() {
                            descend = sub.subs_head;
                        } else if sub.is_schedulable() {
                            queue_sub = true;
                        }
                    }
                }
                SubscriberState::Tracking { raised } if is_current => {
                    if raised < dirty_level {
                        sub.state = SubscriberState::Tracking {
                            raised: dirty_level,
                        };
                        if raised == DirtyLevel::Clean {
                            sub.can_propagate = true;
                            descend = sub.subs_head;
                        }
                    }
                }
                // a link from an abandoned pass: ignore it
                _ => {}
            }
            let schedulable = sub.is_schedulable();

            if let Some(child_head) = descend {
                stack.push((link_id, dirty_level));
                dirty_level = if schedulable {
                    DirtyLevel::SideEffectsOnly
                } else {
                    DirtyLevel::MaybeDirty
                };
                current = Some(child_head);
                continue;
            }
            if queue_sub {
                self.enqueue(&mut nodes, sub_id);
            }
            current = next;
        }
    }

    /// Appends a schedulable node to the notification queue unless it is
    /// already waiting there.
    fn enqueue(&self, nodes: &mut SlotMap<NodeId, ReactiveNode>, id: NodeId) {
        let Some(node) = nodes.get_mut(id) else {
            return;
        };
        if node.queued {
            return;
        }
        node.queued = true;
        node.queued_next = None;
        match self.queue_tail.replace(Some(id)) {
            Some(tail) => {
                if let Some(tail) = nodes.get_mut(tail) {
                    tail.queued_next = Some(id);
                }
            }
            None => self.queue_head.set(Some(id)),
        }
    }

    /// Decides whether a `MaybeDirty` subscriber actually has a changed
    /// dependency somewhere below it, recomputing memos along the way.
    ///
    /// This is the wide iterative form used once `resolve_maybe_dirty` has
    /// exhausted its recursion allowance: explicit frames instead of stack
    /// depth, one frame per nested memo under inspection.
    pub(crate) fn check_dirty(&self, head: Option<LinkId>) -> bool {
        let mut current = head;
        let mut stack: Vec<LinkId> = Vec::new();

        'scan: loop {
            let mut dirty = false;

            while let Some(link_id) = current {
                let link = {
                    let links = self.links.borrow();
                    match links.get(link_id) {
                        Some(link) => *link,
                        None => break,
                    }
                };
                let next = link.next_dep;
                let step = {
                    let nodes = self.nodes.borrow();
                    match nodes.get(link.dep) {
                        Some(dep) if matches!(dep.node_type, ReactiveNodeType::Memo { .. }) => {
                            match dep.state {
                                SubscriberState::Idle(DirtyLevel::MaybeDirty) => {
                                    DepStep::Descend(dep.deps_head)
                                }
                                SubscriberState::Idle(DirtyLevel::Dirty) => DepStep::Update,
                                _ => DepStep::Skip,
                            }
                        }
                        _ => DepStep::Skip,
                    }
                };
                match step {
                    DepStep::Skip => current = next,
                    DepStep::Descend(child) => {
                        stack.push(link_id);
                        current = child;
                    }
                    DepStep::Update => {
                        if self.update_memo(link.dep) {
                            dirty = true;
                            break;
                        }
                        current = next;
                    }
                }
            }

            // climb back through the memos whose chains are settled
            loop {
                let Some(parent_link_id) = stack.pop() else {
                    return dirty;
                };
                let parent_link = {
                    let links = self.links.borrow();
                    match links.get(parent_link_id) {
                        Some(link) => *link,
                        None => return dirty,
                    }
                };
                let owner = parent_link.dep;
                if dirty {
                    if self.update_memo(owner) {
                        // the change re-marked everything above; stay dirty
                        continue;
                    }
                } else {
                    self.mark_clean(owner);
                }
                current = parent_link.next_dep;
                if current.is_some() {
                    continue 'scan;
                }
                dirty = false;
            }
        }
    }

    /// Settles a `MaybeDirty` subscriber by confirming or recomputing the
    /// memos it depends on, recursively up to [`MAX_RECURSION_DEPTH`] deep.
    ///
    /// If a recomputed dependency changed, the resulting propagation marks
    /// this subscriber `Dirty` and the walk stops early. A subscriber whose
    /// dependencies all settle unchanged comes out `Clean`.
    pub(crate) fn resolve_maybe_dirty(&self, id: NodeId, depth: usize) {
        let mut current = {
            let nodes = self.nodes.borrow();
            match nodes.get(id) {
                Some(node) => node.deps_head,
                None => return,
            }
        };
        while let Some(link_id) = current {
            let link = {
                let links = self.links.borrow();
                match links.get(link_id) {
                    Some(link) => *link,
                    None => break,
                }
            };
            current = link.next_dep;

            let dep_id = link.dep;
            let dep = {
                let nodes = self.nodes.borrow();
                nodes.get(dep_id).and_then(|dep| {
                    matches!(dep.node_type, ReactiveNodeType::Memo { .. })
                        .then(|| (dep.idle_level(), dep.deps_head))
                })
            };
            let Some((dep_level, dep_deps)) = dep else {
                continue;
            };
            match dep_level {
                DirtyLevel::MaybeDirty => {
                    if depth < MAX_RECURSION_DEPTH {
                        self.resolve_maybe_dirty(dep_id, depth + 1);
                    } else if !self.check_dirty(dep_deps) {
                        self.mark_clean(dep_id);
                    }
                    if self.current_level(dep_id) == DirtyLevel::Dirty {
                        self.update_memo(dep_id);
                    }
                }
                DirtyLevel::Dirty => {
                    self.update_memo(dep_id);
                }
                _ => {}
            }
            // a changed dependency propagates straight back to us
            if self.current_level(id) == DirtyLevel::Dirty {
                break;
            }
        }
        let mut nodes = self.nodes.borrow_mut();
        if let Some(node) = nodes.get_mut(id) {
            if node.state == SubscriberState::Idle(DirtyLevel::MaybeDirty) {
                node.state = SubscriberState::Idle(DirtyLevel::Clean);
            }
        }
    }

    /// Brings a memo up to date before a read: settles a `MaybeDirty` mark
    /// and recomputes if the memo turns out `Dirty`.
    ///
    /// Panics if the memo is currently computing, which means its own body
    /// read it back.
    pub(crate) fn update_if_necessary(&self, id: NodeId) {
        let level = {
            let nodes = self.nodes.borrow();
            match nodes.get(id) {
                Some(node) => match node.state {
                    SubscriberState::Tracking { .. } => {
                        panic!("cycle detected: tried to read a memo during its own computation")
                    }
                    SubscriberState::Idle(level) => level,
                },
                None => return,
            }
        };
        match level {
            DirtyLevel::MaybeDirty => {
                self.resolve_maybe_dirty(id, 0);
                if self.current_level(id) == DirtyLevel::Dirty {
                    self.update_memo(id);
                }
            }
            DirtyLevel::Dirty => {
                self.update_memo(id);
            }
            _ => {}
        }
    }

    /// Delivers one queued notification.
    ///
    /// `SideEffectsOnly` means the node itself saw no dependency change and
    /// only relays to the effects it owns. Otherwise an effect settles any
    /// `MaybeDirty` mark and either re-runs or relays.
    pub(crate) fn notify(&self, id: NodeId) {
        let target = {
            let nodes = self.nodes.borrow();
            match nodes.get(id) {
                Some(node) => {
                    let is_effect = matches!(node.node_type, ReactiveNodeType::Effect { .. });
                    if !is_effect && !matches!(node.node_type, ReactiveNodeType::Scope) {
                        return;
                    }
                    match node.state {
                        SubscriberState::Idle(level) => (is_effect, level),
                        SubscriberState::Tracking { .. } => return,
                    }
                }
                None => return,
            }
        };
        match target {
            (_, DirtyLevel::SideEffectsOnly) => {
                self.mark_clean(id);
                self.run_inner_effects(id);
            }
            // scopes never take a dirty mark of their own
            (false, _) => {}
            (true, level) => {
                if level == DirtyLevel::MaybeDirty {
                    self.resolve_maybe_dirty(id, 0);
                }
                if self.current_level(id) == DirtyLevel::Dirty {
                    self.run_effect_node(id);
                } else {
                    self.run_inner_effects(id);
                }
            }
        }
    }

    /// Notifies every schedulable node among `id`'s dependencies, in
    /// dependency order. Effects created inside a subscriber's body are its
    /// dependencies, so this is how a notification reaches them.
    pub(crate) fn run_inner_effects(&self, id: NodeId) {
        let mut inner = Vec::new();
        {
            let nodes = self.nodes.borrow();
            let links = self.links.borrow();
            let mut current = nodes.get(id).and_then(|node| node.deps_head);
            while let Some(link_id) = current {
                let Some(link) = links.get(link_id) else {
                    break;
                };
                if let Some(dep) = nodes.get(link.dep) {
                    if dep.is_schedulable() {
                        inner.push(link.dep);
                    }
                }
                current = link.next_dep;
            }
        }
        for dep in inner {
            self.notify(dep);
        }
    }

    /// The node's idle dirty level, `Clean` if it no longer exists.
    pub(crate) fn current_level(&self, id: NodeId) -> DirtyLevel {
        let nodes = self.nodes.borrow();
        match nodes.get(id) {
            Some(node) => node.idle_level(),
            None => DirtyLevel::Clean,
        }
    }

    /// Lowers an idle node back to `Clean`.
    pub(crate) fn mark_clean(&self, id: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(node) = nodes.get_mut(id) {
            if let SubscriberState::Idle(_) = node.state {
                node.state = SubscriberState::Idle(DirtyLevel::Clean);
            }
        }
    }
}
