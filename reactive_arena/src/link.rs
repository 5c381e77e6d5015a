use crate::{
    node::{DirtyLevel, Link, LinkId, NodeId, ReactiveNode, SubscriberState},
    runtime::Runtime,
};
use slotmap::SlotMap;

impl NodeId {
    /// Registers the running subscriber, if any, as depending on this node.
    ///
    /// Repeated reads within one tracking pass are collapsed to a single
    /// link by the per-pass stamp on the dependency.
    pub(crate) fn subscribe(self, runtime: &Runtime) {
        let Some(observer) = runtime.observer.get() else {
            return;
        };
        if observer == self {
            return;
        }
        let fresh = {
            let mut nodes = runtime.nodes.borrow_mut();
            let Some(pass) = nodes.get(observer).map(|observer| {
                debug_assert!(matches!(
                    observer.state,
                    SubscriberState::Tracking { .. }
                ));
                observer.epoch
            }) else {
                return;
            };
            match nodes.get_mut(self) {
                Some(dep) if dep.last_tracked != pass => {
                    dep.last_tracked = pass;
                    true
                }
                _ => false,
            }
        };
        if fresh {
            runtime.link_dependency(self, observer);
        }
    }
}

impl Runtime {
    /// Records `sub` as depending on `dep`, reusing the link from the
    /// previous pass when the next dependency read is the same one.
    pub(crate) fn link_dependency(&self, dep_id: NodeId, sub_id: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let mut links = self.links.borrow_mut();

        let Some(sub) = nodes.get(sub_id) else {
            return;
        };
        let epoch = sub.epoch;
        let cursor = sub.deps_tail;
        let candidate = match cursor {
            Some(tail) => links.get(tail).and_then(|tail| tail.next_dep),
            None => sub.deps_head,
        };

        // same dependency as last pass at this position: restamp in place
        if let Some(old_id) = candidate {
            if links.get(old_id).map(|old| old.dep) == Some(dep_id) {
                if let Some(old) = links.get_mut(old_id) {
                    old.epoch = epoch;
                }
                if let Some(sub) = nodes.get_mut(sub_id) {
                    sub.deps_tail = Some(old_id);
                }
                return;
            }
        }

        let link_id = links.insert(Link {
            dep: dep_id,
            sub: sub_id,
            epoch,
            prev_sub: None,
            next_sub: None,
            next_dep: candidate,
        });

        // splice into the subscriber's dependency list at the cursor
        if let Some(sub) = nodes.get_mut(sub_id) {
            match cursor {
                Some(tail) => {
                    if let Some(tail) = links.get_mut(tail) {
                        tail.next_dep = Some(link_id);
                    }
                }
                None => sub.deps_head = Some(link_id),
            }
            sub.deps_tail = Some(link_id);
        }

        // append to the dependency's subscriber list
        if let Some(dep) = nodes.get_mut(dep_id) {
            let old_tail = dep.subs_tail;
            dep.subs_tail = Some(link_id);
            match old_tail {
                Some(old_tail_id) => {
                    if let Some(old_tail) = links.get_mut(old_tail_id) {
                        old_tail.next_sub = Some(link_id);
                    }
                    if let Some(link) = links.get_mut(link_id) {
                        link.prev_sub = Some(old_tail_id);
                    }
                }
                None => dep.subs_head = Some(link_id),
            }
        }
    }

    /// Removes a link from its dependency's subscriber list and frees its
    /// slot, returning the record for the caller to continue with.
    pub(crate) fn detach_sub_link(
        nodes: &mut SlotMap<NodeId, ReactiveNode>,
        links: &mut SlotMap<LinkId, Link>,
        link_id: LinkId,
    ) -> Option<Link> {
        let link = links.remove(link_id)?;
        if let Some(dep) = nodes.get_mut(link.dep) {
            match link.next_sub {
                Some(next) => {
                    if let Some(next) = links.get_mut(next) {
                        next.prev_sub = link.prev_sub;
                    }
                }
                None => dep.subs_tail = link.prev_sub,
            }
            match link.prev_sub {
                Some(prev) => {
                    if let Some(prev) = links.get_mut(prev) {
                        prev.next_sub = link.next_sub;
                    }
                }
                None => dep.subs_head = link.next_sub,
            }
        }
        Some(link)
    }

    /// Unlinks an entire run of dependency links, cascading into any
    /// dependency that loses its last subscriber along the way.
    ///
    /// A detached memo is reset to recompute from scratch if a handle
    /// revives it later; a detached effect or scope is owned by whichever
    /// subscriber just dropped it, so it is retired outright.
    pub(crate) fn clear_track(&self, head: LinkId) {
        let mut nodes = self.nodes.borrow_mut();
        let mut links = self.links.borrow_mut();

        let mut stack: Vec<Option<LinkId>> = Vec::new();
        let mut current = Some(head);
        loop {
            let Some(link_id) = current else {
                match stack.pop() {
                    Some(resume) => {
                        current = resume;
                        continue;
                    }
                    None => break,
                }
            };
            let Some(link) = Self::detach_sub_link(&mut nodes, &mut links, link_id) else {
                current = None;
                continue;
            };
            current = link.next_dep;

            let dep_id = link.dep;
            let (retire, queued, own_deps) = {
                let Some(dep) = nodes.get_mut(dep_id) else {
                    continue;
                };
                if dep.subs_head.is_some() || !dep.is_subscriber_kind() {
                    continue;
                }
                let own_deps = dep.deps_head.take();
                dep.deps_tail = None;
                if dep.is_schedulable() {
                    (true, dep.queued, own_deps)
                } else {
                    dep.state = SubscriberState::Idle(DirtyLevel::Dirty);
                    (false, false, own_deps)
                }
            };
            if retire {
                if queued {
                    self.remove_from_queue(&mut nodes, dep_id);
                }
                nodes.remove(dep_id);
            }
            if let Some(dep_head) = own_deps {
                stack.push(current);
                current = Some(dep_head);
            }
        }
    }
}
