use thiserror::Error;

/// Errors returned by the fallible (`try_`) reactive accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// The node behind this handle has been disposed.
    #[error("tried to access a reactive node that has been disposed")]
    Disposed,
}

#[cfg(debug_assertions)]
mod consistency {
    use crate::{
        node::{LinkId, NodeId},
        runtime::Runtime,
    };
    use rustc_hash::FxHashSet;

    impl Runtime {
        /// Cross-checks the doubly linked subscriber lists, the dependency
        /// chains, and the notification queue after a drain. Costs a full
        /// arena walk, so debug builds only.
        pub(crate) fn debug_assert_consistent(&self) {
            let nodes = self.nodes.borrow();
            let links = self.links.borrow();

            let mut seen_subs: FxHashSet<LinkId> = FxHashSet::default();
            let mut seen_deps: FxHashSet<LinkId> = FxHashSet::default();
            for (id, node) in nodes.iter() {
                let mut prev = None;
                let mut last = None;
                let mut cursor = node.subs_head;
                while let Some(link_id) = cursor {
                    assert!(
                        seen_subs.insert(link_id),
                        "link in two subscriber lists: {link_id:?}"
                    );
                    let link = links
                        .get(link_id)
                        .expect("subscriber list points at a freed link");
                    assert_eq!(link.dep, id, "subscriber link on the wrong dependency");
                    assert_eq!(link.prev_sub, prev, "broken subscriber back pointer");
                    prev = Some(link_id);
                    last = Some(link_id);
                    cursor = link.next_sub;
                }
                assert_eq!(node.subs_tail, last, "subscriber tail out of sync");

                let mut cursor = node.deps_head;
                while let Some(link_id) = cursor {
                    assert!(
                        seen_deps.insert(link_id),
                        "link in two dependency chains: {link_id:?}"
                    );
                    let link = links
                        .get(link_id)
                        .expect("dependency chain points at a freed link");
                    assert_eq!(link.sub, id, "dependency link on the wrong subscriber");
                    cursor = link.next_dep;
                }
            }

            let mut queued: FxHashSet<NodeId> = FxHashSet::default();
            let mut cursor = self.queue_head.get();
            while let Some(id) = cursor {
                assert!(queued.insert(id), "node queued twice: {id:?}");
                let node = nodes.get(id).expect("queue points at a freed node");
                assert!(node.queued, "queued node not flagged");
                cursor = node.queued_next;
            }
            for (id, node) in nodes.iter() {
                assert_eq!(
                    node.queued,
                    queued.contains(&id),
                    "queue flag out of sync for {id:?}"
                );
            }
        }
    }
}
