use crate::AnyComputation;
use std::{any::Any, cell::RefCell, rc::Rc};

slotmap::new_key_type! {
    /// Unique ID assigned to a node in the reactive graph.
    pub struct NodeId;
}

slotmap::new_key_type! {
    /// Unique ID assigned to an edge between two nodes.
    pub struct LinkId;
}

/// Identifier of one tracking pass. Each re-run of a subscriber gets a
/// fresh epoch, and links stamped with an older epoch are ignored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

/// How stale a subscriber is relative to its dependencies.
///
/// The ordering matters: marks only ever raise the level, and resolution
/// lowers it back to `Clean`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum DirtyLevel {
    Clean,

    /// Nothing this subscriber depends on changed, but an effect somewhere
    /// below it needs to run.
    SideEffectsOnly,

    /// A transitive dependency may have changed; requires confirmation
    /// before recomputing.
    MaybeDirty,

    /// A direct dependency definitely changed.
    Dirty,
}

/// Whether a subscriber is idle or mid-way through a tracking pass.
///
/// While tracking, marks arriving from its own writes accumulate in
/// `raised` and become the idle level when the pass ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SubscriberState {
    Idle(DirtyLevel),
    Tracking { raised: DirtyLevel },
}

pub(crate) struct ReactiveNode {
    pub value: Option<Rc<RefCell<dyn Any>>>,
    pub node_type: ReactiveNodeType,

    // dependency half: who subscribes to this node
    pub subs_head: Option<LinkId>,
    pub subs_tail: Option<LinkId>,
    /// Pass that last read this node, deduplicating repeated reads.
    pub last_tracked: Epoch,

    // subscriber half: what this node depends on
    pub deps_head: Option<LinkId>,
    /// Tail of the dependency list. During a tracking pass this is the
    /// diff cursor instead, trailing one link behind the next candidate.
    pub deps_tail: Option<LinkId>,
    /// Pass id of this subscriber's most recent tracking run.
    pub epoch: Epoch,
    pub state: SubscriberState,
    /// Grants one extra descent or scheduling on the next propagation,
    /// set when a mark lands while the subscriber is mid-run.
    pub can_propagate: bool,

    // scheduler half
    pub queued: bool,
    pub queued_next: Option<NodeId>,
}

impl ReactiveNode {
    pub fn new(value: Option<Rc<RefCell<dyn Any>>>, node_type: ReactiveNodeType) -> Self {
        let state = match node_type {
            // memos and effects start stale so their first use runs them
            ReactiveNodeType::Memo { .. } | ReactiveNodeType::Effect { .. } => {
                SubscriberState::Idle(DirtyLevel::Dirty)
            }
            _ => SubscriberState::Idle(DirtyLevel::Clean),
        };
        Self {
            value,
            node_type,
            subs_head: None,
            subs_tail: None,
            last_tracked: Epoch::default(),
            deps_head: None,
            deps_tail: None,
            epoch: Epoch::default(),
            state,
            can_propagate: false,
            queued: false,
            queued_next: None,
        }
    }

    pub fn value(&self) -> Rc<RefCell<dyn Any>> {
        self.value
            .clone()
            .expect("ReactiveNode.value to have a value")
    }

    /// Nodes that also play the subscriber role and may own dependencies.
    pub fn is_subscriber_kind(&self) -> bool {
        matches!(
            self.node_type,
            ReactiveNodeType::Memo { .. }
                | ReactiveNodeType::Effect { .. }
                | ReactiveNodeType::Scope
        )
    }

    /// Nodes the scheduler queues and notifies, rather than recomputing
    /// on demand.
    pub fn is_schedulable(&self) -> bool {
        matches!(
            self.node_type,
            ReactiveNodeType::Effect { .. } | ReactiveNodeType::Scope
        )
    }

    pub fn idle_level(&self) -> DirtyLevel {
        match self.state {
            SubscriberState::Idle(level) => level,
            SubscriberState::Tracking { raised } => raised,
        }
    }
}

#[derive(Clone)]
pub(crate) enum ReactiveNodeType {
    Trigger,
    Signal,
    Memo { f: Rc<dyn AnyComputation> },
    Effect { f: Rc<dyn AnyComputation> },
    Scope,
}

/// One edge in the graph: `sub` depends on `dep`.
///
/// A link sits on two chains at once. Within the dependency it occupies a
/// doubly-linked position in the subscriber list (`prev_sub`/`next_sub`);
/// within the subscriber it occupies a singly-linked position in the
/// dependency list (`next_dep`), whose order is the order of reads.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Link {
    pub dep: NodeId,
    pub sub: NodeId,
    /// Pass in which this edge was created or last confirmed.
    pub epoch: Epoch,
    pub prev_sub: Option<LinkId>,
    pub next_sub: Option<LinkId>,
    pub next_dep: Option<LinkId>,
}
