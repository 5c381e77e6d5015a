//! A fine-grained reactive graph for single-threaded Rust programs.
//!
//! State lives in [signals](create_signal), derived values in
//! [memos](create_memo), and side effects in [effects](create_effect).
//! Reads made while an effect or memo runs are tracked automatically, so
//! the dependency graph always mirrors the last thing each computation
//! actually did, including branches that read different values on
//! different runs.
//!
//! Updates are push-pull. A write pushes only a cheap staleness mark
//! through its subscribers and queues the effects at the edges of the
//! graph; values recompute lazily, when something reads them. A memo
//! whose dependencies settle back to their old values never recomputes,
//! and a memo whose recomputation produces an equal value never wakes its
//! subscribers.
//!
//! ```
//! use reactive_arena::*;
//! use std::{cell::RefCell, rc::Rc};
//!
//! let (count, set_count) = create_signal(1);
//! let double = create_memo(move |_| count.get() * 2);
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! create_effect({
//!     let log = Rc::clone(&log);
//!     move |_| log.borrow_mut().push(double.get())
//! });
//! assert_eq!(*log.borrow(), [2]);
//!
//! set_count.set(2);
//! assert_eq!(*log.borrow(), [2, 4]);
//!
//! // a write that changes nothing notifies no one
//! set_count.set(2);
//! assert_eq!(*log.borrow(), [2, 4]);
//! ```
//!
//! The whole graph for a thread lives in two arenas, one of nodes and one
//! of dependency links, and every handle is a cheap `Copy` key into them.
//! Handles stay valid after their node is disposed; the plain accessors
//! panic at that point and the `try_` accessors report it instead.

mod diagnostics;
mod effect;
mod graph;
mod link;
mod memo;
mod node;
mod runtime;
mod scope;
mod signal;
mod trigger;

pub use diagnostics::*;
pub use effect::*;
pub use memo::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
pub use trigger::*;
