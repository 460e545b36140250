//! Relationship facts and role-based rules
//!
//! A small in-memory fact store (parent/child edges, gender marks, role
//! grants) plus a dispatcher that exposes it over the wire as `rule`
//! messages layered on top of any other dispatcher.

pub mod dispatcher;
pub mod store;

pub use dispatcher::RuleDispatcher;
pub use store::{closure_from_edges, RuleStore};
