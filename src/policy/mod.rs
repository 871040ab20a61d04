//! Authorization and leave lifecycle rules. Nothing in here performs I/O.

pub mod content;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod identity;
pub mod lifecycle;
