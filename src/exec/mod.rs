//! Execution layer: atomic filesystem primitives, backups, disk checks and
//! the transactional batch engine built on top of them.

pub mod atomic;
pub mod backup;
pub mod copy;
pub mod disk;
pub mod engine;
pub mod meta;

pub use engine::ExecutionEngine;
