//! Kernel module - infrastructure traits and session dependencies.

pub mod deps;
pub mod memory_store;
pub mod test_dependencies;
pub mod traits;

pub use deps::SessionDeps;
pub use memory_store::MemoryStore;
pub use test_dependencies::{MockAuthProvider, TestDependencies};
pub use traits::*;
