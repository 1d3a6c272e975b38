//! Link/record registry
//!
//! # Components
//!
//! - `Registry`: the operations the pipeline needs from the persistent store
//! - `DirectusRegistry`: Directus REST + GraphQL implementation
//! - `MemoryRegistry`: in-process implementation for tests and dry runs
//! - `wire`: JSON payloads exchanged with Directus

mod directus;
mod memory;
mod traits;
pub mod wire;

pub use directus::DirectusRegistry;
pub use memory::{MemoryRegistry, StoredImage, StoredLink};
pub use traits::{Registry, RegistryError, RegistryResult};
