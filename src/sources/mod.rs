//! Target sources.
//!
//! Remote targets are cloned with git into the cache directory; local
//! targets are read in place. The loader walks descriptors from the root.

pub mod cache;
pub mod git;
pub mod loader;

pub use cache::FetchCache;
pub use git::GitFetcher;
pub use loader::{DescriptorLoader, LoadedProject};
