//! Generic tag-based query cache.
//!
//! This module knows nothing about books. It provides:
//! - Cached reads keyed by a `QueryKey`, each key carrying a tag
//! - Request coalescing: overlapping reads of one key share a single request
//! - Invalidation by tag or by exact key, observed by subscribers
//! - Garbage collection of entries nobody has observed for a while

mod layer;
mod storage;
mod traits;

pub use layer::{QueryCache, Subscription, TypeMismatch};
pub use traits::{Invalidation, QueryKey, Watch};
