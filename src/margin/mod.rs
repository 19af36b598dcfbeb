//! Leverage lookup: margin sources and the TTL cache in front of them.

mod cache;
mod source;

pub use cache::{MarginCache, DEFAULT_CACHE_TTL};
pub use source::MarginSource;
