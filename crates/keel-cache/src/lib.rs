//! keel-cache — a small key/value cache with per-entry expiration.
//!
//! Used in front of reads that are expensive to recompute (host probes,
//! aggregate metrics). There is no background sweeper: expired entries are
//! dropped lazily on `get`, or in bulk by whoever calls
//! [`TtlCache::cleanup_expired`].

pub mod ttl;

pub use ttl::{DEFAULT_TTL, TtlCache};
