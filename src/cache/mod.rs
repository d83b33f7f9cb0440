//! Local cache for API responses
//!
//! Process-local, in-memory, never written to disk. Used for lookups that
//! many provisioning steps repeat (the project list in particular).

pub mod key;
pub mod storage;

use std::time::Duration;

/// Cache TTL configuration per data type
pub struct CacheTtl;

impl CacheTtl {
    pub const PROJECTS: Duration = Duration::from_secs(15 * 60); // 15 min
}

pub use key::cache_key;
pub use storage::{Clock, SystemClock, TtlCache};
