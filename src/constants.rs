use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Seconds a `/health` report is served from cache.
pub const HEALTH_CACHE_SECONDS: i64 = 5;
