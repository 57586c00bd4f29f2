pub mod store;

pub use store::{
    parse_timestamp, CacheRecord, CacheStore, Resolution, DEFAULT_CACHE_TTL_HOURS,
};
