//! # Ports
//!
//! Outbound ports the cache drives. The inbound API is the
//! `SceneCacheManager` service itself.

pub mod outbound;
