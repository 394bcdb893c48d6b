//! # Shared Bus - Typed Event Channel
//!
//! Every notification in the runtime (state changes, subsystem failures,
//! scene loads, sessions) is published here as a `RuntimeEvent` variant.
//!
//! ## Rules
//!
//! - Publishers never block: `publish` is synchronous and returns the number
//!   of receivers.
//! - Subscribers opt in with an `EventFilter`; there is no implicit global
//!   fan-out to components that did not subscribe.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Coordinator  │                    │ UI / Audio   │
//! │ Scene Cache  │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, EvictionReason, RuntimeEvent};
pub use publisher::{EventPublisher, InMemoryEventBus, NullPublisher};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
