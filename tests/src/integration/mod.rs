//! # Integration Scenarios
//!
//! Every scenario drives a real `AppRuntime` on a `ManualClock`, with
//! scripted subsystems and the staged scene provider.

pub mod boot;
pub mod fixtures;
pub mod recovery;
pub mod scene_flow;
pub mod sessions;
pub mod transitions;
