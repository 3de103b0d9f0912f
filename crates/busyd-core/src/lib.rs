//! Core library for busyd: the visibility debounce engine plus the config and
//! IPC types shared by the daemon and its clients.

pub mod config;
pub mod engine;
pub mod error;
pub mod ipc;

pub use config::{Config, TimingConfig};
pub use engine::{EngineState, Timing, VisibilityEngine};
pub use error::EngineError;
