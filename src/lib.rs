// lib.rs
#![warn(clippy::large_futures)]

pub use std::sync::Arc;

pub use anyhow::bail;
pub use log::*;
pub use serde::{Deserialize, Serialize};
pub use tokio::{
    sync::RwLock,
    time::{sleep, Duration},
};

mod config;
pub use config::*;

mod convert;
pub use convert::*;

mod dht;
pub use dht::*;

mod measure;
pub use measure::*;

mod state;
pub use state::*;

mod collector;
pub use collector::*;

mod wifi;
pub use wifi::*;

mod mqtt;
pub use mqtt::*;

mod link;
pub use link::*;

#[cfg(target_os = "espidf")]
pub mod esp;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

// EOF
