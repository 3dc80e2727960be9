// src/config/mod.rs
pub mod river;

pub use river::{DriftConfig, HttpSettings, RiverConfig};
