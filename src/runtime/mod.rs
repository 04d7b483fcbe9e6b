//! Application lifecycle and execution modes
//!
//! - `lifetime`: startup (storage, services, background tasks) and shutdown
//! - `modes`: the HTTP server entry point

pub mod lifetime;
pub mod modes;
