//! System-level modules
//!
//! - Logging initialization
//! - Panic hook (routes panics into the tracing pipeline)

pub mod logging;
pub mod panic_handler;

pub use logging::init_logging;
