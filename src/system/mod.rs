//! System-level modules
//!
//! Process setup that sits outside the shortening domain.

pub mod logging;

pub use logging::init_logging;
