// ============================================================================
// Utilities Module
// Helper functions for embedding the engine in a process
// ============================================================================

mod logging;

pub use logging::parse_level;

#[cfg(feature = "logging")]
pub use logging::init_logging;
