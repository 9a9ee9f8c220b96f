//! CricDB Common Library
//!
//! Shared error types and logging setup for the CricDB workspace:
//!
//! - **Error Handling**: the pipeline-wide error taxonomy and result alias
//! - **Logging**: tracing subscriber configuration shared by every binary

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{IngestError, Result};
