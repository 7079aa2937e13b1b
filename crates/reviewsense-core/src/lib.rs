//! reviewsense Core
//!
//! Types shared by the reviewsense crates.
//!
//! This crate provides:
//! - The error taxonomy of the model-loading and inference layer
//! - The prediction result handed to the web layer
//! - The status report rendered on the operational metrics page

pub mod error;
pub mod types;

pub use error::{Attempt, AttemptKind, Error, Result};
pub use types::{ArtifactInfo, Label, PredictionResult, ServiceStatus, StatusKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Label, PredictionResult, ServiceStatus, StatusKind};
}
