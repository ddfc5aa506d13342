//! Service layer for business logic orchestration
//!
//! This module contains the service layer that orchestrates business logic,
//! separating concerns from the CLI layer in main.rs.

pub mod files;
pub mod replace;
pub mod scan;

pub use replace::{ReplaceRequest, ReplaceResult, ReplaceService, Target};
pub use scan::ScanService;
