//! # Guard Core
//!
//! Core domain types for the Privacy Guard de-identification pipeline.
//!
//! This crate provides the foundational types shared by every stage:
//! - BIO entity labels and entity types
//! - Risk categories and bounded risk weights
//! - Masking audit entries and the final masking result
//! - Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod label;
pub mod record;

pub use error::{GuardError, GuardResult};
pub use label::*;
pub use record::*;
