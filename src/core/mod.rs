//! Core types shared by every docrestore module.
//!
//! - [`error`] - the [`RestoreError`] enum and user-facing [`ErrorContext`]
//! - [`source_info`] - [`SourceInfo`], the logical location attached to diagnostics

pub mod error;
pub mod source_info;

pub use error::{ErrorContext, RestoreError, user_friendly_error};
pub use source_info::SourceInfo;
