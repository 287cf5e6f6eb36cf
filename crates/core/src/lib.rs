//! Core domain types, errors, and constants for `gaitstore`.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate
//!   in the workspace, plus constructor helpers.
//! - **`types`**: pose observation types consumed from the estimation
//!   pipeline and the `(dataset, sequence)` natural key.
//! - **`constants`**: file names, defaults and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    types::*,
};
