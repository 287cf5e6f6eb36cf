//! Shared utilities for gaitstore
//!
//! Hashing, atomic file writes, XDG path resolution and tracing setup used
//! by every other crate in the workspace.

pub mod atomic_file;
pub mod hashing;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use hashing::*;
pub use xdg::*;
