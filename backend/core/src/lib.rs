//! `plugsmith-core`: error taxonomy and result shapes for Plugsmith.
//!
//! Every public operation in the workspace reports its outcome through one of
//! the result types defined here instead of propagating a fault past its own
//! boundary.

pub mod error;
pub mod result;

pub use error::{ErrorKind, PluginError};
pub use result::ScaffoldResult;
