//! Common utilities and types shared across the mesh health components.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
