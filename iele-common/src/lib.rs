//! IELE IR - Common Types and Utilities
//!
//! This crate contains the error taxonomy shared by the IR data model
//! and the optimization passes built on top of it.

pub mod error;

pub use error::{ErrorKind, IrError, IrResult};
