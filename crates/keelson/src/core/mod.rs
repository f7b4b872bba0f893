//! Core building blocks shared by the parser and the render adapter
//!
//! Error taxonomy, scoped identifiers and option types, chumsky helpers, text
//! measurement and logging setup.

pub mod chumsky_utils;
mod error;
pub mod logging;
mod text;
mod types;

pub use error::*;
pub use logging::*;
pub use text::*;
pub use types::*;
