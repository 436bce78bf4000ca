//! Output formatters for scan reports.
//!
//! The pipeline produces an in-memory [`Report`](crate::duplicates::Report);
//! these formatters turn it into bytes:
//! - [`text`]: grouped, human-readable sections for the terminal
//! - [`json`]: a stable machine-readable schema for scripting

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextOutput;
