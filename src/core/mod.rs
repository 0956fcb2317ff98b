pub mod compose;
pub mod config;
pub mod document;
pub mod error;
pub mod types;

pub use compose::{compose, render, ComposeContext, DevOverride, OptionalServices};
pub use config::{ConfigLoader, GisquickConfig};
pub use document::{Document, KeyedList, Scalar};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use types::*;
