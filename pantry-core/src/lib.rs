//! Pantry Core - Fundamental types
//!
//! This crate provides the core types used throughout Pantry:
//! - `CookerPath` / `OutputPath`: identifiers for cookers and their outputs
//! - `Value`: dynamically typed cooker outputs
//! - `PantryError`: structured errors, plus the tagged `PathError` and `QueryError`

mod error;
mod path;
mod value;

pub use error::{codes, ErrorContext, PantryError, PathError, QueryError, Severity};
pub use path::{
    CookerId, CookerPath, DataProcessorId, OutputName, OutputPath, SourceId, OUTPUT_SEPARATOR,
    SOURCE_SEPARATOR,
};
pub use value::{FromValue, Value};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::{
        CookerId, CookerPath, DataProcessorId, FromValue, OutputName, OutputPath, PantryError,
        QueryError, Severity, SourceId, Value,
    };
}
