pub mod aggregate;
pub mod compose;
pub mod core;
pub mod dataset;
pub mod layout;
pub mod views;

use std::fmt;

use crate::core::Axis;

/// Why an axis selection was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigurationKind {
    UnknownColumn,
    /// A categorical column was selected where a numeric measure is required.
    NotNumeric,
}

/// An axis selection that cannot be plotted against the dataset schema.
///
/// Fatal to the invocation that raised it; no partial scene is produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationError {
    pub axis: Axis,
    pub column: String,
    pub kind: ConfigurationKind,
}

impl ConfigurationError {
    pub fn unknown_column(axis: Axis, column: impl Into<String>) -> Self {
        Self {
            axis,
            column: column.into(),
            kind: ConfigurationKind::UnknownColumn,
        }
    }

    pub fn not_numeric(axis: Axis, column: impl Into<String>) -> Self {
        Self {
            axis,
            column: column.into(),
            kind: ConfigurationKind::NotNumeric,
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConfigurationKind::UnknownColumn => {
                write!(f, "unknown column `{}` selected for the {} axis", self.column, self.axis)
            }
            ConfigurationKind::NotNumeric => {
                write!(f, "column `{}` is not numeric and cannot be the {} axis", self.column, self.axis)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

pub type Result<T> = std::result::Result<T, error_stack::Report<ConfigurationError>>;

pub mod prelude {
    pub use crate::aggregate::*;
    pub use crate::compose::*;
    pub use crate::core::*;
    pub use crate::dataset::*;
    pub use crate::layout::*;
    pub use crate::views::*;
    pub use crate::{ConfigurationError, ConfigurationKind, Result};
}
