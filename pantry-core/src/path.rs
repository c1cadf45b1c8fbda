//! Path identifiers
//!
//! A `CookerPath` names a cooker, either scoped to one source or composite.
//! An `OutputPath` names one output of a cooker. String forms are
//! `source/cooker`, `cooker` and `<cooker path>:<output>`.

use crate::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between source and cooker identifiers
pub const SOURCE_SEPARATOR: char = '/';
/// Separator between a cooker path and an output name
pub const OUTPUT_SEPARATOR: char = ':';

fn validate(kind: &'static str, value: &str) -> Result<(), PathError> {
    if value.is_empty() {
        return Err(PathError::Empty { kind });
    }
    if value.trim() != value {
        return Err(PathError::Whitespace { kind, value: value.to_string() });
    }
    if let Some(ch) = value
        .chars()
        .find(|c| *c == SOURCE_SEPARATOR || *c == OUTPUT_SEPARATOR || c.is_control())
    {
        return Err(PathError::ReservedChar { kind, value: value.to_string(), ch });
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, PathError> {
                let value = value.into();
                validate($kind, &value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = PathError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = PathError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

identifier!(
    /// Identity of a source parser
    SourceId, "source id"
);
identifier!(
    /// Local identifier of a cooker
    CookerId, "cooker id"
);
identifier!(
    /// Name of one output exposed by a cooker
    OutputName, "output name"
);
identifier!(
    /// Identifier of a data processor a table may require
    DataProcessorId, "data processor id"
);

/// Identifies a cooker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CookerPath {
    /// Consumes raw records of one source
    Source { source: SourceId, cooker: CookerId },
    /// Source-independent; derives from other cookers
    Composite { cooker: CookerId },
}

impl CookerPath {
    pub fn source(
        source: impl Into<String>,
        cooker: impl Into<String>,
    ) -> Result<Self, PathError> {
        Ok(CookerPath::Source {
            source: SourceId::new(source)?,
            cooker: CookerId::new(cooker)?,
        })
    }

    pub fn composite(cooker: impl Into<String>) -> Result<Self, PathError> {
        Ok(CookerPath::Composite { cooker: CookerId::new(cooker)? })
    }

    pub fn for_source(source: &SourceId, cooker: CookerId) -> Self {
        CookerPath::Source { source: source.clone(), cooker }
    }

    /// Parse `source/cooker` or `cooker`
    pub fn parse(s: &str) -> Result<Self, PathError> {
        match s.split_once(SOURCE_SEPARATOR) {
            Some((source, cooker)) => {
                if cooker.contains(SOURCE_SEPARATOR) {
                    return Err(PathError::Malformed { kind: "cooker path", value: s.to_string() });
                }
                Self::source(source, cooker)
            }
            None => Self::composite(s),
        }
    }

    pub fn source_id(&self) -> Option<&SourceId> {
        match self {
            CookerPath::Source { source, .. } => Some(source),
            CookerPath::Composite { .. } => None,
        }
    }

    pub fn cooker_id(&self) -> &CookerId {
        match self {
            CookerPath::Source { cooker, .. } | CookerPath::Composite { cooker } => cooker,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, CookerPath::Composite { .. })
    }

    pub fn belongs_to(&self, source: &SourceId) -> bool {
        self.source_id() == Some(source)
    }

    /// Path of one of this cooker's outputs
    pub fn output(&self, name: impl Into<String>) -> Result<OutputPath, PathError> {
        Ok(OutputPath::new(self.clone(), OutputName::new(name)?))
    }
}

impl fmt::Display for CookerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookerPath::Source { source, cooker } => {
                write!(f, "{}{}{}", source, SOURCE_SEPARATOR, cooker)
            }
            CookerPath::Composite { cooker } => write!(f, "{}", cooker),
        }
    }
}

impl FromStr for CookerPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CookerPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CookerPath> for String {
    fn from(path: CookerPath) -> String {
        path.to_string()
    }
}

/// Identifies one named output of a cooker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputPath {
    pub cooker: CookerPath,
    pub output: OutputName,
}

impl OutputPath {
    pub fn new(cooker: CookerPath, output: OutputName) -> Self {
        Self { cooker, output }
    }

    /// Parse `<cooker path>:<output>`
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let (cooker, output) = s
            .rsplit_once(OUTPUT_SEPARATOR)
            .ok_or_else(|| PathError::Malformed { kind: "output path", value: s.to_string() })?;
        Ok(Self::new(CookerPath::parse(cooker)?, OutputName::new(output)?))
    }

    pub fn cooker(&self) -> &CookerPath {
        &self.cooker
    }

    pub fn name(&self) -> &OutputName {
        &self.output
    }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.cooker, OUTPUT_SEPARATOR, self.output)
    }
}

impl FromStr for OutputPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OutputPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OutputPath> for String {
    fn from(path: OutputPath) -> String {
        path.to_string()
    }
}
