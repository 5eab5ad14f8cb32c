//! Assembly errors.
use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use thiserror::Error;
use tower::BoxError;

pub use crate::configuration::ConfigurationError;

/// Errors that abort the assembly of a [`crate::GraphQlSource`].
///
/// None of them is ever turned into a GraphQL error: assembly happens before any request is
/// served, and no source is produced when one of them is returned.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum AssemblyError {
    /// no schema fragment was provided{0}
    NoSchemaProvided(NoSchemaReason),

    /// schema fragment '{resource}' is missing or unreadable: {reason}
    MissingOrUnreadableSchemaFragment {
        /// The description of the resource.
        resource: String,
        /// Why it could not be read.
        reason: String,
    },

    /// schema fragment '{resource}' is invalid: {errors}
    InvalidSchemaFragment {
        /// The description of the resource.
        resource: String,
        /// The parser diagnostics.
        errors: ParseErrors,
    },

    /// conflicting definitions of type '{type_name}': {reason}
    ConflictingTypeDefinition {
        /// The type (or directive) declared incompatibly.
        type_name: String,
        /// What differs between the two declarations.
        reason: String,
    },

    /// could not generate the executable schema: {0}
    SchemaGenerationFailure(#[source] BoxError),

    /// schema visitor '{visitor}' failed: {source}
    VisitorFailure {
        /// The name of the visitor that failed.
        visitor: String,
        /// The error it returned.
        source: BoxError,
    },

    /// could not build the execution engine: {0}
    EngineBuildFailure(String),
}

/// Why no schema could be assembled.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum NoSchemaReason {
    /// ; no schema resource was registered
    NoResources,
    /// ; the schema resources do not declare any type
    EmptyRegistry,
}

impl AssemblyError {
    pub(crate) fn schema_generation(error: impl Into<BoxError>) -> Self {
        AssemblyError::SchemaGenerationFailure(error.into())
    }

    pub(crate) fn conflict(type_name: impl ToString, reason: impl Into<String>) -> Self {
        AssemblyError::ConflictingTypeDefinition {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Collection of schema parsing or validation errors.
#[derive(Debug)]
pub struct ParseErrors {
    pub(crate) errors: DiagnosticList,
}

impl ParseErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

impl<T> From<WithErrors<T>> for ParseErrors {
    fn from(WithErrors { errors, .. }: WithErrors<T>) -> Self {
        ParseErrors { errors }
    }
}
