//! Types related to GraphQL requests, responses, etc.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;
use crate::json_ext::Path;
pub use crate::json_ext::Path as JsonPath;
pub use crate::json_ext::PathElement as JsonPathElement;

/// The extension key under which an error's classification is stored.
pub const CLASSIFICATION: &str = "classification";

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
/// The error location
pub struct Location {
    /// The line number
    pub line: u32,
    /// The column number
    pub column: u32,
}

/// Common classifications for errors raised while fetching data.
///
/// Any string may be used as a classification, these are the ones the engine knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// The request could not be processed due to something that is perceived to be a client error.
    BadRequest,
    /// The request requires authentication.
    Unauthorized,
    /// The request was understood but the client is not allowed to access the data.
    Forbidden,
    /// The requested data could not be found.
    NotFound,
    /// An unexpected error occurred while fetching data.
    InternalError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "BAD_REQUEST",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorType> for String {
    fn from(error_type: ErrorType) -> Self {
        error_type.as_str().to_string()
    }
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
///
/// Converted to (or from) JSON with serde.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Location>,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The optional GraphQL extensions for this error.
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Error {
    /// Returns a builder that builds a GraphQL [`Error`] from its components.
    ///
    /// Builder methods:
    ///
    /// * `.message(impl Into<`[`String`]`>)`
    ///   Required.
    ///   Sets [`Error::message`].
    ///
    /// * `.locations(impl Into<`[`Vec`]`<`[`Location`]`>>)`
    ///   Optional.
    ///   Sets the entire `Vec` of [`Error::locations`], which defaults to the empty.
    ///
    /// * `.location(impl Into<`[`Location`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item at the end of [`Error::locations`].
    ///
    /// * `.path(impl Into<`[`Path`]`>)`
    ///   Optional.
    ///   Sets [`Error::path`].
    ///
    /// * `.extensions(impl Into<`[`serde_json_bytes::Map`]`<`[`ByteString`], [`Value`]`>>)`
    ///   Optional.
    ///   Sets the entire [`Error::extensions`] map, which defaults to empty.
    ///
    /// * `.extension(impl Into<`[`ByteString`]`>, impl Into<`[`Value`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item to the [`Error::extensions`] map.
    ///
    /// * `.classification(impl Into<`[`String`]`>)`
    ///   Optional.
    ///   Sets the "classification" in the extension map, [`ErrorType`] converts into it.
    ///   Ignored if the extensions already carry a classification.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns a GraphQL [`Error`].
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Option<Path>,
        classification: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        mut extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        if let Some(classification) = classification {
            extensions
                .entry(ByteString::from(CLASSIFICATION))
                .or_insert(Value::String(ByteString::from(classification)));
        }
        Self {
            message,
            locations,
            path,
            extensions,
        }
    }

    /// The classification found in the extensions, if any.
    pub fn classification(&self) -> Option<&str> {
        self.extensions
            .get(CLASSIFICATION)
            .and_then(|value| value.as_str())
    }

    /// The error produced for a field fault that no exception resolver handled.
    ///
    /// Only the execution id is exposed, the fault itself never reaches the response.
    pub(crate) fn unhandled_fault(execution_id: impl fmt::Display) -> Self {
        Error::builder()
            .message(format!("{} for {execution_id}", ErrorType::InternalError))
            .classification(ErrorType::InternalError)
            .build()
    }

    pub(crate) fn from_server_error(error: async_graphql::ServerError) -> Self {
        let extensions = error
            .extensions
            .as_ref()
            .and_then(|extensions| serde_json_bytes::to_value(extensions).ok())
            .and_then(|value| match value {
                Value::Object(object) => Some(object),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            message: error.message,
            locations: error
                .locations
                .iter()
                .map(|pos| Location {
                    line: pos.line as u32,
                    column: pos.column as u32,
                })
                .collect(),
            path: (!error.path.is_empty()).then(|| Path::from_response_path(&error.path)),
            extensions,
        }
    }

    /// Converts into the error type returned by field resolvers of the executor.
    pub(crate) fn into_field_error(self) -> async_graphql::Error {
        let mut error = async_graphql::Error::new(self.message);
        if !self.extensions.is_empty() {
            let mut extensions = async_graphql::ErrorExtensionValues::default();
            for (key, value) in self.extensions.iter() {
                extensions.set(key.as_str(), crate::json_ext::to_graphql_value(value));
            }
            error.extensions = Some(extensions);
        }
        error
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {path})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A GraphQL request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL operation (e.g., query, mutation) string.
    pub query: String,

    /// The (optional) GraphQL operation name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub variables: Object,

    /// The (optional) GraphQL `extensions` of a GraphQL request.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Request {
    /// Returns a builder that builds a GraphQL [`Request`] from its components.
    ///
    /// `.query(...)` is required, `.operation_name(...)`, `.variables(...)`/`.variable(k, v)`
    /// and `.extensions(...)`/`.extension(k, v)` are optional.
    #[builder(visibility = "pub")]
    fn new(
        query: String,
        operation_name: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        variables: JsonMap<ByteString, Value>,
        extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
            extensions,
        }
    }
}

impl From<&str> for Request {
    fn from(query: &str) -> Self {
        Request::builder().query(query).build()
    }
}

/// A GraphQL response.
///
/// `data` may be partial when some fields failed, each failure is reported in `errors`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The errors, in the order they were raised.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional GraphQL extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(
        data: Option<Value>,
        errors: Vec<Error>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    pub(crate) fn from_executor_response(response: async_graphql::Response) -> Self {
        let data = match &response.data {
            // The executor reports a request error (parse, validation) with null data
            async_graphql::Value::Null if !response.errors.is_empty() => None,
            data => Some(crate::json_ext::from_graphql_value(data)),
        };
        let extensions = response
            .extensions
            .iter()
            .map(|(key, value)| {
                (
                    ByteString::from(key.as_str()),
                    crate::json_ext::from_graphql_value(value),
                )
            })
            .collect();
        Self {
            data,
            errors: response
                .errors
                .into_iter()
                .map(Error::from_server_error)
                .collect(),
            extensions,
        }
    }

    /// Returns `true` if no error was reported.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
