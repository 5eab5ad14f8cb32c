//! Performs JSON related operations.

use std::fmt;

use async_graphql::Name;
use async_graphql::Value as GraphQLValue;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// A path into the result document.
///
/// This can be composed of strings and numbers.
#[derive(Clone, Deserialize, Serialize, Debug, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

/// One element of a [`Path`].
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl Path {
    pub fn empty() -> Path {
        Path(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub(crate) fn from_response_path(path: &[async_graphql::PathSegment]) -> Self {
        Path(
            path.iter()
                .map(|segment| match segment {
                    async_graphql::PathSegment::Field(name) => PathElement::Key(name.clone()),
                    async_graphql::PathSegment::Index(index) => PathElement::Index(*index),
                })
                .collect(),
        )
    }
}

impl<T> From<T> for Path
where
    T: AsRef<str>,
{
    fn from(s: T) -> Self {
        Self(
            s.as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.parse::<usize>() {
                    Ok(index) => PathElement::Index(index),
                    Err(_) => PathElement::Key(s.to_string()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/")?;
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}

/// Converts a JSON value into the executor's value model.
///
/// Strings stay strings; enum coercion is decided by the caller, which knows the output type.
pub(crate) fn to_graphql_value(value: &Value) -> GraphQLValue {
    match value {
        Value::Null => GraphQLValue::Null,
        Value::Bool(b) => GraphQLValue::Boolean(*b),
        Value::Number(n) => GraphQLValue::Number(n.clone()),
        Value::String(s) => GraphQLValue::String(s.as_str().to_string()),
        Value::Array(items) => GraphQLValue::List(items.iter().map(to_graphql_value).collect()),
        Value::Object(object) => GraphQLValue::Object(
            object
                .iter()
                .map(|(key, value)| (Name::new(key.as_str()), to_graphql_value(value)))
                .collect(),
        ),
    }
}

/// Converts a value of the executor's value model back into JSON.
pub(crate) fn from_graphql_value(value: &GraphQLValue) -> Value {
    match value {
        GraphQLValue::Null => Value::Null,
        GraphQLValue::Boolean(b) => Value::Bool(*b),
        GraphQLValue::Number(n) => Value::Number(n.clone()),
        GraphQLValue::String(s) => Value::String(s.as_str().into()),
        GraphQLValue::Enum(name) => Value::String(name.as_str().into()),
        GraphQLValue::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).as_ref().into()),
        GraphQLValue::List(items) => Value::Array(items.iter().map(from_graphql_value).collect()),
        GraphQLValue::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (ByteString::from(key.as_str()), from_graphql_value(value)))
                .collect(),
        ),
    }
}
