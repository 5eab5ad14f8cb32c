//! Data fetchers resolve the value of one field.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::validation::Valid;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use tower::BoxError;

use crate::context::Context;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::schema::FieldCoordinate;

/// Resolves the value of a field.
///
/// The returned value is the field's value before completion: objects are handed to the data
/// fetchers of their own fields as [`DataFetchingEnvironment::source`], lists are completed item
/// by item. An error is a fault, translated into a GraphQL error by the exception resolvers.
#[async_trait::async_trait]
pub trait DataFetcher: Send + Sync + 'static {
    async fn get(&self, environment: DataFetchingEnvironment) -> Result<Value, BoxError>;

    /// Whether this fetcher installs the request [`Context`] as the current one itself.
    fn installs_context(&self) -> bool {
        false
    }
}

/// Everything a data fetcher knows about the field it resolves.
#[derive(Clone)]
pub struct DataFetchingEnvironment {
    coordinate: FieldCoordinate,
    source: Value,
    arguments: Object,
    path: Path,
    context: Context,
    schema: Arc<Valid<apollo_compiler::Schema>>,
}

#[buildstructor::buildstructor]
impl DataFetchingEnvironment {
    /// Returns a builder, mostly useful to call data fetchers and exception resolvers in tests.
    ///
    /// `.coordinate(..)` and `.schema(..)` are required.
    #[builder(visibility = "pub")]
    fn new(
        coordinate: FieldCoordinate,
        source: Option<Value>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        arguments: JsonMap<ByteString, Value>,
        path: Option<Path>,
        context: Option<Context>,
        schema: Arc<Valid<apollo_compiler::Schema>>,
    ) -> Self {
        Self {
            coordinate,
            source: source.unwrap_or(Value::Null),
            arguments,
            path: path.unwrap_or_default(),
            context: context.unwrap_or_default(),
            schema,
        }
    }
}

impl DataFetchingEnvironment {
    pub fn coordinate(&self) -> &FieldCoordinate {
        &self.coordinate
    }

    pub fn parent_type(&self) -> &str {
        &self.coordinate.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.coordinate.field_name
    }

    /// The value of the parent object, [`Value::Null`] for root fields.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Argument values, after variable substitution and default values.
    pub fn arguments(&self) -> &Object {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Deserializes one argument.
    pub fn argument_as<T>(&self, name: &str) -> Result<Option<T>, BoxError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        self.arguments
            .get(name)
            .map(|value| serde_json_bytes::from_value(value.clone()))
            .transpose()
            .map_err(Into::into)
    }

    /// Where the value ends up in the response.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn schema(&self) -> &Valid<apollo_compiler::Schema> {
        &self.schema
    }

    pub fn field_definition(&self) -> Option<&FieldDefinition> {
        let field: &FieldDefinition = self
            .schema
            .type_field(&self.coordinate.type_name, &self.coordinate.field_name)
            .ok()?;
        Some(field)
    }
}

impl fmt::Debug for DataFetchingEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFetchingEnvironment")
            .field("coordinate", &self.coordinate)
            .field("path", &self.path)
            .field("arguments", &self.arguments)
            .field("execution_id", &self.context.execution_id())
            .finish_non_exhaustive()
    }
}

/// The data fetcher of fields nothing is bound to: reads the property named after the field
/// from the parent value.
#[derive(Clone, Debug)]
pub struct PropertyDataFetcher {
    property: String,
}

impl PropertyDataFetcher {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }
}

#[async_trait::async_trait]
impl DataFetcher for PropertyDataFetcher {
    async fn get(&self, environment: DataFetchingEnvironment) -> Result<Value, BoxError> {
        Ok(environment
            .source()
            .as_object()
            .and_then(|object| object.get(self.property.as_str()))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// Always returns the same value.
#[derive(Clone, Debug)]
pub struct StaticDataFetcher {
    value: Value,
}

#[async_trait::async_trait]
impl DataFetcher for StaticDataFetcher {
    async fn get(&self, _environment: DataFetchingEnvironment) -> Result<Value, BoxError> {
        Ok(self.value.clone())
    }
}

/// A data fetcher returning `value` whatever the field's arguments.
pub fn static_value(value: impl Into<Value>) -> StaticDataFetcher {
    StaticDataFetcher {
        value: value.into(),
    }
}

/// Data fetcher calling an async closure.
pub struct FnDataFetcher<F> {
    function: F,
}

#[async_trait::async_trait]
impl<F, Fut> DataFetcher for FnDataFetcher<F>
where
    F: Fn(DataFetchingEnvironment) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn get(&self, environment: DataFetchingEnvironment) -> Result<Value, BoxError> {
        (self.function)(environment).await
    }
}

/// Turns an async closure into a [`DataFetcher`].
pub fn fetcher_fn<F, Fut>(function: F) -> FnDataFetcher<F>
where
    F: Fn(DataFetchingEnvironment) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    FnDataFetcher { function }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    fn schema() -> Arc<Valid<apollo_compiler::Schema>> {
        Arc::new(
            apollo_compiler::Schema::parse_and_validate(
                "type Query { user(id: ID!): User } type User { name: String }",
                "schema.graphqls",
            )
            .unwrap(),
        )
    }

    fn environment(type_name: &str, field_name: &str) -> DataFetchingEnvironment {
        DataFetchingEnvironment::builder()
            .coordinate(FieldCoordinate::new(type_name, field_name))
            .schema(schema())
            .build()
    }

    fn environment_with_source(source: Value) -> DataFetchingEnvironment {
        DataFetchingEnvironment::builder()
            .coordinate(FieldCoordinate::new("User", "name"))
            .source(source)
            .schema(schema())
            .build()
    }

    #[tokio::test]
    async fn property_fetcher_reads_the_parent_value() {
        let fetcher = PropertyDataFetcher::new("name");
        let env = environment_with_source(json!({"name": "Ada", "age": 36}));
        assert_eq!(fetcher.get(env).await.unwrap(), json!("Ada"));
    }

    #[tokio::test]
    async fn property_fetcher_yields_null_for_missing_properties() {
        let fetcher = PropertyDataFetcher::new("name");
        assert_eq!(
            fetcher.get(environment("User", "name")).await.unwrap(),
            Value::Null
        );
        let env = environment_with_source(json!([1, 2]));
        assert_eq!(fetcher.get(env).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn closures_receive_arguments() {
        let fetcher = fetcher_fn(|env: DataFetchingEnvironment| async move {
            let id: Option<String> = env.argument_as("id")?;
            Ok::<_, BoxError>(json!({ "name": format!("user {}", id.unwrap_or_default()) }))
        });
        let env = DataFetchingEnvironment::builder()
            .coordinate(FieldCoordinate::new("Query", "user"))
            .argument("id", "7")
            .schema(schema())
            .build();

        assert_eq!(fetcher.get(env).await.unwrap(), json!({"name": "user 7"}));
    }

    #[test]
    fn field_definition_is_looked_up_in_the_schema() {
        let env = environment("Query", "user");
        let field = env.field_definition().unwrap();
        assert_eq!(field.ty.to_string(), "User");
        assert!(environment("Query", "missing").field_definition().is_none());
    }
}
