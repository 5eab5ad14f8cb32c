//! The assembled GraphQL source and the builder running the assembly pipeline.

use std::fmt;
use std::sync::Arc;

use crate::configuration::Configuration;
use crate::context::Context;
use crate::engine::EngineBuilder;
use crate::engine::EngineConfigurer;
use crate::engine::GraphQlEngine;
use crate::error::AssemblyError;
use crate::error::ConfigurationError;
use crate::exception::DataFetcherExceptionResolver;
use crate::exception::ExceptionResolversExceptionHandler;
use crate::graphql;
use crate::instrumentation::ChainedInstrumentation;
use crate::instrumentation::Instrumentation;
use crate::registry::TypeDefinitionConfigurer;
use crate::registry::TypeRegistry;
use crate::resource::InlineResource;
use crate::resource::SchemaResource;
use crate::resource::discover;
use crate::schema::DefaultSchemaFactory;
use crate::schema::Schema;
use crate::schema::SchemaFactory;
use crate::visitor::SchemaVisitor;
use crate::visitor::apply_type_visitors;
use crate::wiring::RuntimeWiring;
use crate::wiring::WiringConfigurer;

/// Gives access to an execution engine and the schema it executes.
pub trait GraphQlSource: Send + Sync {
    fn engine(&self) -> &GraphQlEngine;

    fn schema(&self) -> &Schema;
}

/// A [`GraphQlSource`] assembled once by [`GraphQlSourceBuilder::build`].
///
/// Clones share the same engine.
#[derive(Clone)]
pub struct CachedGraphQlSource {
    inner: Arc<Assembled>,
}

struct Assembled {
    engine: GraphQlEngine,
    schema: Schema,
}

impl CachedGraphQlSource {
    /// Shorthand for executing `request` with this source's engine.
    pub async fn execute(
        &self,
        request: impl Into<graphql::Request>,
        context: Context,
    ) -> graphql::Response {
        self.inner.engine.execute(request, context).await
    }
}

impl GraphQlSource for CachedGraphQlSource {
    fn engine(&self) -> &GraphQlEngine {
        &self.inner.engine
    }

    fn schema(&self) -> &Schema {
        &self.inner.schema
    }
}

impl fmt::Debug for CachedGraphQlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedGraphQlSource")
            .field("engine", &self.inner.engine)
            .field("schema", &self.inner.schema)
            .finish()
    }
}

/// Collects the contributions to a GraphQL source and assembles it.
///
/// Every contribution list is applied in registration order:
/// 1. the schema resources are parsed and merged into one [`TypeRegistry`],
/// 2. the type definition configurers modify the merged registry,
/// 3. the wiring configurers fill one [`RuntimeWiring`],
/// 4. the schema factory turns both into an executable [`Schema`],
/// 5. the type visitors run over the schema, followed by the context decorator,
/// 6. the engine is built with the exception resolvers and the instrumentations, after the
///    engine configurers ran.
#[derive(Clone)]
pub struct GraphQlSourceBuilder {
    schema_resources: Vec<Arc<dyn SchemaResource>>,
    type_definition_configurers: Vec<Arc<dyn TypeDefinitionConfigurer>>,
    wiring_configurers: Vec<Arc<dyn WiringConfigurer>>,
    type_visitors: Vec<Arc<dyn SchemaVisitor>>,
    exception_resolvers: Vec<Arc<dyn DataFetcherExceptionResolver>>,
    instrumentations: Vec<Arc<dyn Instrumentation>>,
    engine_configurers: Vec<Arc<dyn EngineConfigurer>>,
    schema_factory: Arc<dyn SchemaFactory>,
}

impl Default for GraphQlSourceBuilder {
    fn default() -> Self {
        Self {
            schema_resources: Vec::new(),
            type_definition_configurers: Vec::new(),
            wiring_configurers: Vec::new(),
            type_visitors: Vec::new(),
            exception_resolvers: Vec::new(),
            instrumentations: Vec::new(),
            engine_configurers: Vec::new(),
            schema_factory: Arc::new(DefaultSchemaFactory),
        }
    }
}

impl GraphQlSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder loading the schema fragments found in the configured locations, with the
    /// configured engine options.
    ///
    /// The engine options are applied before the engine configurers registered later.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, ConfigurationError> {
        let mut builder = Self::new();
        for location in &configuration.schema.locations {
            let resources = discover(location, &configuration.schema.file_extensions).map_err(
                |error| ConfigurationError::CannotReadSchemaLocation {
                    location: location.clone(),
                    error,
                },
            )?;
            tracing::debug!(
                location = %location.display(),
                fragments = resources.len(),
                "discovered schema fragments"
            );
            builder = builder.schema_resources(
                resources
                    .into_iter()
                    .map(|resource| Arc::new(resource) as Arc<dyn SchemaResource>),
            );
        }

        let introspection = configuration.introspection;
        let limits = configuration.limits.clone();
        Ok(builder.configure_engine(move |engine: &mut EngineBuilder| {
            engine.introspection(introspection);
            if let Some(max_depth) = limits.max_depth {
                engine.max_depth(max_depth);
            }
            if let Some(max_complexity) = limits.max_complexity {
                engine.max_complexity(max_complexity);
            }
        }))
    }

    pub fn schema_resource(mut self, resource: impl SchemaResource) -> Self {
        self.schema_resources.push(Arc::new(resource));
        self
    }

    pub fn schema_resources(
        mut self,
        resources: impl IntoIterator<Item = Arc<dyn SchemaResource>>,
    ) -> Self {
        self.schema_resources.extend(resources);
        self
    }

    /// Adds a schema fragment held in memory.
    pub fn schema_sdl(self, name: impl Into<String>, sdl: impl Into<Arc<str>>) -> Self {
        self.schema_resource(InlineResource::new(name, sdl))
    }

    pub fn type_definition_configurer(mut self, configurer: impl TypeDefinitionConfigurer) -> Self {
        self.type_definition_configurers.push(Arc::new(configurer));
        self
    }

    pub fn configure_runtime_wiring(mut self, configurer: impl WiringConfigurer) -> Self {
        self.wiring_configurers.push(Arc::new(configurer));
        self
    }

    pub fn type_visitor(mut self, visitor: impl SchemaVisitor) -> Self {
        self.type_visitors.push(Arc::new(visitor));
        self
    }

    pub fn type_visitors(mut self, visitors: impl IntoIterator<Item = Arc<dyn SchemaVisitor>>) -> Self {
        self.type_visitors.extend(visitors);
        self
    }

    pub fn exception_resolver(mut self, resolver: impl DataFetcherExceptionResolver) -> Self {
        self.exception_resolvers.push(Arc::new(resolver));
        self
    }

    pub fn exception_resolvers(
        mut self,
        resolvers: impl IntoIterator<Item = Arc<dyn DataFetcherExceptionResolver>>,
    ) -> Self {
        self.exception_resolvers.extend(resolvers);
        self
    }

    pub fn instrumentation(mut self, instrumentation: impl Instrumentation) -> Self {
        self.instrumentations.push(Arc::new(instrumentation));
        self
    }

    pub fn instrumentations(
        mut self,
        instrumentations: impl IntoIterator<Item = Arc<dyn Instrumentation>>,
    ) -> Self {
        self.instrumentations.extend(instrumentations);
        self
    }

    /// Registers a callback run on the [`EngineBuilder`] before the engine is built.
    pub fn configure_engine(mut self, configurer: impl EngineConfigurer) -> Self {
        self.engine_configurers.push(Arc::new(configurer));
        self
    }

    /// Replaces the [`DefaultSchemaFactory`].
    pub fn schema_factory(mut self, factory: impl SchemaFactory) -> Self {
        self.schema_factory = Arc::new(factory);
        self
    }

    /// Runs the assembly pipeline.
    ///
    /// The builder is left untouched: building twice yields two independent sources answering
    /// the same queries identically.
    pub fn build(&self) -> Result<CachedGraphQlSource, AssemblyError> {
        let mut registry = TypeRegistry::from_resources(&self.schema_resources)?;
        for configurer in &self.type_definition_configurers {
            configurer.configure(&mut registry)?;
        }

        let wiring = RuntimeWiring::assemble(&self.wiring_configurers);
        let schema = self.schema_factory.create_schema(registry, wiring)?;
        let schema = apply_type_visitors(&schema, &self.type_visitors)?;

        let mut engine = EngineBuilder::new(schema.clone());
        engine.exception_handler(ExceptionResolversExceptionHandler::new(
            self.exception_resolvers.clone(),
        ));
        if !self.instrumentations.is_empty() {
            engine.instrumentation(Arc::new(ChainedInstrumentation::new(
                self.instrumentations.clone(),
            )));
        }
        for configurer in &self.engine_configurers {
            configurer.configure(&mut engine);
        }
        let engine = engine.build()?;

        tracing::debug!(
            fragments = self.schema_resources.len(),
            wiring_configurers = self.wiring_configurers.len(),
            visitors = self.type_visitors.len(),
            exception_resolvers = self.exception_resolvers.len(),
            instrumentations = self.instrumentations.len(),
            "assembled graphql source"
        );
        Ok(CachedGraphQlSource {
            inner: Arc::new(Assembled { engine, schema }),
        })
    }
}

impl fmt::Debug for GraphQlSourceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQlSourceBuilder")
            .field("schema_resources", &self.schema_resources)
            .field(
                "type_definition_configurers",
                &self.type_definition_configurers.len(),
            )
            .field("wiring_configurers", &self.wiring_configurers.len())
            .field("type_visitors", &self.type_visitors.len())
            .field("exception_resolvers", &self.exception_resolvers.len())
            .field("instrumentations", &self.instrumentations.len())
            .field("engine_configurers", &self.engine_configurers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;
    use crate::configuration::Limits;
    use crate::configuration::SchemaLocations;
    use crate::error::NoSchemaReason;
    use crate::fetcher::static_value;
    use crate::wiring::RuntimeWiringBuilder;

    #[test]
    fn builder_without_resources_fails() {
        let error = GraphQlSourceBuilder::new().build().unwrap_err();
        assert!(matches!(
            error,
            AssemblyError::NoSchemaProvided(NoSchemaReason::NoResources)
        ));
    }

    #[test]
    fn failing_type_definition_configurer_aborts() {
        let error = GraphQlSourceBuilder::new()
            .schema_sdl("a.graphqls", "type Query { a: Int }")
            .type_definition_configurer(|registry: &mut TypeRegistry| {
                registry.add_sdl("type Query { a: String }", "extra.graphqls")
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            AssemblyError::ConflictingTypeDefinition { .. }
        ));
    }

    #[tokio::test]
    async fn type_definition_configurers_extend_the_registry() {
        let source = GraphQlSourceBuilder::new()
            .schema_sdl("a.graphqls", "type Query { a: Int }")
            .type_definition_configurer(|registry: &mut TypeRegistry| {
                registry.add_sdl("extend type Query { b: Int }", "extra.graphqls")
            })
            .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
                wiring
                    .data_fetcher("Query", "a", static_value(1))
                    .data_fetcher("Query", "b", static_value(2));
            })
            .build()
            .unwrap();

        let response = source.execute("{ a b }", Context::new()).await;

        assert_eq!(response.data, Some(json!({ "a": 1, "b": 2 })));
    }

    #[test]
    fn custom_schema_factory_is_used() {
        let error = GraphQlSourceBuilder::new()
            .schema_sdl("a.graphqls", "type Query { a: Int }")
            .schema_factory(
                |_registry: TypeRegistry, _wiring: RuntimeWiring| -> Result<Schema, AssemblyError> {
                    Err(AssemblyError::schema_generation("refused"))
                },
            )
            .build()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "could not generate the executable schema: refused"
        );
    }

    #[test]
    fn missing_schema_location_is_a_configuration_error() {
        let configuration = Configuration::builder()
            .schema(
                SchemaLocations::builder()
                    .location(PathBuf::from("does/not/exist"))
                    .build(),
            )
            .build();

        let error = GraphQlSourceBuilder::from_configuration(&configuration).unwrap_err();

        assert!(matches!(
            error,
            ConfigurationError::CannotReadSchemaLocation { .. }
        ));
    }

    #[tokio::test]
    async fn configured_limits_apply_to_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("schema.graphqls"),
            "type Query { me: User } type User { friend: User name: String }",
        )
        .unwrap();
        let configuration = Configuration::builder()
            .schema(
                SchemaLocations::builder()
                    .location(dir.path().to_path_buf())
                    .build(),
            )
            .limits(Limits {
                max_depth: Some(2),
                max_complexity: None,
            })
            .build();

        let source = GraphQlSourceBuilder::from_configuration(&configuration)
            .unwrap()
            .build()
            .unwrap();

        assert!(source.execute("{ me { name } }", Context::new()).await.is_ok());
        assert!(
            !source
                .execute("{ me { friend { friend { name } } } }", Context::new())
                .await
                .is_ok()
        );
    }
}
