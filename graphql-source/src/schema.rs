//! The executable schema: validated type definitions and the code bound to them.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::name;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;

use crate::error::AssemblyError;
use crate::error::ParseErrors;
use crate::fetcher::DataFetcher;
use crate::fetcher::PropertyDataFetcher;
use crate::registry::TypeRegistry;
use crate::wiring::Coercing;
use crate::wiring::RuntimeWiring;
use crate::wiring::TypeResolver;
use crate::wiring::TypenameResolver;

/// The coordinate of a field: `Type.field`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldCoordinate {
    pub type_name: String,
    pub field_name: String,
}

impl FieldCoordinate {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FieldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// Data fetchers, type resolvers and scalar coercings of an executable [`Schema`].
#[derive(Clone)]
pub struct CodeRegistry {
    data_fetchers: IndexMap<FieldCoordinate, Arc<dyn DataFetcher>>,
    type_resolvers: IndexMap<String, Arc<dyn TypeResolver>>,
    default_type_resolver: Arc<dyn TypeResolver>,
    scalars: IndexMap<String, Arc<dyn Coercing>>,
}

impl CodeRegistry {
    pub(crate) fn from_wiring(wiring: RuntimeWiring) -> Self {
        Self {
            data_fetchers: wiring.data_fetchers,
            type_resolvers: wiring.type_resolvers,
            default_type_resolver: wiring
                .default_type_resolver
                .unwrap_or_else(|| Arc::new(TypenameResolver)),
            scalars: wiring.scalars,
        }
    }

    /// Whether a data fetcher is bound to `coordinate`.
    pub fn has_data_fetcher(&self, coordinate: &FieldCoordinate) -> bool {
        self.data_fetchers.contains_key(coordinate)
    }

    /// The data fetcher of `coordinate`, a [`PropertyDataFetcher`] when none is bound.
    pub fn data_fetcher(&self, coordinate: &FieldCoordinate) -> Arc<dyn DataFetcher> {
        data_fetcher_or_default(&self.data_fetchers, coordinate)
    }

    /// The type resolver of an interface or union.
    pub fn type_resolver(&self, type_name: &str) -> Arc<dyn TypeResolver> {
        self.type_resolvers
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| self.default_type_resolver.clone())
    }

    pub fn coercing(&self, scalar_name: &str) -> Option<Arc<dyn Coercing>> {
        self.scalars.get(scalar_name).cloned()
    }

    /// A builder seeded with this registry.
    pub fn to_builder(&self) -> CodeRegistryBuilder {
        CodeRegistryBuilder {
            registry: self.clone(),
        }
    }
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::from_wiring(RuntimeWiring::default())
    }
}

impl fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeRegistry")
            .field("data_fetchers", &self.data_fetchers.keys().collect::<Vec<_>>())
            .field("type_resolvers", &self.type_resolvers.keys().collect::<Vec<_>>())
            .field("scalars", &self.scalars.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn data_fetcher_or_default(
    data_fetchers: &IndexMap<FieldCoordinate, Arc<dyn DataFetcher>>,
    coordinate: &FieldCoordinate,
) -> Arc<dyn DataFetcher> {
    data_fetchers
        .get(coordinate)
        .cloned()
        .unwrap_or_else(|| Arc::new(PropertyDataFetcher::new(coordinate.field_name.clone())))
}

/// Mutable copy of a [`CodeRegistry`], shared by the schema visitors of one traversal.
pub struct CodeRegistryBuilder {
    registry: CodeRegistry,
}

impl CodeRegistryBuilder {
    pub fn has_data_fetcher(&self, coordinate: &FieldCoordinate) -> bool {
        self.registry.has_data_fetcher(coordinate)
    }

    /// The data fetcher of `coordinate`, a [`PropertyDataFetcher`] when none is bound.
    pub fn data_fetcher(&self, coordinate: &FieldCoordinate) -> Arc<dyn DataFetcher> {
        data_fetcher_or_default(&self.registry.data_fetchers, coordinate)
    }

    pub fn set_data_fetcher(
        &mut self,
        coordinate: FieldCoordinate,
        fetcher: Arc<dyn DataFetcher>,
    ) -> &mut Self {
        self.registry.data_fetchers.insert(coordinate, fetcher);
        self
    }

    pub fn type_resolver(&self, type_name: &str) -> Arc<dyn TypeResolver> {
        self.registry.type_resolver(type_name)
    }

    pub fn set_type_resolver(
        &mut self,
        type_name: impl Into<String>,
        resolver: Arc<dyn TypeResolver>,
    ) -> &mut Self {
        self.registry
            .type_resolvers
            .insert(type_name.into(), resolver);
        self
    }

    pub fn build(self) -> CodeRegistry {
        self.registry
    }
}

/// An executable schema.
///
/// Cloning is cheap: the type definitions and the code registry are shared.
#[derive(Clone)]
pub struct Schema {
    definitions: Arc<Valid<apollo_compiler::Schema>>,
    code_registry: Arc<CodeRegistry>,
}

impl Schema {
    pub fn new(definitions: Valid<apollo_compiler::Schema>, code_registry: CodeRegistry) -> Self {
        Self {
            definitions: Arc::new(definitions),
            code_registry: Arc::new(code_registry),
        }
    }

    /// The validated type definitions.
    pub fn definitions(&self) -> &Valid<apollo_compiler::Schema> {
        &self.definitions
    }

    pub(crate) fn shared_definitions(&self) -> Arc<Valid<apollo_compiler::Schema>> {
        self.definitions.clone()
    }

    pub fn code_registry(&self) -> &CodeRegistry {
        &self.code_registry
    }

    /// Derives a schema with the same type definitions and the code registry built by `transform`.
    pub fn transform_code_registry<E>(
        &self,
        transform: impl FnOnce(&mut CodeRegistryBuilder) -> Result<(), E>,
    ) -> Result<Schema, E> {
        let mut builder = self.code_registry.to_builder();
        transform(&mut builder)?;
        Ok(Schema {
            definitions: self.definitions.clone(),
            code_registry: Arc::new(builder.build()),
        })
    }

    /// The schema printed as SDL.
    pub fn sdl(&self) -> String {
        self.definitions.to_string()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "types",
                &self
                    .definitions
                    .types
                    .iter()
                    .filter(|(_, ty)| !ty.is_built_in())
                    .map(|(name, _)| name)
                    .collect::<Vec<_>>(),
            )
            .field("code_registry", &self.code_registry)
            .finish()
    }
}

/// Turns the merged type registry and the runtime wiring into an executable [`Schema`].
pub trait SchemaFactory: Send + Sync + 'static {
    fn create_schema(
        &self,
        registry: TypeRegistry,
        wiring: RuntimeWiring,
    ) -> Result<Schema, AssemblyError>;
}

impl<F> SchemaFactory for F
where
    F: Fn(TypeRegistry, RuntimeWiring) -> Result<Schema, AssemblyError> + Send + Sync + 'static,
{
    fn create_schema(
        &self,
        registry: TypeRegistry,
        wiring: RuntimeWiring,
    ) -> Result<Schema, AssemblyError> {
        (self)(registry, wiring)
    }
}

/// Delegates to [`SchemaGenerator::make_executable_schema`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSchemaFactory;

impl SchemaFactory for DefaultSchemaFactory {
    fn create_schema(
        &self,
        registry: TypeRegistry,
        wiring: RuntimeWiring,
    ) -> Result<Schema, AssemblyError> {
        SchemaGenerator.make_executable_schema(registry, wiring)
    }
}

/// Validates type definitions and checks the runtime wiring against them.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaGenerator;

impl SchemaGenerator {
    pub fn make_executable_schema(
        &self,
        registry: TypeRegistry,
        wiring: RuntimeWiring,
    ) -> Result<Schema, AssemblyError> {
        let mut definitions = registry.into_schema();
        set_implicit_root_operations(&mut definitions);
        let definitions = definitions
            .validate()
            .map_err(|errors| AssemblyError::schema_generation(ParseErrors::from(errors)))?;

        if let Some(subscription) = &definitions.schema_definition.subscription {
            return Err(AssemblyError::schema_generation(format!(
                "subscriptions are not supported, found subscription root type '{}'",
                subscription.name
            )));
        }
        check_wiring(&definitions, &wiring)?;

        let code_registry = CodeRegistry::from_wiring(wiring);
        tracing::debug!(code_registry = ?code_registry, "generated executable schema");
        Ok(Schema::new(definitions, code_registry))
    }
}

/// Types named after a root operation are that operation's root when no schema definition
/// names one.
fn set_implicit_root_operations(definitions: &mut apollo_compiler::Schema) {
    let declared = |definitions: &apollo_compiler::Schema, name: &str| {
        matches!(definitions.types.get(name), Some(ExtendedType::Object(_)))
    };
    let has_query = declared(definitions, "Query");
    let has_mutation = declared(definitions, "Mutation");
    let has_subscription = declared(definitions, "Subscription");
    let roots = &definitions.schema_definition;
    if roots.query.is_some() || roots.mutation.is_some() || roots.subscription.is_some() {
        return;
    }
    let roots = definitions.schema_definition.make_mut();
    if has_query {
        roots.query = Some(ComponentName::from(name!("Query")));
    }
    if has_mutation {
        roots.mutation = Some(ComponentName::from(name!("Mutation")));
    }
    if has_subscription {
        roots.subscription = Some(ComponentName::from(name!("Subscription")));
    }
}

fn check_wiring(
    definitions: &Valid<apollo_compiler::Schema>,
    wiring: &RuntimeWiring,
) -> Result<(), AssemblyError> {
    for coordinate in wiring.data_fetchers.keys() {
        match definitions.types.get(coordinate.type_name.as_str()) {
            Some(ExtendedType::Object(object))
                if object.fields.contains_key(coordinate.field_name.as_str()) => {}
            Some(ExtendedType::Object(_)) | None => {
                return Err(AssemblyError::schema_generation(format!(
                    "data fetcher bound to '{coordinate}', which is not declared"
                )));
            }
            Some(_) => {
                return Err(AssemblyError::schema_generation(format!(
                    "data fetcher bound to '{coordinate}', which is not a field of an object type"
                )));
            }
        }
    }
    for type_name in wiring.type_resolvers.keys() {
        match definitions.types.get(type_name.as_str()) {
            Some(ExtendedType::Interface(_)) | Some(ExtendedType::Union(_)) => {}
            _ => {
                return Err(AssemblyError::schema_generation(format!(
                    "type resolver bound to '{type_name}', which is not an interface or a union"
                )));
            }
        }
    }
    for scalar_name in wiring.scalars.keys() {
        match definitions.types.get(scalar_name.as_str()) {
            Some(ty @ ExtendedType::Scalar(_)) if !ty.is_built_in() => {}
            _ => {
                return Err(AssemblyError::schema_generation(format!(
                    "coercing bound to '{scalar_name}', which is not a custom scalar"
                )));
            }
        }
    }
    for (name, ty) in definitions.types.iter() {
        if matches!(ty, ExtendedType::Scalar(_))
            && !ty.is_built_in()
            && !wiring.scalars.contains_key(name.as_str())
        {
            return Err(AssemblyError::schema_generation(format!(
                "custom scalar '{name}' has no coercing"
            )));
        }
    }
    Ok(())
}
