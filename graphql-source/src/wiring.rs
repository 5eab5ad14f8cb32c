//! Runtime wiring: the code bound to the schema's fields, abstract types and custom scalars.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tower::BoxError;

use crate::fetcher::DataFetcher;
use crate::fetcher::DataFetchingEnvironment;
use crate::json_ext::Value;
use crate::schema::FieldCoordinate;

/// The key holding the concrete type name of values of abstract types.
pub const TYPENAME: &str = "__typename";

/// Picks the concrete object type of a value returned for an interface or union field.
pub trait TypeResolver: Send + Sync + 'static {
    /// The name of the object type of `value`, `None` if it cannot be determined.
    fn resolve_type(&self, value: &Value, environment: &DataFetchingEnvironment) -> Option<String>;
}

impl<F> TypeResolver for F
where
    F: Fn(&Value, &DataFetchingEnvironment) -> Option<String> + Send + Sync + 'static,
{
    fn resolve_type(&self, value: &Value, environment: &DataFetchingEnvironment) -> Option<String> {
        (self)(value, environment)
    }
}

/// Resolves the type from the value's `__typename` property.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypenameResolver;

impl TypeResolver for TypenameResolver {
    fn resolve_type(&self, value: &Value, _environment: &DataFetchingEnvironment) -> Option<String> {
        value
            .as_object()
            .and_then(|object| object.get(TYPENAME))
            .and_then(|typename| typename.as_str())
            .map(str::to_string)
    }
}

/// Converts the values of a custom scalar.
pub trait Coercing: Send + Sync + 'static {
    /// Converts a value returned by a data fetcher into its response form.
    fn serialize(&self, value: &Value) -> Result<Value, BoxError>;

    /// Converts an input value (literal or variable) into the value data fetchers receive.
    fn parse_value(&self, input: &Value) -> Result<Value, BoxError>;
}

/// Field data fetchers, type resolvers and scalar coercings, keyed by schema coordinates.
///
/// Produced by [`RuntimeWiringBuilder::build`]. Later registrations for the same key replace
/// earlier ones.
#[derive(Clone, Default)]
pub struct RuntimeWiring {
    pub(crate) data_fetchers: IndexMap<FieldCoordinate, Arc<dyn DataFetcher>>,
    pub(crate) type_resolvers: IndexMap<String, Arc<dyn TypeResolver>>,
    pub(crate) default_type_resolver: Option<Arc<dyn TypeResolver>>,
    pub(crate) scalars: IndexMap<String, Arc<dyn Coercing>>,
}

impl RuntimeWiring {
    pub fn builder() -> RuntimeWiringBuilder {
        RuntimeWiringBuilder::default()
    }

    /// Folds `configurers` over an empty builder, in order.
    pub fn assemble<'a>(
        configurers: impl IntoIterator<Item = &'a Arc<dyn WiringConfigurer>>,
    ) -> RuntimeWiring {
        let mut builder = RuntimeWiring::builder();
        for configurer in configurers {
            configurer.configure(&mut builder);
        }
        let wiring = builder.build();
        tracing::debug!(
            data_fetchers = wiring.data_fetchers.len(),
            type_resolvers = wiring.type_resolvers.len(),
            scalars = wiring.scalars.len(),
            "assembled runtime wiring"
        );
        wiring
    }

    pub fn data_fetcher(&self, type_name: &str, field_name: &str) -> Option<&Arc<dyn DataFetcher>> {
        self.data_fetchers
            .get(&FieldCoordinate::new(type_name, field_name))
    }

    pub fn has_type_resolver(&self, type_name: &str) -> bool {
        self.type_resolvers.contains_key(type_name)
    }

    pub fn has_scalar(&self, scalar_name: &str) -> bool {
        self.scalars.contains_key(scalar_name)
    }
}

impl fmt::Debug for RuntimeWiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeWiring")
            .field("data_fetchers", &self.data_fetchers.keys().collect::<Vec<_>>())
            .field("type_resolvers", &self.type_resolvers.keys().collect::<Vec<_>>())
            .field("default_type_resolver", &self.default_type_resolver.is_some())
            .field("scalars", &self.scalars.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Mutable [`RuntimeWiring`] handed to every [`WiringConfigurer`].
#[derive(Default)]
pub struct RuntimeWiringBuilder {
    wiring: RuntimeWiring,
}

impl RuntimeWiringBuilder {
    /// Binds the data fetcher of `type_name.field_name`.
    pub fn data_fetcher(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        fetcher: impl DataFetcher,
    ) -> &mut Self {
        self.data_fetcher_arc(type_name, field_name, Arc::new(fetcher))
    }

    pub fn data_fetcher_arc(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        fetcher: Arc<dyn DataFetcher>,
    ) -> &mut Self {
        self.wiring
            .data_fetchers
            .insert(FieldCoordinate::new(type_name, field_name), fetcher);
        self
    }

    /// Binds the type resolver of an interface or union.
    pub fn type_resolver(
        &mut self,
        type_name: impl Into<String>,
        resolver: impl TypeResolver,
    ) -> &mut Self {
        self.wiring
            .type_resolvers
            .insert(type_name.into(), Arc::new(resolver));
        self
    }

    /// Replaces the type resolver of abstract types without their own, [`TypenameResolver`] by default.
    pub fn default_type_resolver(&mut self, resolver: impl TypeResolver) -> &mut Self {
        self.wiring.default_type_resolver = Some(Arc::new(resolver));
        self
    }

    /// Binds the coercing of a custom scalar.
    pub fn scalar(&mut self, scalar_name: impl Into<String>, coercing: impl Coercing) -> &mut Self {
        self.wiring
            .scalars
            .insert(scalar_name.into(), Arc::new(coercing));
        self
    }

    pub fn build(self) -> RuntimeWiring {
        self.wiring
    }
}

/// Contributes bindings to the runtime wiring.
pub trait WiringConfigurer: Send + Sync + 'static {
    fn configure(&self, builder: &mut RuntimeWiringBuilder);
}

impl<F> WiringConfigurer for F
where
    F: Fn(&mut RuntimeWiringBuilder) + Send + Sync + 'static,
{
    fn configure(&self, builder: &mut RuntimeWiringBuilder) {
        (self)(builder)
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::fetcher::static_value;

    fn configurer(f: impl Fn(&mut RuntimeWiringBuilder) + Send + Sync + 'static) -> Arc<dyn WiringConfigurer> {
        Arc::new(f)
    }

    #[test]
    fn configurers_apply_in_order_and_last_registration_wins() {
        let configurers = vec![
            configurer(|wiring: &mut RuntimeWiringBuilder| {
                wiring
                    .data_fetcher("Query", "a", static_value(1))
                    .data_fetcher("Query", "b", static_value("b"));
            }),
            configurer(|wiring: &mut RuntimeWiringBuilder| {
                wiring.data_fetcher("Query", "a", static_value(2));
            }),
        ];

        let wiring = RuntimeWiring::assemble(&configurers);

        assert_eq!(wiring.data_fetchers.len(), 2);
        assert_eq!(
            wiring.data_fetchers.keys().collect::<Vec<_>>(),
            vec![
                &FieldCoordinate::new("Query", "a"),
                &FieldCoordinate::new("Query", "b")
            ]
        );
        assert!(wiring.data_fetcher("Query", "a").is_some());
        assert!(wiring.data_fetcher("Query", "c").is_none());
    }

    #[tokio::test]
    async fn shadowed_fetcher_is_the_last_one() {
        let configurers = vec![
            configurer(|wiring: &mut RuntimeWiringBuilder| {
                wiring.data_fetcher("Query", "a", static_value(1));
            }),
            configurer(|wiring: &mut RuntimeWiringBuilder| {
                wiring.data_fetcher("Query", "a", static_value(2));
            }),
        ];
        let wiring = RuntimeWiring::assemble(&configurers);
        let env = crate::fetcher::DataFetchingEnvironment::builder()
            .coordinate(FieldCoordinate::new("Query", "a"))
            .schema(std::sync::Arc::new(
                apollo_compiler::Schema::parse_and_validate("type Query { a: Int }", "a.graphqls")
                    .unwrap(),
            ))
            .build();

        let fetcher = wiring.data_fetcher("Query", "a").unwrap();
        assert_eq!(fetcher.get(env).await.unwrap(), json!(2));
    }

    #[test]
    fn typename_resolver_reads_the_typename_property() {
        let env = crate::fetcher::DataFetchingEnvironment::builder()
            .coordinate(FieldCoordinate::new("Query", "a"))
            .schema(std::sync::Arc::new(
                apollo_compiler::Schema::parse_and_validate("type Query { a: Int }", "a.graphqls")
                    .unwrap(),
            ))
            .build();

        assert_eq!(
            TypenameResolver.resolve_type(&json!({"__typename": "Dog"}), &env),
            Some("Dog".to_string())
        );
        assert_eq!(TypenameResolver.resolve_type(&json!({"name": "Rex"}), &env), None);
    }

    #[test]
    fn empty_wiring_has_no_bindings() {
        let wiring = RuntimeWiring::assemble(&[]);
        assert!(wiring.data_fetchers.is_empty());
        assert!(!wiring.has_type_resolver("Pet"));
        assert!(!wiring.has_scalar("Date"));
        assert!(wiring.default_type_resolver.is_none());
    }
}
