//! The execution engine: the executable schema compiled for the executor, the fault handler and
//! the instrumentation.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputValueDefinition;
use async_graphql::dynamic;
use async_graphql::dynamic::FieldFuture;
use async_graphql::dynamic::FieldValue;
use async_graphql::dynamic::ResolverContext;
use async_graphql::dynamic::TypeRef;
use async_graphql::PathSegment;
use async_graphql::QueryPathNode;
use async_graphql::QueryPathSegment;
use async_graphql::ServerResult;
use async_graphql::Value as ConstValue;
use async_graphql::extensions::Extension;
use async_graphql::extensions::ExtensionContext;
use async_graphql::extensions::ExtensionFactory;
use async_graphql::extensions::NextResolve;
use async_graphql::extensions::ResolveInfo;
use dashmap::DashSet;
use futures::FutureExt;
use parking_lot::Mutex;
use tower::BoxError;

use crate::context::Context;
use crate::error::AssemblyError;
use crate::exception::DataFetcherExceptionHandler;
use crate::exception::ExceptionResolversExceptionHandler;
use crate::fetcher::DataFetcher;
use crate::fetcher::DataFetchingEnvironment;
use crate::graphql;
use crate::instrumentation::ExecutionParameters;
use crate::instrumentation::Instrumentation;
use crate::instrumentation::InstrumentationExtension;
use crate::instrumentation::Outcome;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::from_graphql_value;
use crate::json_ext::to_graphql_value;
use crate::schema::FieldCoordinate;
use crate::schema::Schema;
use crate::wiring::Coercing;
use crate::wiring::TypeResolver;

/// Configures a [`GraphQlEngine`] before it is built.
pub struct EngineBuilder {
    schema: Schema,
    exception_handler: Arc<dyn DataFetcherExceptionHandler>,
    instrumentation: Option<Arc<dyn Instrumentation>>,
    introspection: bool,
    max_depth: Option<usize>,
    max_complexity: Option<usize>,
}

impl EngineBuilder {
    /// A builder for `schema`, with introspection enabled, no limits, no instrumentation and an
    /// exception handler without resolvers.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            exception_handler: Arc::new(ExceptionResolversExceptionHandler::default()),
            instrumentation: None,
            introspection: true,
            max_depth: None,
            max_complexity: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Replaces the handler turning data fetcher faults into errors.
    pub fn exception_handler(&mut self, handler: impl DataFetcherExceptionHandler) -> &mut Self {
        self.exception_handler = Arc::new(handler);
        self
    }

    pub fn instrumentation(&mut self, instrumentation: Arc<dyn Instrumentation>) -> &mut Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    pub fn introspection(&mut self, enabled: bool) -> &mut Self {
        self.introspection = enabled;
        self
    }

    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn max_complexity(&mut self, max_complexity: usize) -> &mut Self {
        self.max_complexity = Some(max_complexity);
        self
    }

    /// Compiles the schema for the executor.
    pub fn build(self) -> Result<GraphQlEngine, AssemblyError> {
        let definitions = self.schema.definitions();
        let query = definitions
            .schema_definition
            .query
            .as_ref()
            .ok_or_else(|| {
                AssemblyError::EngineBuildFailure("the schema has no query root type".to_string())
            })?;
        let mutation = definitions
            .schema_definition
            .mutation
            .as_ref()
            .map(|mutation| mutation.name.as_str());

        let mut executor = dynamic::Schema::build(query.name.as_str(), mutation, None)
            .extension(FieldErrorExtension);
        for ty in definitions.types.values() {
            if !ty.is_built_in() {
                executor = executor.register(self.compile_type(ty)?);
            }
        }
        if let Some(instrumentation) = &self.instrumentation {
            executor = executor.extension(InstrumentationExtension::new(instrumentation.clone()));
        }
        if !self.introspection {
            executor = executor.disable_introspection();
        }
        if let Some(max_depth) = self.max_depth {
            executor = executor.limit_depth(max_depth);
        }
        if let Some(max_complexity) = self.max_complexity {
            executor = executor.limit_complexity(max_complexity);
        }
        let executor = executor
            .finish()
            .map_err(|error| AssemblyError::EngineBuildFailure(error.to_string()))?;

        tracing::debug!(
            introspection = self.introspection,
            max_depth = ?self.max_depth,
            max_complexity = ?self.max_complexity,
            instrumented = self.instrumentation.is_some(),
            "built execution engine"
        );
        Ok(GraphQlEngine {
            executor,
            instrumentation: self.instrumentation,
        })
    }

    fn compile_type(&self, ty: &ExtendedType) -> Result<dynamic::Type, AssemblyError> {
        Ok(match ty {
            ExtendedType::Scalar(scalar) => {
                // Inputs go through the coercing when arguments are parsed, outputs when
                // values are completed.
                let mut compiled = dynamic::Scalar::new(scalar.name.as_str());
                if let Some(description) = &scalar.description {
                    compiled = compiled.description(description.to_string());
                }
                compiled.into()
            }
            ExtendedType::Object(object) => {
                let mut compiled = dynamic::Object::new(object.name.as_str());
                if let Some(description) = &object.description {
                    compiled = compiled.description(description.to_string());
                }
                for interface in object.implements_interfaces.iter() {
                    compiled = compiled.implement(interface.name.as_str());
                }
                for field in object.fields.values() {
                    compiled = compiled.field(self.compile_field(&object.name, field)?);
                }
                compiled.into()
            }
            ExtendedType::Interface(interface) => {
                let mut compiled = dynamic::Interface::new(interface.name.as_str());
                if let Some(description) = &interface.description {
                    compiled = compiled.description(description.to_string());
                }
                for implemented in interface.implements_interfaces.iter() {
                    compiled = compiled.implement(implemented.name.as_str());
                }
                for field in interface.fields.values() {
                    let mut compiled_field =
                        dynamic::InterfaceField::new(field.name.as_str(), type_ref(&field.ty));
                    for argument in &field.arguments {
                        compiled_field = compiled_field.argument(input_value(argument));
                    }
                    compiled = compiled.field(compiled_field);
                }
                compiled.into()
            }
            ExtendedType::Union(union) => {
                let mut compiled = dynamic::Union::new(union.name.as_str());
                if let Some(description) = &union.description {
                    compiled = compiled.description(description.to_string());
                }
                for member in union.members.iter() {
                    compiled = compiled.possible_type(member.name.as_str());
                }
                compiled.into()
            }
            ExtendedType::Enum(enum_) => {
                let mut compiled = dynamic::Enum::new(enum_.name.as_str());
                if let Some(description) = &enum_.description {
                    compiled = compiled.description(description.to_string());
                }
                for value in enum_.values.values() {
                    let mut item = dynamic::EnumItem::new(value.value.as_str());
                    if let Some(description) = &value.description {
                        item = item.description(description.to_string());
                    }
                    compiled = compiled.item(item);
                }
                compiled.into()
            }
            ExtendedType::InputObject(input) => {
                let mut compiled = dynamic::InputObject::new(input.name.as_str());
                if let Some(description) = &input.description {
                    compiled = compiled.description(description.to_string());
                }
                for field in input.fields.values() {
                    compiled = compiled.field(input_value(field));
                }
                compiled.into()
            }
        })
    }

    fn compile_field(
        &self,
        type_name: &str,
        field: &FieldDefinition,
    ) -> Result<dynamic::Field, AssemblyError> {
        let coordinate = FieldCoordinate::new(type_name, field.name.as_str());
        let resolver = Arc::new(FieldResolver {
            fetcher: self.schema.code_registry().data_fetcher(&coordinate),
            output: self.shape(&field.ty)?,
            arguments: field.arguments.clone(),
            coordinate,
            schema: self.schema.clone(),
            exception_handler: self.exception_handler.clone(),
            instrumentation: self.instrumentation.clone(),
        });

        let mut compiled = dynamic::Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
            let resolver = resolver.clone();
            FieldFuture::new(async move { resolver.resolve(ctx).await })
        });
        if let Some(description) = &field.description {
            compiled = compiled.description(description.to_string());
        }
        if let Some(deprecated) = field.directives.get("deprecated") {
            let reason = deprecated
                .specified_argument_by_name("reason")
                .and_then(|reason| reason.as_str().map(str::to_string));
            compiled = compiled.deprecation(reason.as_deref());
        }
        for argument in &field.arguments {
            compiled = compiled.argument(input_value(argument));
        }
        Ok(compiled)
    }

    fn shape(&self, ty: &ast::Type) -> Result<Shape, AssemblyError> {
        let named = match ty {
            ast::Type::List(inner) | ast::Type::NonNullList(inner) => {
                return Ok(Shape::List {
                    item: Box::new(self.shape(inner)?),
                    nullable_items: !inner.is_non_null(),
                });
            }
            ast::Type::Named(named) | ast::Type::NonNullNamed(named) => named,
        };
        Ok(match self.schema.definitions().types.get(named) {
            Some(ty @ ExtendedType::Scalar(_)) if ty.is_built_in() => Shape::Leaf,
            Some(ExtendedType::Scalar(scalar)) => Shape::CustomScalar(self.coercing(&scalar.name)?),
            Some(ExtendedType::Enum(_)) => Shape::Enum,
            Some(ExtendedType::Object(_)) => Shape::Object,
            Some(ExtendedType::Interface(_)) | Some(ExtendedType::Union(_)) => {
                Shape::Abstract(self.schema.code_registry().type_resolver(named))
            }
            Some(ExtendedType::InputObject(_)) | None => {
                return Err(AssemblyError::EngineBuildFailure(format!(
                    "'{named}' is not an output type"
                )));
            }
        })
    }

    fn coercing(&self, scalar_name: &str) -> Result<Arc<dyn Coercing>, AssemblyError> {
        self.schema
            .code_registry()
            .coercing(scalar_name)
            .ok_or_else(|| {
                AssemblyError::EngineBuildFailure(format!(
                    "custom scalar '{scalar_name}' has no coercing"
                ))
            })
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("introspection", &self.introspection)
            .field("max_depth", &self.max_depth)
            .field("max_complexity", &self.max_complexity)
            .field("instrumented", &self.instrumentation.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs last on the [`EngineBuilder`], after the schema, exception handler and instrumentation
/// are set.
pub trait EngineConfigurer: Send + Sync + 'static {
    fn configure(&self, builder: &mut EngineBuilder);
}

impl<F> EngineConfigurer for F
where
    F: Fn(&mut EngineBuilder) + Send + Sync + 'static,
{
    fn configure(&self, builder: &mut EngineBuilder) {
        (self)(builder)
    }
}

/// Executes GraphQL requests against one executable schema.
///
/// Immutable: any number of requests may run concurrently.
#[derive(Clone)]
pub struct GraphQlEngine {
    executor: dynamic::Schema,
    instrumentation: Option<Arc<dyn Instrumentation>>,
}

impl GraphQlEngine {
    /// Executes `request`. Data fetchers reach `context` through their environment and
    /// [`Context::current`].
    pub async fn execute(
        &self,
        request: impl Into<graphql::Request>,
        context: Context,
    ) -> graphql::Response {
        let request = request.into();
        let instrumentation = self.instrumentation.as_ref().and_then(|instrumentation| {
            instrumentation.begin_execution(&ExecutionParameters {
                request: &request,
                context: &context,
            })
        });

        let completion = Arc::new(Completion::default());
        let mut executor_request = async_graphql::Request::new(request.query.as_str())
            .variables(async_graphql::Variables::from_value(to_graphql_value(
                &Value::Object(request.variables.clone()),
            )))
            .data(context.clone())
            .data(request.clone())
            .data(completion.clone());
        if let Some(operation_name) = &request.operation_name {
            executor_request = executor_request.operation_name(operation_name.as_str());
        }
        let mut response = graphql::Response::from_executor_response(
            self.executor.execute(executor_request).await,
        );
        response.errors.append(&mut completion.errors.lock());

        if let Some(instrumentation) = instrumentation {
            instrumentation.complete(&Outcome::from_errors(
                response.errors.iter().map(|error| error.message.as_str()),
            ));
        }
        tracing::debug!(
            execution_id = %context.execution_id(),
            errors = response.errors.len(),
            "executed request"
        );
        response
    }

    /// The schema as the executor sees it, printed as SDL.
    pub fn sdl(&self) -> String {
        self.executor.sdl()
    }
}

impl fmt::Debug for GraphQlEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQlEngine")
            .field("instrumented", &self.instrumentation.is_some())
            .finish_non_exhaustive()
    }
}

/// How a fetched value is completed.
enum Shape {
    List {
        item: Box<Shape>,
        nullable_items: bool,
    },
    Leaf,
    Enum,
    CustomScalar(Arc<dyn Coercing>),
    Object,
    Abstract(Arc<dyn TypeResolver>),
}

/// The value of an object, handed to the data fetchers of its fields.
struct Source {
    value: Value,
    path: Path,
}

struct FieldResolver {
    coordinate: FieldCoordinate,
    fetcher: Arc<dyn DataFetcher>,
    output: Shape,
    arguments: Vec<Node<InputValueDefinition>>,
    schema: Schema,
    exception_handler: Arc<dyn DataFetcherExceptionHandler>,
    instrumentation: Option<Arc<dyn Instrumentation>>,
}

impl FieldResolver {
    async fn resolve(
        &self,
        ctx: ResolverContext<'_>,
    ) -> Result<Option<FieldValue<'static>>, async_graphql::Error> {
        let (source, mut path) = match ctx.parent_value.try_downcast_ref::<Source>() {
            Ok(source) => (source.value.clone(), source.path.clone()),
            Err(_) => (Value::Null, Path::empty()),
        };
        let field = ctx.ctx.field();
        path.push(PathElement::Key(
            field.alias().unwrap_or_else(|| field.name()).to_string(),
        ));
        let context = ctx.ctx.data_opt::<Context>().cloned().unwrap_or_default();
        let completion = ctx.ctx.data_opt::<Arc<Completion>>().cloned();
        let raw_arguments: Object = ctx
            .args
            .iter()
            .map(|(name, value)| (name.as_str().into(), from_graphql_value(value.as_value())))
            .collect();

        let (arguments, argument_fault) = match self.parse_arguments(raw_arguments.clone()) {
            Ok(arguments) => (arguments, None),
            Err(fault) => (raw_arguments, Some(fault)),
        };

        let environment = DataFetchingEnvironment::builder()
            .coordinate(self.coordinate.clone())
            .source(source)
            .arguments(arguments)
            .path(path.clone())
            .context(context)
            .schema(self.schema.shared_definitions())
            .build();
        let result = match argument_fault {
            Some(fault) => Err(fault),
            None => self.fetch(&environment).await.and_then(|value| {
                self.complete(&self.output, value, path, &environment, completion.as_deref())
            }),
        };

        match result {
            Ok(value) => Ok(value),
            Err(fault) => Err(self
                .exception_handler
                .handle_exception(fault, &environment)
                .await
                .into_field_error()),
        }
    }

    async fn fetch(&self, environment: &DataFetchingEnvironment) -> Result<Value, BoxError> {
        let instrumentation = self
            .instrumentation
            .as_ref()
            .and_then(|instrumentation| instrumentation.begin_field_fetch(environment));
        let result = AssertUnwindSafe(self.fetcher.get(environment.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_fault(panic)));
        if let Some(instrumentation) = instrumentation {
            instrumentation.complete(&match &result {
                Ok(_) => Outcome::Success,
                Err(fault) => Outcome::Failure(fault.to_string()),
            });
        }
        result
    }

    fn parse_arguments(&self, raw_arguments: Object) -> Result<Object, BoxError> {
        let mut arguments = Object::new();
        for (name, value) in raw_arguments {
            let value = match self
                .arguments
                .iter()
                .find(|argument| argument.name.as_str() == name.as_str())
            {
                Some(argument) => parse_input(&self.schema, &argument.ty, value)?,
                None => value,
            };
            arguments.insert(name, value);
        }
        Ok(arguments)
    }

    /// Completes a fetched value. `None` completes as null.
    fn complete(
        &self,
        shape: &Shape,
        value: Value,
        path: Path,
        environment: &DataFetchingEnvironment,
        completion: Option<&Completion>,
    ) -> Result<Option<FieldValue<'static>>, BoxError> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(match shape {
            Shape::List {
                item,
                nullable_items,
            } => {
                let Value::Array(items) = value else {
                    return Err(format!("expected a list for '{}' at {path}", self.coordinate).into());
                };
                let mut completed = Vec::with_capacity(items.len());
                for (index, item_value) in items.into_iter().enumerate() {
                    let mut item_path = path.clone();
                    item_path.push(PathElement::Index(index));
                    match self.complete(item, item_value, item_path.clone(), environment, completion)? {
                        Some(value) => completed.push(value),
                        None if *nullable_items => {
                            if let Some(completion) = completion {
                                completion.null_items.insert(item_path);
                            }
                            completed.push(FieldValue::NULL);
                        }
                        None => {
                            return Err(format!(
                                "cannot return null for the non-null list item at {item_path} of '{}'",
                                self.coordinate
                            )
                            .into());
                        }
                    }
                }
                FieldValue::list(completed)
            }
            Shape::Leaf => FieldValue::value(to_graphql_value(&value)),
            Shape::Enum => match value {
                Value::String(name) => {
                    FieldValue::value(ConstValue::Enum(async_graphql::Name::new(name.as_str())))
                }
                other => FieldValue::value(to_graphql_value(&other)),
            },
            Shape::CustomScalar(coercing) => {
                FieldValue::value(to_graphql_value(&coercing.serialize(&value)?))
            }
            Shape::Object => FieldValue::owned_any(Source { value, path }),
            Shape::Abstract(resolver) => {
                let type_name = resolver.resolve_type(&value, environment).ok_or_else(|| {
                    format!(
                        "could not resolve the object type of the value returned for '{}' at {path}",
                        self.coordinate
                    )
                })?;
                FieldValue::owned_any(Source { value, path }).with_type(type_name)
            }
        }))
    }
}

/// What one execution reports besides the executor's own errors.
#[derive(Default)]
struct Completion {
    errors: Mutex<Vec<graphql::Error>>,
    /// Null items of lists. The executor would otherwise complete them against the item type.
    null_items: DashSet<Path>,
}

/// Nulls a nullable field or list item that failed and reports its error. The error of a
/// non-null position propagates to the closest nullable parent.
struct FieldErrorExtension;

impl ExtensionFactory for FieldErrorExtension {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(FieldErrorExtension)
    }
}

#[async_trait::async_trait]
impl Extension for FieldErrorExtension {
    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<Option<ConstValue>> {
        let Some(completion) = ctx.data_opt::<Arc<Completion>>() else {
            return next.run(ctx, info).await;
        };
        let path = response_path(info.path_node);
        if !completion.null_items.is_empty()
            && completion
                .null_items
                .contains(&Path::from_response_path(&path))
        {
            return Ok(None);
        }
        let nullable = !info.return_type.ends_with('!');

        match next.run(ctx, info).await {
            Ok(value) => Ok(value),
            Err(mut error) => {
                if error.path.is_empty() {
                    error.path = path;
                }
                if !nullable {
                    return Err(error);
                }
                tracing::debug!(error = %error.message, "nulled a failed field");
                completion
                    .errors
                    .lock()
                    .push(graphql::Error::from_server_error(error));
                Ok(None)
            }
        }
    }
}

fn response_path(node: &QueryPathNode<'_>) -> Vec<PathSegment> {
    let mut path: Vec<PathSegment> = std::iter::once(node)
        .chain(node.parents())
        .map(|node| match node.segment {
            QueryPathSegment::Name(name) => PathSegment::Field(name.to_string()),
            QueryPathSegment::Index(index) => PathSegment::Index(index),
        })
        .collect();
    path.reverse();
    path
}

/// Applies the coercings of custom scalars to an input value.
fn parse_input(schema: &Schema, ty: &ast::Type, value: Value) -> Result<Value, BoxError> {
    if value.is_null() {
        return Ok(value);
    }
    match ty {
        ast::Type::List(inner) | ast::Type::NonNullList(inner) => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| parse_input(schema, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => parse_input(schema, inner, single),
        },
        ast::Type::Named(named) | ast::Type::NonNullNamed(named) => {
            match schema.definitions().types.get(named) {
                Some(ty @ ExtendedType::Scalar(_)) if !ty.is_built_in() => {
                    match schema.code_registry().coercing(named) {
                        Some(coercing) => coercing.parse_value(&value),
                        None => Ok(value),
                    }
                }
                Some(ExtendedType::InputObject(input)) => match value {
                    Value::Object(object) => {
                        let mut parsed = Object::new();
                        for (name, field_value) in object {
                            let field_value = match input.fields.get(name.as_str()) {
                                Some(field) => parse_input(schema, &field.ty, field_value)?,
                                None => field_value,
                            };
                            parsed.insert(name, field_value);
                        }
                        Ok(Value::Object(parsed))
                    }
                    other => Ok(other),
                },
                _ => Ok(value),
            }
        }
    }
}

fn panic_fault(panic: Box<dyn Any + Send>) -> BoxError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("data fetcher panicked: {message}").into()
}

fn type_ref(ty: &ast::Type) -> TypeRef {
    match ty {
        ast::Type::Named(named) => TypeRef::Named(named.to_string().into()),
        ast::Type::NonNullNamed(named) => {
            TypeRef::NonNull(Box::new(TypeRef::Named(named.to_string().into())))
        }
        ast::Type::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
        ast::Type::NonNullList(inner) => {
            TypeRef::NonNull(Box::new(TypeRef::List(Box::new(type_ref(inner)))))
        }
    }
}

fn input_value(definition: &InputValueDefinition) -> dynamic::InputValue {
    let mut compiled = dynamic::InputValue::new(definition.name.as_str(), type_ref(&definition.ty));
    if let Some(description) = &definition.description {
        compiled = compiled.description(description.to_string());
    }
    if let Some(default_value) = &definition.default_value {
        compiled = compiled.default_value(const_value(default_value));
    }
    compiled
}

/// Converts an SDL literal (a default value) for the executor.
fn const_value(value: &ast::Value) -> ConstValue {
    match value {
        ast::Value::Null | ast::Value::Variable(_) => ConstValue::Null,
        ast::Value::Enum(name) => ConstValue::Enum(async_graphql::Name::new(name.as_str())),
        ast::Value::String(string) => ConstValue::String(string.to_string()),
        ast::Value::Boolean(boolean) => ConstValue::Boolean(*boolean),
        ast::Value::Int(int) => match int.try_to_i32() {
            Ok(int) => ConstValue::Number(int.into()),
            Err(_) => int
                .try_to_f64()
                .ok()
                .and_then(async_graphql::Number::from_f64)
                .map(ConstValue::Number)
                .unwrap_or(ConstValue::Null),
        },
        ast::Value::Float(float) => float
            .try_to_f64()
            .ok()
            .and_then(async_graphql::Number::from_f64)
            .map(ConstValue::Number)
            .unwrap_or(ConstValue::Null),
        ast::Value::List(items) => ConstValue::List(items.iter().map(|item| const_value(item)).collect()),
        ast::Value::Object(fields) => ConstValue::Object(
            fields
                .iter()
                .map(|(name, value)| (async_graphql::Name::new(name.as_str()), const_value(value)))
                .collect(),
        ),
    }
}
