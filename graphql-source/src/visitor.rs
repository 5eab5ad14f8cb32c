//! Schema visitors: passes over the whole schema graph that may rebind the code registry.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use apollo_compiler::schema::EnumValueDefinition;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputValueDefinition;
use tower::BoxError;

use crate::error::AssemblyError;
use crate::fetcher::DataFetcher;
use crate::fetcher::DataFetchingEnvironment;
use crate::json_ext::Value;
use crate::schema::CodeRegistryBuilder;
use crate::schema::FieldCoordinate;
use crate::schema::Schema;

/// One node of the schema graph.
#[derive(Clone, Copy, Debug)]
pub enum SchemaNode<'a> {
    /// A named type.
    Type(&'a ExtendedType),
    /// A field of an object type or of an interface.
    Field {
        parent: &'a ExtendedType,
        definition: &'a FieldDefinition,
    },
    /// An argument of a field.
    Argument {
        parent: &'a ExtendedType,
        field: &'a FieldDefinition,
        definition: &'a InputValueDefinition,
    },
    /// A value of an enum.
    EnumValue {
        parent: &'a ExtendedType,
        definition: &'a EnumValueDefinition,
    },
    /// A field of an input object type.
    InputField {
        parent: &'a ExtendedType,
        definition: &'a InputValueDefinition,
    },
}

impl SchemaNode<'_> {
    /// The coordinate of the field of an object type this node is, if any.
    pub fn object_field(&self) -> Option<FieldCoordinate> {
        match self {
            SchemaNode::Field {
                parent: parent @ ExtendedType::Object(_),
                definition,
            } => Some(FieldCoordinate::new(
                parent.name().as_str(),
                definition.name.as_str(),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaNode::Type(ty) => write!(f, "{}", ty.name()),
            SchemaNode::Field { parent, definition } => {
                write!(f, "{}.{}", parent.name(), definition.name)
            }
            SchemaNode::Argument {
                parent,
                field,
                definition,
            } => write!(f, "{}.{}({}:)", parent.name(), field.name, definition.name),
            SchemaNode::EnumValue { parent, definition } => {
                write!(f, "{}.{}", parent.name(), definition.value)
            }
            SchemaNode::InputField { parent, definition } => {
                write!(f, "{}.{}", parent.name(), definition.name)
            }
        }
    }
}

/// A pass over every node of the schema.
///
/// All visitors see a node before the traversal moves to the next one. They share the same
/// [`CodeRegistryBuilder`], so a visitor observes the bindings made by the visitors before it.
pub trait SchemaVisitor: Send + Sync + 'static {
    /// Names the visitor in errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn visit(
        &self,
        node: &SchemaNode<'_>,
        registry: &mut CodeRegistryBuilder,
    ) -> Result<(), BoxError>;
}

impl<F> SchemaVisitor for F
where
    F: Fn(&SchemaNode<'_>, &mut CodeRegistryBuilder) -> Result<(), BoxError>
        + Send
        + Sync
        + 'static,
{
    fn visit(
        &self,
        node: &SchemaNode<'_>,
        registry: &mut CodeRegistryBuilder,
    ) -> Result<(), BoxError> {
        (self)(node, registry)
    }
}

/// Runs `visitors`, then the [`ContextDataFetcherDecorator`], over every node of `schema`.
///
/// Returns a schema sharing the type definitions of `schema` with the rebound code registry.
pub fn apply_type_visitors(
    schema: &Schema,
    visitors: &[Arc<dyn SchemaVisitor>],
) -> Result<Schema, AssemblyError> {
    let decorator: Arc<dyn SchemaVisitor> = Arc::new(ContextDataFetcherDecorator);
    let visitors = visitors
        .iter()
        .chain(std::iter::once(&decorator))
        .collect::<Vec<_>>();

    let transformed = schema.transform_code_registry(|registry| {
        traverse(schema.definitions(), |node| {
            for visitor in &visitors {
                visitor
                    .visit(node, registry)
                    .map_err(|source| AssemblyError::VisitorFailure {
                        visitor: visitor.name().to_string(),
                        source,
                    })?;
            }
            Ok(())
        })
    })?;
    tracing::debug!(visitors = visitors.len(), "applied schema visitors");
    Ok(transformed)
}

/// Visits every node of `schema` once, depth first.
///
/// Types reachable from the root operations come first, then the other declared types in
/// declaration order. A type is visited before its fields, a field before its arguments.
/// Introspection types are skipped.
pub(crate) fn traverse<'a, E>(
    schema: &'a apollo_compiler::Schema,
    mut visit: impl FnMut(&SchemaNode<'a>) -> Result<(), E>,
) -> Result<(), E> {
    let roots = &schema.schema_definition;
    let roots = [&roots.query, &roots.mutation, &roots.subscription]
        .into_iter()
        .flatten()
        .map(|root| root.name.as_str());
    let declared = schema
        .types
        .iter()
        .filter(|(_, ty)| !ty.is_built_in())
        .map(|(name, _)| name.as_str());

    let mut visited = HashSet::new();
    for name in roots.chain(declared) {
        visit_type(schema, name, &mut visited, &mut visit)?;
    }
    Ok(())
}

fn visit_type<'a, E>(
    schema: &'a apollo_compiler::Schema,
    name: &str,
    visited: &mut HashSet<&'a str>,
    visit: &mut impl FnMut(&SchemaNode<'a>) -> Result<(), E>,
) -> Result<(), E> {
    let Some((name, ty)) = schema.types.get_key_value(name) else {
        return Ok(());
    };
    if name.starts_with("__") || !visited.insert(name.as_str()) {
        return Ok(());
    }
    visit(&SchemaNode::Type(ty))?;

    let mut referenced: Vec<&'a str> = Vec::new();
    match ty {
        ExtendedType::Object(object) => {
            referenced.extend(object.implements_interfaces.iter().map(|i| i.name.as_str()));
            for field in object.fields.values() {
                visit_field(ty, field, &mut referenced, visit)?;
            }
        }
        ExtendedType::Interface(interface) => {
            referenced.extend(
                interface
                    .implements_interfaces
                    .iter()
                    .map(|i| i.name.as_str()),
            );
            for field in interface.fields.values() {
                visit_field(ty, field, &mut referenced, visit)?;
            }
        }
        ExtendedType::Union(union) => {
            referenced.extend(union.members.iter().map(|m| m.name.as_str()));
        }
        ExtendedType::Enum(enum_) => {
            for value in enum_.values.values() {
                visit(&SchemaNode::EnumValue {
                    parent: ty,
                    definition: value,
                })?;
            }
        }
        ExtendedType::InputObject(input) => {
            for field in input.fields.values() {
                visit(&SchemaNode::InputField {
                    parent: ty,
                    definition: field,
                })?;
                referenced.push(field.ty.inner_named_type().as_str());
            }
        }
        ExtendedType::Scalar(_) => {}
    }

    for name in referenced {
        visit_type(schema, name, visited, visit)?;
    }
    Ok(())
}

fn visit_field<'a, E>(
    parent: &'a ExtendedType,
    field: &'a FieldDefinition,
    referenced: &mut Vec<&'a str>,
    visit: &mut impl FnMut(&SchemaNode<'a>) -> Result<(), E>,
) -> Result<(), E> {
    visit(&SchemaNode::Field {
        parent,
        definition: field,
    })?;
    for argument in &field.arguments {
        visit(&SchemaNode::Argument {
            parent,
            field,
            definition: argument,
        })?;
    }
    referenced.push(field.ty.inner_named_type().as_str());
    referenced.extend(
        field
            .arguments
            .iter()
            .map(|argument| argument.ty.inner_named_type().as_str()),
    );
    Ok(())
}

/// Wraps the data fetcher of every object field so that the request [`crate::Context`] is the
/// current one while the fetcher runs.
///
/// Always the last visitor of [`apply_type_visitors`]. Fields without a bound data fetcher get
/// their default property fetcher wrapped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContextDataFetcherDecorator;

impl SchemaVisitor for ContextDataFetcherDecorator {
    fn name(&self) -> &str {
        "context_data_fetcher_decorator"
    }

    fn visit(
        &self,
        node: &SchemaNode<'_>,
        registry: &mut CodeRegistryBuilder,
    ) -> Result<(), BoxError> {
        if let Some(coordinate) = node.object_field() {
            let inner = registry.data_fetcher(&coordinate);
            if !inner.installs_context() {
                registry.set_data_fetcher(coordinate, Arc::new(ContextDataFetcher { inner }));
            }
        }
        Ok(())
    }
}

struct ContextDataFetcher {
    inner: Arc<dyn DataFetcher>,
}

#[async_trait::async_trait]
impl DataFetcher for ContextDataFetcher {
    async fn get(&self, environment: DataFetchingEnvironment) -> Result<Value, BoxError> {
        let context = environment.context().clone();
        context.scope(self.inner.get(environment)).await
    }

    fn installs_context(&self) -> bool {
        true
    }
}
