//! The type registry: every type, field and directive declared by the schema fragments.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::DirectiveDefinition;
use apollo_compiler::schema::DirectiveList;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputValueDefinition;

use crate::error::AssemblyError;
use crate::error::NoSchemaReason;
use crate::error::ParseErrors;
use crate::resource::SchemaResource;

/// Merged, not yet validated, type definitions.
///
/// Registries are parsed from one fragment each and folded together with [`TypeRegistry::merge`].
/// Two fragments may declare the same type as long as their declarations are compatible: fields,
/// enum values, union members and implemented interfaces are unioned, while a field declared
/// twice with a different type or different arguments is a conflict.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    schema: Schema,
}

impl TypeRegistry {
    /// An empty registry, only containing the built-in types and directives.
    pub fn new() -> Self {
        Self {
            schema: Schema::new(),
        }
    }

    /// Parses one schema fragment.
    ///
    /// Type extensions whose base type lives in another fragment are adopted as definitions so
    /// that the merge can pick them up. A fragment holding only whitespace and comments declares
    /// nothing. Root operations are only recorded when a `schema` definition or extension names
    /// them.
    pub fn parse(sdl: &str, path: impl AsRef<Path>) -> Result<Self, ParseErrors> {
        if is_blank(sdl) {
            return Ok(Self::new());
        }
        let mut schema = Schema::builder()
            .adopt_orphan_extensions()
            .parse(sdl, path)
            .build()?;
        drop_implicit_root_operations(&mut schema);
        Ok(Self { schema })
    }

    /// Loads, parses and merges all fragments, left to right.
    pub fn from_resources(resources: &[Arc<dyn SchemaResource>]) -> Result<Self, AssemblyError> {
        if resources.is_empty() {
            return Err(AssemblyError::NoSchemaProvided(NoSchemaReason::NoResources));
        }
        let mut registry = TypeRegistry::new();
        for resource in resources {
            registry = registry.merge(load(resource.as_ref())?)?;
        }
        if registry.is_empty() {
            return Err(AssemblyError::NoSchemaProvided(NoSchemaReason::EmptyRegistry));
        }
        tracing::debug!(
            fragments = resources.len(),
            types = registry.types().count(),
            "merged schema fragments"
        );
        Ok(registry)
    }

    /// Merges `other` into this registry.
    pub fn merge(mut self, other: TypeRegistry) -> Result<Self, AssemblyError> {
        self.merge_schema_definition(&other.schema)?;
        for (name, directive) in other.schema.directive_definitions.iter() {
            match self.schema.directive_definitions.get(name) {
                Some(existing) => compare_directive_definitions(existing, directive)
                    .map_err(|reason| AssemblyError::conflict(format!("@{name}"), reason))?,
                None => {
                    self.schema
                        .directive_definitions
                        .insert(name.clone(), directive.clone());
                }
            }
        }
        for (name, ty) in other.schema.types.iter() {
            if ty.is_built_in() {
                continue;
            }
            match self.schema.types.get_mut(name) {
                Some(existing) => merge_types(existing, ty)
                    .map_err(|reason| AssemblyError::conflict(name, reason))?,
                None => {
                    self.schema.types.insert(name.clone(), ty.clone());
                }
            }
        }
        Ok(self)
    }

    /// Parses `sdl` and merges it into this registry.
    pub fn add_sdl(&mut self, sdl: &str, path: impl AsRef<Path>) -> Result<(), AssemblyError> {
        let path = path.as_ref();
        let other = TypeRegistry::parse(sdl, path).map_err(|errors| {
            AssemblyError::InvalidSchemaFragment {
                resource: path.display().to_string(),
                errors,
            }
        })?;
        *self = std::mem::take(self).merge(other)?;
        Ok(())
    }

    /// Types declared by the fragments, built-in types excluded.
    pub fn types(&self) -> impl Iterator<Item = (&Name, &ExtendedType)> {
        self.schema.types.iter().filter(|(_, ty)| !ty.is_built_in())
    }

    pub fn get_type(&self, name: &str) -> Option<&ExtendedType> {
        self.schema.types.get(name)
    }

    /// Whether no fragment declared any type.
    pub fn is_empty(&self) -> bool {
        self.types().next().is_none()
    }

    /// Direct access to the underlying definitions, for type definition configurers.
    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn into_schema(self) -> Schema {
        self.schema
    }

    fn merge_schema_definition(&mut self, other: &Schema) -> Result<(), AssemblyError> {
        let other = &other.schema_definition;
        let definition = self.schema.schema_definition.make_mut();
        for (operation, merged, new) in [
            ("query", &mut definition.query, &other.query),
            ("mutation", &mut definition.mutation, &other.mutation),
            ("subscription", &mut definition.subscription, &other.subscription),
        ] {
            if let (Some(a), Some(b)) = (&*merged, new) {
                if a.name != b.name {
                    return Err(AssemblyError::conflict(
                        "schema",
                        format!(
                            "the {operation} root type is declared as '{}' and '{}'",
                            a.name, b.name
                        ),
                    ));
                }
            }
            if merged.is_none() {
                merged.clone_from(new);
            }
        }
        if definition.description.is_none() {
            definition.description.clone_from(&other.description);
        }
        Ok(())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.schema, f)
    }
}

/// Modifies the merged type registry before the executable schema is generated.
pub trait TypeDefinitionConfigurer: Send + Sync + 'static {
    fn configure(&self, registry: &mut TypeRegistry) -> Result<(), AssemblyError>;
}

impl<F> TypeDefinitionConfigurer for F
where
    F: Fn(&mut TypeRegistry) -> Result<(), AssemblyError> + Send + Sync + 'static,
{
    fn configure(&self, registry: &mut TypeRegistry) -> Result<(), AssemblyError> {
        (self)(registry)
    }
}

fn load(resource: &dyn SchemaResource) -> Result<TypeRegistry, AssemblyError> {
    let description = resource.description();
    if !resource.exists() {
        return Err(AssemblyError::MissingOrUnreadableSchemaFragment {
            resource: description,
            reason: "resource does not exist".to_string(),
        });
    }
    let sdl = resource.read_to_string().map_err(|error| {
        AssemblyError::MissingOrUnreadableSchemaFragment {
            resource: description.clone(),
            reason: error.to_string(),
        }
    })?;
    tracing::debug!(resource = %description, "loaded schema fragment");
    TypeRegistry::parse(&sdl, &description).map_err(|errors| {
        AssemblyError::InvalidSchemaFragment {
            resource: description,
            errors,
        }
    })
}

/// Whether `sdl` holds nothing but ignored tokens.
fn is_blank(sdl: &str) -> bool {
    sdl.lines().all(|line| {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == ',' || c == '\u{feff}');
        line.is_empty() || line.starts_with('#')
    })
}

/// apollo-compiler names `Query`, `Mutation` and `Subscription` object types as roots when the
/// text has no `schema` definition. Those roots carry no source location.
fn drop_implicit_root_operations(schema: &mut Schema) {
    let definition = schema.schema_definition.make_mut();
    for root in [
        &mut definition.query,
        &mut definition.mutation,
        &mut definition.subscription,
    ] {
        if root
            .as_ref()
            .is_some_and(|root| root.name.location().is_none())
        {
            *root = None;
        }
    }
}

fn kind(ty: &ExtendedType) -> &'static str {
    match ty {
        ExtendedType::Scalar(_) => "a scalar",
        ExtendedType::Object(_) => "an object type",
        ExtendedType::Interface(_) => "an interface",
        ExtendedType::Union(_) => "a union",
        ExtendedType::Enum(_) => "an enum",
        ExtendedType::InputObject(_) => "an input object type",
    }
}

fn merge_types(merged: &mut ExtendedType, new: &ExtendedType) -> Result<(), String> {
    match (merged, new) {
        (ExtendedType::Scalar(merged), ExtendedType::Scalar(new)) => {
            let merged = merged.make_mut();
            if merged.description.is_none() {
                merged.description.clone_from(&new.description);
            }
            merge_directives(&mut merged.directives, &new.directives);
        }
        (ExtendedType::Object(merged), ExtendedType::Object(new)) => {
            let merged = merged.make_mut();
            if merged.description.is_none() {
                merged.description.clone_from(&new.description);
            }
            merge_directives(&mut merged.directives, &new.directives);
            merge_interfaces(&mut merged.implements_interfaces, &new.implements_interfaces);
            for (name, field) in new.fields.iter() {
                match merged.fields.get(name) {
                    Some(existing) => compare_fields(existing, field)?,
                    None => {
                        merged.fields.insert(name.clone(), field.clone());
                    }
                }
            }
        }
        (ExtendedType::Interface(merged), ExtendedType::Interface(new)) => {
            let merged = merged.make_mut();
            if merged.description.is_none() {
                merged.description.clone_from(&new.description);
            }
            merge_directives(&mut merged.directives, &new.directives);
            merge_interfaces(&mut merged.implements_interfaces, &new.implements_interfaces);
            for (name, field) in new.fields.iter() {
                match merged.fields.get(name) {
                    Some(existing) => compare_fields(existing, field)?,
                    None => {
                        merged.fields.insert(name.clone(), field.clone());
                    }
                }
            }
        }
        (ExtendedType::Union(merged), ExtendedType::Union(new)) => {
            let merged = merged.make_mut();
            if merged.description.is_none() {
                merged.description.clone_from(&new.description);
            }
            merge_directives(&mut merged.directives, &new.directives);
            for member in new.members.iter() {
                if !merged.members.iter().any(|m| m.name == member.name) {
                    merged.members.insert(member.clone());
                }
            }
        }
        (ExtendedType::Enum(merged), ExtendedType::Enum(new)) => {
            let merged = merged.make_mut();
            if merged.description.is_none() {
                merged.description.clone_from(&new.description);
            }
            merge_directives(&mut merged.directives, &new.directives);
            for (name, value) in new.values.iter() {
                if !merged.values.contains_key(name) {
                    merged.values.insert(name.clone(), value.clone());
                }
            }
        }
        (ExtendedType::InputObject(merged), ExtendedType::InputObject(new)) => {
            let merged = merged.make_mut();
            if merged.description.is_none() {
                merged.description.clone_from(&new.description);
            }
            merge_directives(&mut merged.directives, &new.directives);
            for (name, field) in new.fields.iter() {
                match merged.fields.get(name) {
                    Some(existing) => compare_input_values(existing, field)
                        .map_err(|reason| format!("input field '{name}' {reason}"))?,
                    None => {
                        merged.fields.insert(name.clone(), field.clone());
                    }
                }
            }
        }
        (merged, new) => {
            return Err(format!(
                "declared as {} and as {}",
                kind(merged),
                kind(new)
            ));
        }
    }
    Ok(())
}

/// Directives already applied by an earlier fragment are kept as they are.
fn merge_directives(merged: &mut DirectiveList, new: &DirectiveList) {
    for directive in new.iter() {
        if !merged.has(&directive.name) {
            merged.push(directive.clone());
        }
    }
}

fn merge_interfaces(
    merged: &mut apollo_compiler::collections::IndexSet<ComponentName>,
    new: &apollo_compiler::collections::IndexSet<ComponentName>,
) {
    for interface in new.iter() {
        if !merged.iter().any(|i| i.name == interface.name) {
            merged.insert(interface.clone());
        }
    }
}

fn compare_fields(merged: &FieldDefinition, new: &FieldDefinition) -> Result<(), String> {
    if merged.ty != new.ty {
        return Err(format!(
            "field '{}' is declared as '{}' and '{}'",
            merged.name, merged.ty, new.ty
        ));
    }
    compare_arguments(&merged.arguments, &new.arguments)
        .map_err(|reason| format!("field '{}' {reason}", merged.name))
}

fn compare_arguments(
    merged: &[Node<InputValueDefinition>],
    new: &[Node<InputValueDefinition>],
) -> Result<(), String> {
    for argument in new {
        match merged.iter().find(|a| a.name == argument.name) {
            Some(existing) => compare_input_values(existing, argument)
                .map_err(|reason| format!("argument '{}' {reason}", argument.name))?,
            None => {
                return Err(format!(
                    "declares argument '{}' only in some fragments",
                    argument.name
                ));
            }
        }
    }
    if let Some(missing) = merged
        .iter()
        .find(|a| !new.iter().any(|n| n.name == a.name))
    {
        return Err(format!(
            "declares argument '{}' only in some fragments",
            missing.name
        ));
    }
    Ok(())
}

fn compare_input_values(
    merged: &InputValueDefinition,
    new: &InputValueDefinition,
) -> Result<(), String> {
    if merged.ty != new.ty {
        return Err(format!("is declared as '{}' and '{}'", merged.ty, new.ty));
    }
    if merged.default_value != new.default_value {
        return Err("has different default values".to_string());
    }
    Ok(())
}

fn compare_directive_definitions(
    merged: &DirectiveDefinition,
    new: &DirectiveDefinition,
) -> Result<(), String> {
    if merged.repeatable != new.repeatable {
        return Err("is repeatable in only some fragments".to_string());
    }
    if merged.locations.len() != new.locations.len()
        || merged.locations.iter().any(|l| !new.locations.contains(l))
    {
        return Err("is declared with different locations".to_string());
    }
    compare_arguments(&merged.arguments, &new.arguments)
}
