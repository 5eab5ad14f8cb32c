//! Logic for loading configuration in to an object model

use std::path::Path;
use std::path::PathBuf;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file '{path}': {error}
    CannotReadConfiguration {
        path: PathBuf,
        error: std::io::Error,
    },
    /// could not read schema location '{location}': {error}
    CannotReadSchemaLocation {
        location: PathBuf,
        error: std::io::Error,
    },
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration of a GraphQL source.
///
/// Can be created through `serde::Deserialize` from various formats, usually YAML with
/// [`Configuration::from_yaml`].
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Where the schema fragments are found.
    #[serde(default)]
    pub schema: SchemaLocations,

    /// Introspection queries
    /// enabled by default
    #[serde(default = "default_introspection")]
    pub introspection: bool,

    /// Limits applied to every operation.
    #[serde(default)]
    pub limits: Limits,
}

fn default_introspection() -> bool {
    true
}

fn default_locations() -> Vec<PathBuf> {
    vec![PathBuf::from("graphql")]
}

fn default_file_extensions() -> Vec<String> {
    vec![".graphqls".to_string(), ".gqls".to_string()]
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(
        schema: Option<SchemaLocations>,
        introspection: Option<bool>,
        limits: Option<Limits>,
    ) -> Self {
        Self {
            schema: schema.unwrap_or_default(),
            introspection: introspection.unwrap_or_else(default_introspection),
            limits: limits.unwrap_or_default(),
        }
    }

    /// Parses and validates YAML configuration. Empty input yields the defaults.
    pub fn from_yaml(raw_yaml: &str) -> Result<Self, ConfigurationError> {
        let configuration: Configuration = if raw_yaml.trim().is_empty() {
            Configuration::default()
        } else {
            serde_yaml::from_str(raw_yaml).map_err(|e| {
                ConfigurationError::InvalidConfiguration {
                    message: "failed to parse yaml",
                    error: e.to_string(),
                }
            })?
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Reads and validates a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw_yaml = std::fs::read_to_string(path).map_err(|error| {
            ConfigurationError::CannotReadConfiguration {
                path: path.to_path_buf(),
                error,
            }
        })?;
        tracing::debug!(path = %path.display(), "loading configuration");
        Self::from_yaml(&raw_yaml)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.schema.file_extensions.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid schema.file_extensions",
                error: "at least one file extension is required".to_string(),
            });
        }
        if self.limits.max_depth == Some(0) || self.limits.max_complexity == Some(0) {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid limits",
                error: "limits must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}

/// Schema fragment discovery.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SchemaLocations {
    /// Files or directories holding schema fragments.
    /// Directories are searched recursively.
    /// default: ["graphql"]
    #[serde(default = "default_locations")]
    pub locations: Vec<PathBuf>,

    /// Only files ending with one of these are loaded from directories.
    /// default: [".graphqls", ".gqls"]
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,
}

#[buildstructor::buildstructor]
impl SchemaLocations {
    #[builder(visibility = "pub")]
    fn new(locations: Vec<PathBuf>, file_extensions: Vec<String>) -> Self {
        Self {
            locations: if locations.is_empty() {
                default_locations()
            } else {
                locations
            },
            file_extensions: if file_extensions.is_empty() {
                default_file_extensions()
            } else {
                file_extensions
            },
        }
    }
}

impl Default for SchemaLocations {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            file_extensions: default_file_extensions(),
        }
    }
}

/// Operation limits. Unset limits are not enforced.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Maximum depth of an operation's selection set.
    pub max_depth: Option<usize>,

    /// Maximum complexity of an operation, each field counting for one.
    pub max_complexity: Option<usize>,
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}
