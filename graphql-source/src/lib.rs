//! Assembles an immutable GraphQL execution engine from schema fragments, runtime wiring,
//! schema visitors, exception resolvers and instrumentation.

#![warn(unreachable_pub)]

pub mod json_ext;

pub mod configuration;
mod context;
pub mod engine;
pub mod error;
pub mod exception;
pub mod fetcher;
pub mod graphql;
pub mod instrumentation;
pub mod registry;
pub mod resource;
pub mod schema;
mod source;
pub mod visitor;
pub mod wiring;

pub use configuration::Configuration;
pub use context::Context;
pub use engine::EngineBuilder;
pub use engine::GraphQlEngine;
pub use error::AssemblyError;
pub use fetcher::DataFetcher;
pub use fetcher::DataFetchingEnvironment;
pub use schema::FieldCoordinate;
pub use schema::Schema;
pub use source::CachedGraphQlSource;
pub use source::GraphQlSource;
pub use source::GraphQlSourceBuilder;
