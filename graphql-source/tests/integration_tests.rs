use std::sync::Arc;
use std::sync::Mutex;

use graphql_source::AssemblyError;
use graphql_source::Configuration;
use graphql_source::Context;
use graphql_source::DataFetchingEnvironment;
use graphql_source::GraphQlSource;
use graphql_source::GraphQlSourceBuilder;
use graphql_source::error::NoSchemaReason;
use graphql_source::exception::exception_resolver_fn;
use graphql_source::fetcher::fetcher_fn;
use graphql_source::fetcher::static_value;
use graphql_source::graphql;
use graphql_source::graphql::ErrorType;
use graphql_source::instrumentation::ExecutionParameters;
use graphql_source::instrumentation::Instrumentation;
use graphql_source::instrumentation::InstrumentationContext;
use graphql_source::json_ext::Path;
use graphql_source::json_ext::Value;
use graphql_source::resource::FileResource;
use graphql_source::schema::CodeRegistryBuilder;
use graphql_source::visitor::SchemaNode;
use graphql_source::wiring::RuntimeWiringBuilder;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;
use tower::BoxError;

fn two_fragments() -> GraphQlSourceBuilder {
    GraphQlSourceBuilder::new()
        .schema_sdl("a.graphqls", "type Query { a: Int }")
        .schema_sdl("b.graphqls", "type Query { b: String }")
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring
                .data_fetcher("Query", "a", static_value(42))
                .data_fetcher("Query", "b", static_value("x"));
        })
}

#[derive(Debug)]
struct Failed(&'static str);

impl std::fmt::Display for Failed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed", self.0)
    }
}

impl std::error::Error for Failed {}

fn failing_c() -> GraphQlSourceBuilder {
    GraphQlSourceBuilder::new()
        .schema_sdl("c.graphqls", "type Query { c: Int d: Int }")
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring
                .data_fetcher(
                    "Query",
                    "c",
                    fetcher_fn(|_env: DataFetchingEnvironment| async {
                        Err::<Value, BoxError>(Box::new(Failed("c")))
                    }),
                )
                .data_fetcher("Query", "d", static_value(4));
        })
}

#[tokio::test]
async fn fragments_are_merged_and_wired() {
    let source = two_fragments().build().unwrap();

    let response = source.execute("{ a b }", Context::new()).await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(response.data, Some(json!({ "a": 42, "b": "x" })));
}

#[tokio::test]
async fn resolved_fault_nulls_the_field_and_reports_one_error() {
    let source = failing_c()
        .exception_resolver(exception_resolver_fn(
            |fault: &BoxError, _env: &DataFetchingEnvironment| {
                fault
                    .downcast_ref::<Failed>()
                    .map(|failed| graphql::Error::builder().message(failed.to_string()).build())
            },
        ))
        .build()
        .unwrap();

    let response = source.execute("{ c d }", Context::new()).await;

    assert_eq!(response.data, Some(json!({ "c": null, "d": 4 })));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "c failed");
    assert_eq!(response.errors[0].path, Some(Path::from("c")));
}

#[tokio::test]
async fn first_matching_exception_resolver_wins() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let r1_calls = calls.clone();
    let r2_calls = calls.clone();
    let source = failing_c()
        .exception_resolver(exception_resolver_fn(
            move |_fault: &BoxError, _env: &DataFetchingEnvironment| {
                r1_calls.lock().unwrap().push("r1");
                None
            },
        ))
        .exception_resolver(exception_resolver_fn(
            move |_fault: &BoxError, env: &DataFetchingEnvironment| {
                r2_calls.lock().unwrap().push("r2");
                Some(
                    graphql::Error::builder()
                        .message(format!("{} is unavailable", env.coordinate()))
                        .classification(ErrorType::Forbidden)
                        .build(),
                )
            },
        ))
        .build()
        .unwrap();

    let response = source.execute("{ c }", Context::new()).await;

    assert_eq!(*calls.lock().unwrap(), vec!["r1", "r2"]);
    assert_eq!(response.errors[0].message, "Query.c is unavailable");
    assert_eq!(response.errors[0].classification(), Some("FORBIDDEN"));
}

#[test_log::test(tokio::test)]
async fn unmatched_fault_becomes_a_generic_error() {
    let source = failing_c()
        .exception_resolver(exception_resolver_fn(
            |_fault: &BoxError, _env: &DataFetchingEnvironment| None,
        ))
        .build()
        .unwrap();
    let context = Context::new();
    let execution_id = context.execution_id();

    let response = source.execute("{ c }", context).await;

    assert_eq!(response.data, Some(json!({ "c": null })));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        format!("INTERNAL_ERROR for {execution_id}")
    );
    assert!(!response.errors[0].message.contains("c failed"));
    assert_eq!(response.errors[0].classification(), Some("INTERNAL_ERROR"));
}

#[test_log::test(tokio::test)]
async fn panicking_data_fetcher_is_a_fault() {
    let source = GraphQlSourceBuilder::new()
        .schema_sdl("schema.graphqls", "type Query { boom: Int ok: Boolean }")
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring
                .data_fetcher(
                    "Query",
                    "boom",
                    fetcher_fn(|_env: DataFetchingEnvironment| async {
                        let values: Vec<i64> = Vec::new();
                        Ok::<_, BoxError>(json!(values[3]))
                    }),
                )
                .data_fetcher("Query", "ok", static_value(true));
        })
        .build()
        .unwrap();

    let response = source.execute("{ boom ok }", Context::new()).await;

    assert_eq!(response.data, Some(json!({ "boom": null, "ok": true })));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, Some(Path::from("boom")));
}

#[tokio::test]
async fn context_decorator_runs_after_caller_visitors() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = order.clone();
    let second = order.clone();
    let source = GraphQlSourceBuilder::new()
        .schema_sdl("schema.graphqls", "type Query { user: String }")
        .type_visitor(
            move |node: &SchemaNode<'_>, registry: &mut CodeRegistryBuilder| -> Result<(), BoxError> {
                first.lock().unwrap().push(format!("first {node}"));
                if let Some(coordinate) = node.object_field() {
                    registry.set_data_fetcher(
                        coordinate,
                        Arc::new(fetcher_fn(|_env: DataFetchingEnvironment| async {
                            let user: Option<String> = Context::current()
                                .ok_or("no current context")?
                                .get("user")?;
                            Ok::<_, BoxError>(json!(user))
                        })),
                    );
                }
                Ok(())
            },
        )
        .type_visitor(
            move |node: &SchemaNode<'_>, _registry: &mut CodeRegistryBuilder| -> Result<(), BoxError> {
                second.lock().unwrap().push(format!("second {node}"));
                Ok(())
            },
        )
        .build()
        .unwrap();
    let context = Context::new();
    context.insert("user", "ada".to_string()).unwrap();

    let response = source.execute("{ user }", context).await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(response.data, Some(json!({ "user": "ada" })));
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "first Query",
            "second Query",
            "first Query.user",
            "second Query.user",
            "first String",
            "second String",
        ]
    );
}

#[test]
fn failing_visitor_aborts_assembly() {
    let error = two_fragments()
        .type_visitor(
            |_node: &SchemaNode<'_>, _registry: &mut CodeRegistryBuilder| -> Result<(), BoxError> {
                Err("refusing".into())
            },
        )
        .build()
        .unwrap_err();

    assert!(matches!(error, AssemblyError::VisitorFailure { .. }));
    assert!(error.to_string().ends_with("failed: refusing"));
}

#[tokio::test]
async fn identical_inputs_build_identical_sources() {
    let builder = two_fragments();
    let first = builder.build().unwrap();
    let second = builder.build().unwrap();

    assert_eq!(first.schema().sdl(), second.schema().sdl());
    for query in ["{ a }", "{ b }", "{ a b }", "{ nope }"] {
        assert_eq!(
            first.execute(query, Context::new()).await,
            second.execute(query, Context::new()).await
        );
    }
}

#[test]
fn no_fragments_is_an_error() {
    let error = GraphQlSourceBuilder::new().build().unwrap_err();
    assert!(matches!(
        error,
        AssemblyError::NoSchemaProvided(NoSchemaReason::NoResources)
    ));
}

#[test]
fn missing_fragment_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let error = GraphQlSourceBuilder::new()
        .schema_resource(FileResource::new(dir.path().join("missing.graphqls")))
        .build()
        .unwrap_err();

    match error {
        AssemblyError::MissingOrUnreadableSchemaFragment { resource, .. } => {
            assert!(resource.ends_with("missing.graphqls"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn conflicting_fragments_are_an_error() {
    let error = GraphQlSourceBuilder::new()
        .schema_sdl("a.graphqls", "type Query { a: Int }")
        .schema_sdl("b.graphqls", "type Query { a: String }")
        .build()
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "conflicting definitions of type 'Query': field 'a' is declared as 'Int' and 'String'"
    );
}

struct Recording {
    name: &'static str,
    events: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    fn record(&self, phase: &str) -> Option<InstrumentationContext> {
        let name = self.name;
        let phase = phase.to_string();
        let events = self.events.clone();
        events.lock().unwrap().push(format!("begin {phase} {name}"));
        Some(InstrumentationContext::new(move |_outcome| {
            events.lock().unwrap().push(format!("end {phase} {name}"));
        }))
    }
}

impl Instrumentation for Recording {
    fn begin_execution(
        &self,
        _parameters: &ExecutionParameters<'_>,
    ) -> Option<InstrumentationContext> {
        self.record("execution")
    }

    fn begin_parse(&self, _parameters: &ExecutionParameters<'_>) -> Option<InstrumentationContext> {
        self.record("parse")
    }

    fn begin_validation(
        &self,
        _parameters: &ExecutionParameters<'_>,
    ) -> Option<InstrumentationContext> {
        self.record("validation")
    }

    fn begin_field_fetch(
        &self,
        environment: &DataFetchingEnvironment,
    ) -> Option<InstrumentationContext> {
        self.record(&format!("fetch {}", environment.coordinate()))
    }
}

#[tokio::test]
async fn instrumentations_wrap_each_other() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let source = GraphQlSourceBuilder::new()
        .schema_sdl("schema.graphqls", "type Query { a: Int }")
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring.data_fetcher("Query", "a", static_value(1));
        })
        .instrumentation(Recording {
            name: "outer",
            events: events.clone(),
        })
        .instrumentation(Recording {
            name: "inner",
            events: events.clone(),
        })
        .build()
        .unwrap();

    let response = source.execute("{ a }", Context::new()).await;

    assert!(response.is_ok());
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "begin execution outer",
            "begin execution inner",
            "begin parse outer",
            "begin parse inner",
            "end parse inner",
            "end parse outer",
            "begin validation outer",
            "begin validation inner",
            "end validation inner",
            "end validation outer",
            "begin fetch Query.a outer",
            "begin fetch Query.a inner",
            "end fetch Query.a inner",
            "end fetch Query.a outer",
            "end execution inner",
            "end execution outer",
        ]
    );
}

#[tokio::test]
async fn abstract_types_resolve_through_typename() {
    let source = GraphQlSourceBuilder::new()
        .schema_sdl(
            "schema.graphqls",
            r#"
            type Query { search: [Result] }
            union Result = Book | Author
            type Book { title: String }
            type Author { name: String }
            "#,
        )
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring.data_fetcher(
                "Query",
                "search",
                static_value(json!([
                    { "__typename": "Book", "title": "Dune" },
                    { "__typename": "Author", "name": "Frank Herbert" }
                ])),
            );
        })
        .build()
        .unwrap();

    let response = source
        .execute(
            "{ search { ... on Book { title } ... on Author { name } } }",
            Context::new(),
        )
        .await;

    assert_eq!(
        response.data,
        Some(json!({
            "search": [{ "title": "Dune" }, { "name": "Frank Herbert" }]
        }))
    );
}

#[tokio::test]
async fn configuration_file_drives_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let schema_dir = dir.path().join("graphql");
    std::fs::create_dir_all(schema_dir.join("books")).unwrap();
    std::fs::write(schema_dir.join("query.graphqls"), "type Query { books: [Book] }").unwrap();
    std::fs::write(
        schema_dir.join("books/book.gqls"),
        "type Book { title: String }",
    )
    .unwrap();
    std::fs::write(schema_dir.join("README.md"), "not a schema").unwrap();
    let config_path = dir.path().join("configuration.yaml");
    std::fs::write(
        &config_path,
        format!(
            "schema:\n  locations:\n    - {}\nintrospection: false\n",
            schema_dir.display()
        ),
    )
    .unwrap();

    let configuration = Configuration::from_file(&config_path).unwrap();
    let source = GraphQlSourceBuilder::from_configuration(&configuration)
        .unwrap()
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring.data_fetcher(
                "Query",
                "books",
                static_value(json!([{ "title": "Dune" }])),
            );
        })
        .build()
        .unwrap();

    let books = source.execute("{ books { title } }", Context::new()).await;
    assert_eq!(books.data, Some(json!({ "books": [{ "title": "Dune" }] })));

    let introspection = source
        .execute("{ __schema { queryType { name } } }", Context::new())
        .await;
    assert!(!introspection.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clones_of_one_source_serve_concurrent_requests() {
    let source = GraphQlSourceBuilder::new()
        .schema_sdl("callers.graphqls", "type Query { caller: Int fails: Int }")
        .configure_runtime_wiring(|wiring: &mut RuntimeWiringBuilder| {
            wiring
                .data_fetcher(
                    "Query",
                    "caller",
                    fetcher_fn(|env: DataFetchingEnvironment| async move {
                        tokio::task::yield_now().await;
                        let caller: Option<i64> = env.context().get("caller")?;
                        Ok::<_, BoxError>(json!(caller))
                    }),
                )
                .data_fetcher(
                    "Query",
                    "fails",
                    fetcher_fn(|_env: DataFetchingEnvironment| async {
                        Err::<Value, BoxError>(Box::new(Failed("fails")))
                    }),
                );
        })
        .build()
        .unwrap();

    let requests = (0..32i64).map(|caller| {
        let source = source.clone();
        tokio::spawn(async move {
            let context = Context::new();
            context.insert("caller", caller).unwrap();
            (caller, source.execute("{ caller fails }", context).await)
        })
    });

    for joined in futures::future::join_all(requests).await {
        let (caller, response) = joined.unwrap();
        assert_eq!(
            response.data,
            Some(json!({ "caller": caller, "fails": null }))
        );
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].path, Some(Path::from("fails")));
    }
}
