//! Interceptors of the execution lifecycle.
//!
//! Each `begin_*` hook is called when a phase starts and may return an [`InstrumentationContext`]
//! completed with the phase's [`Outcome`] when it ends.

use std::fmt;
use std::sync::Arc;

use async_graphql::ServerError;
use async_graphql::ServerResult;
use async_graphql::ValidationResult;
use async_graphql::Variables;
use async_graphql::extensions::Extension;
use async_graphql::extensions::ExtensionContext;
use async_graphql::extensions::ExtensionFactory;
use async_graphql::extensions::NextParseQuery;
use async_graphql::extensions::NextValidation;
use async_graphql::parser::types::ExecutableDocument;

use crate::context::Context;
use crate::fetcher::DataFetchingEnvironment;
use crate::graphql;

/// How a phase ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The phase failed, with the first error message.
    Failure(String),
}

impl Outcome {
    pub(crate) fn from_errors<'a>(mut messages: impl Iterator<Item = &'a str>) -> Self {
        match messages.next() {
            Some(message) => Outcome::Failure(message.to_string()),
            None => Outcome::Success,
        }
    }
}

/// Called once when the phase it was returned for ends.
pub struct InstrumentationContext {
    on_completed: Box<dyn FnOnce(&Outcome) + Send>,
}

impl InstrumentationContext {
    pub fn new(on_completed: impl FnOnce(&Outcome) + Send + 'static) -> Self {
        Self {
            on_completed: Box::new(on_completed),
        }
    }

    pub(crate) fn complete(self, outcome: &Outcome) {
        (self.on_completed)(outcome)
    }
}

impl fmt::Debug for InstrumentationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationContext").finish_non_exhaustive()
    }
}

/// What the execution hooks know about the request.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionParameters<'a> {
    pub request: &'a graphql::Request,
    pub context: &'a Context,
}

/// Interceptor of the execution lifecycle. All hooks default to doing nothing.
pub trait Instrumentation: Send + Sync + 'static {
    fn begin_execution(
        &self,
        _parameters: &ExecutionParameters<'_>,
    ) -> Option<InstrumentationContext> {
        None
    }

    fn begin_parse(&self, _parameters: &ExecutionParameters<'_>) -> Option<InstrumentationContext> {
        None
    }

    fn begin_validation(
        &self,
        _parameters: &ExecutionParameters<'_>,
    ) -> Option<InstrumentationContext> {
        None
    }

    fn begin_field_fetch(
        &self,
        _environment: &DataFetchingEnvironment,
    ) -> Option<InstrumentationContext> {
        None
    }
}

/// Composes instrumentations: begin hooks run in order, completions in reverse order.
#[derive(Clone, Default)]
pub struct ChainedInstrumentation {
    instrumentations: Vec<Arc<dyn Instrumentation>>,
}

impl ChainedInstrumentation {
    pub fn new(instrumentations: Vec<Arc<dyn Instrumentation>>) -> Self {
        Self { instrumentations }
    }

    fn chain(
        &self,
        begin: impl Fn(&dyn Instrumentation) -> Option<InstrumentationContext>,
    ) -> Option<InstrumentationContext> {
        let contexts = self
            .instrumentations
            .iter()
            .filter_map(|instrumentation| begin(instrumentation.as_ref()))
            .collect::<Vec<_>>();
        if contexts.is_empty() {
            return None;
        }
        Some(InstrumentationContext::new(move |outcome| {
            for context in contexts.into_iter().rev() {
                context.complete(outcome);
            }
        }))
    }
}

impl Instrumentation for ChainedInstrumentation {
    fn begin_execution(
        &self,
        parameters: &ExecutionParameters<'_>,
    ) -> Option<InstrumentationContext> {
        self.chain(|i| i.begin_execution(parameters))
    }

    fn begin_parse(&self, parameters: &ExecutionParameters<'_>) -> Option<InstrumentationContext> {
        self.chain(|i| i.begin_parse(parameters))
    }

    fn begin_validation(
        &self,
        parameters: &ExecutionParameters<'_>,
    ) -> Option<InstrumentationContext> {
        self.chain(|i| i.begin_validation(parameters))
    }

    fn begin_field_fetch(
        &self,
        environment: &DataFetchingEnvironment,
    ) -> Option<InstrumentationContext> {
        self.chain(|i| i.begin_field_fetch(environment))
    }
}

/// Calls the parse and validation hooks from the executor.
pub(crate) struct InstrumentationExtension {
    instrumentation: Arc<dyn Instrumentation>,
}

impl InstrumentationExtension {
    pub(crate) fn new(instrumentation: Arc<dyn Instrumentation>) -> Self {
        Self { instrumentation }
    }

    fn begin(
        &self,
        ctx: &ExtensionContext<'_>,
        begin: impl FnOnce(&dyn Instrumentation, &ExecutionParameters<'_>) -> Option<InstrumentationContext>,
    ) -> Option<InstrumentationContext> {
        let request = ctx.data_opt::<graphql::Request>()?;
        let context = ctx.data_opt::<Context>()?;
        begin(
            self.instrumentation.as_ref(),
            &ExecutionParameters { request, context },
        )
    }
}

impl ExtensionFactory for InstrumentationExtension {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(InstrumentationExtension {
            instrumentation: self.instrumentation.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Extension for InstrumentationExtension {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let instrumentation = self.begin(ctx, |i, parameters| i.begin_parse(parameters));
        let result = next.run(ctx, query, variables).await;
        if let Some(instrumentation) = instrumentation {
            let outcome = match &result {
                Ok(_) => Outcome::Success,
                Err(error) => Outcome::Failure(error.message.clone()),
            };
            instrumentation.complete(&outcome);
        }
        result
    }

    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        let instrumentation = self.begin(ctx, |i, parameters| i.begin_validation(parameters));
        let result = next.run(ctx).await;
        if let Some(instrumentation) = instrumentation {
            let outcome = match &result {
                Ok(_) => Outcome::Success,
                Err(errors) => {
                    Outcome::from_errors(errors.iter().map(|error| error.message.as_str()))
                }
            };
            instrumentation.complete(&outcome);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recording {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Instrumentation for Recording {
        fn begin_execution(
            &self,
            parameters: &ExecutionParameters<'_>,
        ) -> Option<InstrumentationContext> {
            let events = self.events.clone();
            let name = self.name;
            events
                .lock()
                .unwrap()
                .push(format!("begin {name} {}", parameters.request.query));
            Some(InstrumentationContext::new(move |outcome| {
                events
                    .lock()
                    .unwrap()
                    .push(format!("end {name} {outcome:?}"));
            }))
        }
    }

    struct Silent;

    impl Instrumentation for Silent {}

    #[test]
    fn chained_instrumentation_completes_in_reverse_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let chained = ChainedInstrumentation::new(vec![
            Arc::new(Recording {
                name: "outer",
                events: events.clone(),
            }),
            Arc::new(Silent),
            Arc::new(Recording {
                name: "inner",
                events: events.clone(),
            }),
        ]);
        let request = graphql::Request::from("{ a }");
        let context = Context::new();

        let instrumentation = chained
            .begin_execution(&ExecutionParameters {
                request: &request,
                context: &context,
            })
            .unwrap();
        instrumentation.complete(&Outcome::Failure("boom".to_string()));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "begin outer { a }",
                "begin inner { a }",
                "end inner Failure(\"boom\")",
                "end outer Failure(\"boom\")",
            ]
        );
    }

    #[test]
    fn chain_without_interested_instrumentation_returns_nothing() {
        let chained = ChainedInstrumentation::new(vec![Arc::new(Silent)]);
        let request = graphql::Request::from("{ a }");
        let context = Context::new();
        assert!(
            chained
                .begin_parse(&ExecutionParameters {
                    request: &request,
                    context: &context,
                })
                .is_none()
        );
    }

    #[test]
    fn outcome_reports_the_first_error() {
        assert_eq!(Outcome::from_errors(std::iter::empty()), Outcome::Success);
        assert_eq!(
            Outcome::from_errors(["first", "second"].into_iter()),
            Outcome::Failure("first".to_string())
        );
    }
}
