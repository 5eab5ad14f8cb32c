//! Translation of data fetcher faults into GraphQL errors.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tower::BoxError;

use crate::fetcher::DataFetchingEnvironment;
use crate::graphql;

/// Turns a fault raised while fetching a field into a GraphQL error.
///
/// `Ok(None)` leaves the fault to the next resolver. An `Err` is logged and treated the same way.
#[async_trait::async_trait]
pub trait DataFetcherExceptionResolver: Send + Sync + 'static {
    async fn resolve_exception(
        &self,
        fault: &BoxError,
        environment: &DataFetchingEnvironment,
    ) -> Result<Option<graphql::Error>, BoxError>;
}

/// Resolver calling a synchronous closure.
pub struct FnExceptionResolver<F> {
    function: F,
}

#[async_trait::async_trait]
impl<F> DataFetcherExceptionResolver for FnExceptionResolver<F>
where
    F: Fn(&BoxError, &DataFetchingEnvironment) -> Option<graphql::Error> + Send + Sync + 'static,
{
    async fn resolve_exception(
        &self,
        fault: &BoxError,
        environment: &DataFetchingEnvironment,
    ) -> Result<Option<graphql::Error>, BoxError> {
        Ok((self.function)(fault, environment))
    }
}

/// Turns a synchronous closure into a [`DataFetcherExceptionResolver`].
pub fn exception_resolver_fn<F>(function: F) -> FnExceptionResolver<F>
where
    F: Fn(&BoxError, &DataFetchingEnvironment) -> Option<graphql::Error> + Send + Sync + 'static,
{
    FnExceptionResolver { function }
}

/// Produces the error reported for a faulting field.
#[async_trait::async_trait]
pub trait DataFetcherExceptionHandler: Send + Sync + 'static {
    async fn handle_exception(
        &self,
        fault: BoxError,
        environment: &DataFetchingEnvironment,
    ) -> graphql::Error;
}

/// Asks the exception resolvers in order, the first answer with a message wins.
///
/// Faults no resolver answers for become an `INTERNAL_ERROR` error that only names the
/// execution id; the fault itself is logged.
#[derive(Clone, Default)]
pub struct ExceptionResolversExceptionHandler {
    resolvers: Arc<[Arc<dyn DataFetcherExceptionResolver>]>,
}

impl ExceptionResolversExceptionHandler {
    pub fn new(resolvers: Vec<Arc<dyn DataFetcherExceptionResolver>>) -> Self {
        Self {
            resolvers: resolvers.into(),
        }
    }
}

#[async_trait::async_trait]
impl DataFetcherExceptionHandler for ExceptionResolversExceptionHandler {
    async fn handle_exception(
        &self,
        fault: BoxError,
        environment: &DataFetchingEnvironment,
    ) -> graphql::Error {
        for (index, resolver) in self.resolvers.iter().enumerate() {
            match AssertUnwindSafe(resolver.resolve_exception(&fault, environment))
                .catch_unwind()
                .await
            {
                Ok(Ok(Some(error))) if !error.message.is_empty() => return error,
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    tracing::warn!(
                        resolver = index,
                        field = %environment.coordinate(),
                        error = %error,
                        "exception resolver failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        resolver = index,
                        field = %environment.coordinate(),
                        "exception resolver panicked"
                    );
                }
            }
        }

        let execution_id = environment.context().execution_id();
        tracing::error!(
            execution_id = %execution_id,
            field = %environment.coordinate(),
            path = %environment.path(),
            fault = %fault,
            "unresolved data fetcher fault"
        );
        graphql::Error::unhandled_fault(execution_id)
    }
}
