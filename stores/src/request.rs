//! Correlation ids and the backend-call effect shared by every store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::{ApiResult, BookingApi, Rejection};
use uuid::Uuid;

/// Correlation id carried by a request action and its terminal action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// A fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a store operation as carried by its terminal action
pub type Outcome<T> = Result<T, Rejection>;

/// Runs a backend call and turns its result into the terminal action.
///
/// Failures are mapped to a [`Rejection`] using `fallback` when the backend sent
/// no message.
pub(crate) fn call_api<T, A, F, Fut, D>(
    env: &ApiEnvironment,
    fallback: &'static str,
    call: F,
    done: D,
) -> Effect<A>
where
    F: FnOnce(Arc<dyn BookingApi>) -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
    D: FnOnce(Outcome<T>) -> A + Send + 'static,
    T: Send + 'static,
    A: Send + 'static,
{
    let api = Arc::clone(&env.api);
    Effect::future(async move {
        let result = call(api).await.map_err(|err| {
            tracing::debug!(error = %err, fallback, "Backend call rejected");
            Rejection::from_api(&err, fallback)
        });
        Some(done(result))
    })
}

/// Feeds `action` back without doing any I/O
pub(crate) fn respond<A: Send + 'static>(action: A) -> Effect<A> {
    Effect::future(async move { Some(action) })
}
