//! Action middleware and unknown-option handlers.
//!
//! Middlewares run app → group → command, the innermost wrapping the action.
//! Each receives a snapshot of the [`Invocation`] and a [`Next`] handle.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub type BoxResult = BoxFuture<'static, anyhow::Result<Value>>;

pub type Action = Arc<dyn Fn(Invocation) -> BoxResult + Send + Sync>;

pub type Middleware = Arc<dyn Fn(Invocation, Next) -> BoxResult + Send + Sync>;

/// Claims an undeclared option. Returning `Some` binds the value under the
/// option's key; `None` passes it on to the next scope.
pub type UnknownOptionHandler = Arc<dyn Fn(&UnknownOption) -> Option<Value> + Send + Sync>;

/// An option token no declaration matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption {
    /// The token as typed, without the `=value` part.
    pub flag: String,
    /// The flag with its leading dashes removed.
    pub key: String,
    /// Text after the first `=`.
    pub value: Option<String>,
}

/// Everything an action sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Usage line of the matched command.
    pub command: String,
    pub pieces: Vec<String>,
    pub arguments: Vec<Value>,
    pub options: IndexMap<String, Value>,
    pub remaining: Vec<String>,
    /// Context merged in by middlewares via [`Next::run`].
    pub data: Map<String, Value>,
}

impl Invocation {
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    pub fn option(&self, long: &str) -> Option<&Value> {
        self.options.get(long)
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

pub(crate) fn into_action<F, Fut>(f: F) -> Action
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |invocation| f(invocation).boxed())
}

pub(crate) fn into_middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(Invocation, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |invocation, next| f(invocation, next).boxed())
}

/// Handler that accepts any unknown option: `--x=v` binds `"v"`, `--x` binds `true`.
pub(crate) fn accept_all() -> UnknownOptionHandler {
    Arc::new(|unknown: &UnknownOption| {
        Some(
            unknown
                .value
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Bool(true)),
        )
    })
}

pub(crate) struct Pipeline {
    middlewares: Vec<Middleware>,
    action: Action,
}

impl Pipeline {
    pub(crate) fn new(middlewares: Vec<Middleware>, action: Action) -> Self {
        Self {
            middlewares,
            action,
        }
    }

    pub(crate) async fn execute(self, invocation: Invocation) -> anyhow::Result<Value> {
        let state = Arc::new(Mutex::new(invocation));
        dispatch(Arc::new(self), 0, state).await
    }
}

/// Continuation handed to a middleware.
pub struct Next {
    pipeline: Arc<Pipeline>,
    index: usize,
    state: Arc<Mutex<Invocation>>,
    called: Arc<AtomicBool>,
}

impl Next {
    /// Shallow-merge `patch` into the invocation data, then run the rest of
    /// the chain.
    pub async fn run(self, patch: Map<String, Value>) -> anyhow::Result<Value> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            for (key, value) in patch {
                state.data.insert(key, value);
            }
        }
        self.proceed().await
    }

    /// Run the rest of the chain unchanged.
    pub async fn proceed(self) -> anyhow::Result<Value> {
        self.called.store(true, Ordering::SeqCst);
        dispatch(self.pipeline, self.index, self.state).await
    }
}

fn snapshot(state: &Mutex<Invocation>) -> Invocation {
    state.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn dispatch(pipeline: Arc<Pipeline>, index: usize, state: Arc<Mutex<Invocation>>) -> BoxResult {
    async move {
        let Some(middleware) = pipeline.middlewares.get(index).cloned() else {
            tracing::trace!("invoking action");
            let invocation = snapshot(&state);
            return (pipeline.action)(invocation).await;
        };

        tracing::trace!(index, "entering middleware");
        let called = Arc::new(AtomicBool::new(false));
        let next = Next {
            pipeline: Arc::clone(&pipeline),
            index: index + 1,
            state: Arc::clone(&state),
            called: Arc::clone(&called),
        };
        let output = middleware(snapshot(&state), next).await?;
        if called.load(Ordering::SeqCst) {
            Ok(output)
        } else {
            // The middleware returned without continuing; the chain still runs.
            dispatch(pipeline, index + 1, state).await
        }
    }
    .boxed()
}
