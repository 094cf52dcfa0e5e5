//! Update handlers.
//!
//! Handlers are plain async functions or closures. [`Handler`] is implemented
//! for every `Fn` whose parameters implement [`FromUpdate`] and whose output
//! implements [`HandleResponse`], so no registration macro is needed:
//!
//! ```rust,ignore
//! use sakura_core::Update;
//!
//! async fn on_update(update: Update) {
//!     println!("got update {}", update.update_id);
//! }
//!
//! #[derive(serde::Deserialize, UpdatePayload)]
//! #[update(field = "message")]
//! struct IncomingMessage {
//!     text: Option<String>,
//! }
//!
//! async fn on_message(msg: IncomingMessage) -> Result<(), anyhow::Error> {
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! Any arity up to four implements [`Handler`]; only single-parameter
//! handlers pass [`HandlerContract`](super::contract::HandlerContract).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, error};

use super::extractor::{FromUpdate, ParamKind};
use crate::foundation::Update;

// ============================================================================
// HandleResponse
// ============================================================================

/// Types a handler may return.
#[async_trait]
pub trait HandleResponse: Send {
    /// Consumes the handler's output for `update`.
    async fn into_response(self, update: Arc<Update>);
}

#[async_trait]
impl HandleResponse for () {
    async fn into_response(self, _update: Arc<Update>) {}
}

#[async_trait]
impl<T: HandleResponse> HandleResponse for Option<T> {
    async fn into_response(self, update: Arc<Update>) {
        if let Some(t) = self {
            t.into_response(update).await;
        }
    }
}

/// On `Err`, the error is logged and confined to this update.
#[async_trait]
impl<T: HandleResponse, E: fmt::Display + Send> HandleResponse for Result<T, E> {
    async fn into_response(self, update: Arc<Update>) {
        match self {
            Ok(t) => t.into_response(update).await,
            Err(e) => {
                error!(update_id = update.update_id, "Handler error: {e}");
            }
        }
    }
}

// ============================================================================
// Signature
// ============================================================================

/// One declared handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    /// The parameter's declared kind.
    pub kind: ParamKind,
    /// The parameter's Rust type name.
    pub type_name: &'static str,
}

impl ParamInfo {
    /// Describes parameter type `T`.
    pub fn of<T: FromUpdate>() -> Self {
        Self {
            kind: T::KIND,
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// The declared parameter list of a handler, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerSignature {
    /// Parameters in declaration order.
    pub params: Vec<ParamInfo>,
}

impl HandlerSignature {
    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// An update handler.
///
/// Automatically implemented for async functions and closures that:
/// - take 0-4 parameters implementing [`FromUpdate`]
/// - return a type implementing [`HandleResponse`]
///
/// If a parameter fails to extract, the handler is skipped for that update.
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Describes the handler's parameters without calling it.
    fn signature() -> HandlerSignature;

    /// Calls the handler with the given update.
    async fn call(self, update: Arc<Update>);
}

/// A type-erased handler, invoked once per dispatched update.
pub type BoxedHandler = Arc<dyn Fn(Arc<Update>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(move |update| f.clone().call(update))
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandleResponse + 'static,
            $( $ty: FromUpdate, )*
        {
            fn signature() -> HandlerSignature {
                HandlerSignature {
                    params: vec![$(ParamInfo::of::<$ty>(),)*],
                }
            }

            async fn call(self, update: Arc<Update>) {
                $(
                    let $ty = match <$ty as FromUpdate>::from_update(&update) {
                        Ok(value) => value,
                        Err(e) => {
                            debug!(update_id = update.update_id, "Skipping handler: {e}");
                            return;
                        }
                    };
                )*

                let res = (self)($($ty,)*).await;
                res.into_response(update).await;
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
