//! Procedural macros for the Sakura bot toolkit.
//!
//! # UpdatePayload Derive Macro
//!
//! Handlers take a single structured parameter. `#[derive(UpdatePayload)]`
//! turns any `serde::Deserialize` struct into such a parameter by
//! implementing `FromUpdate` with the record kind:
//!
//! ```rust,ignore
//! use sakura::prelude::*;
//!
//! #[derive(Deserialize, UpdatePayload)]
//! #[update(field = "message")]
//! struct IncomingMessage {
//!     message_id: i64,
//!     text: Option<String>,
//! }
//!
//! async fn on_message(msg: IncomingMessage) {
//!     // ...
//! }
//! ```

mod payload;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `FromUpdate` for a `Deserialize` struct.
///
/// # Attributes
///
/// - `#[update(field = "...")]` - Deserialize from this top-level field of the
///   update (e.g. `"message"`). Updates without the field skip the handler.
///   Without it, the whole update (including `update_id`) is deserialized.
/// - `#[update(crate = "...")]` - Path to the core crate (default:
///   `::sakura_core`; the `sakura` facade passes `::sakura::core`).
#[proc_macro_derive(UpdatePayload, attributes(update))]
pub fn derive_update_payload(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    payload::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
