//! Handler parameter extraction.
//!
//! A handler parameter is any type implementing [`FromUpdate`]. Besides
//! building the value from an [`Update`], every implementation declares its
//! [`ParamKind`] as an associated constant, which is what the handler
//! contract inspects before the poller starts.
//!
//! | Type | Kind |
//! |------|------|
//! | [`Update`], `Arc<Update>`, `#[derive(UpdatePayload)]` structs | [`ParamKind::Record`] |
//! | `serde_json::Map`, `HashMap<String, Value>`, `BTreeMap<String, Value>` | [`ParamKind::Map`] |
//! | `serde_json::Value` | [`ParamKind::Dynamic`] |
//! | integers, floats, `bool`, `String` | [`ParamKind::Primitive`] |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::foundation::{ExtractError, ExtractResult, Update};

/// The declared shape of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// A structured record with named, typed fields.
    Record,
    /// A structured string-keyed map.
    Map,
    /// A dynamically typed value whose shape is only known at runtime.
    Dynamic,
    /// A scalar.
    Primitive,
}

impl ParamKind {
    /// Whether this kind is acceptable as the update handler's parameter.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Record | Self::Map)
    }
}

/// A type that can be built from an [`Update`] and passed to a handler.
///
/// Implement it by hand, or derive it for a `Deserialize` struct with
/// `#[derive(UpdatePayload)]`.
pub trait FromUpdate: Sized + Send + 'static {
    /// The declared shape of this parameter type.
    const KIND: ParamKind;

    /// Builds the parameter from an update.
    ///
    /// Returning `Err` skips the handler for this update.
    fn from_update(update: &Arc<Update>) -> ExtractResult<Self>;
}

impl FromUpdate for Update {
    const KIND: ParamKind = ParamKind::Record;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(Update::clone(update))
    }
}

/// Shares the update without copying its payload.
impl FromUpdate for Arc<Update> {
    const KIND: ParamKind = ParamKind::Record;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(Arc::clone(update))
    }
}

impl FromUpdate for Map<String, Value> {
    const KIND: ParamKind = ParamKind::Map;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(update.to_map())
    }
}

impl FromUpdate for HashMap<String, Value> {
    const KIND: ParamKind = ParamKind::Map;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(update.to_map().into_iter().collect())
    }
}

impl FromUpdate for BTreeMap<String, Value> {
    const KIND: ParamKind = ParamKind::Map;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(update.to_map().into_iter().collect())
    }
}

impl FromUpdate for Value {
    const KIND: ParamKind = ParamKind::Dynamic;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(Value::Object(update.to_map()))
    }
}

/// Optional parameters never fail; they inherit the inner kind.
impl<T: FromUpdate> FromUpdate for Option<T> {
    const KIND: ParamKind = T::KIND;

    fn from_update(update: &Arc<Update>) -> ExtractResult<Self> {
        Ok(T::from_update(update).ok())
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromUpdate for $ty {
                const KIND: ParamKind = ParamKind::Primitive;

                fn from_update(_update: &Arc<Update>) -> ExtractResult<Self> {
                    Err(ExtractError::Unsupported {
                        type_name: std::any::type_name::<$ty>(),
                    })
                }
            }
        )*
    };
}

impl_primitive!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, String,
);
