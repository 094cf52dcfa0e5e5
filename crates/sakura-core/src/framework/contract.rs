//! Handler contract validation.
//!
//! The update handler must take exactly one parameter, and that parameter must
//! be a structured record or a structured map. The check is a pure inspection
//! of [`Handler::signature`] and runs once, before any polling happens.

use std::fmt;

use super::extractor::ParamKind;
use super::handler::{BoxedHandler, Handler, HandlerSignature, into_handler};
use crate::foundation::ContractError;

/// The accepted shapes of the handler's parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuredKind {
    /// Named, typed fields.
    Record,
    /// String-keyed map.
    Map,
}

impl fmt::Display for StructuredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record => f.write_str("record"),
            Self::Map => f.write_str("map"),
        }
    }
}

/// What validation learned about an accepted handler. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerDescriptor {
    arity: usize,
    kind: StructuredKind,
    type_name: &'static str,
}

impl HandlerDescriptor {
    /// Number of parameters (always 1).
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Shape of the single parameter.
    pub fn kind(&self) -> StructuredKind {
        self.kind
    }

    /// Rust type name of the single parameter.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Validator for update handlers.
pub struct HandlerContract;

impl HandlerContract {
    /// Checks `handler` against the contract.
    pub fn validate<H, T>(_handler: &H) -> Result<HandlerDescriptor, ContractError>
    where
        H: Handler<T>,
    {
        Self::check(&H::signature())
    }

    /// Checks a declared signature against the contract.
    pub fn check(signature: &HandlerSignature) -> Result<HandlerDescriptor, ContractError> {
        let [param] = signature.params.as_slice() else {
            return Err(ContractError::InvalidArity {
                found: signature.arity(),
            });
        };

        let kind = match param.kind {
            ParamKind::Record => StructuredKind::Record,
            ParamKind::Map => StructuredKind::Map,
            ParamKind::Dynamic => {
                return Err(ContractError::UndeclaredParameterType {
                    type_name: param.type_name,
                });
            }
            ParamKind::Primitive => {
                return Err(ContractError::UnsupportedParameterType {
                    type_name: param.type_name,
                });
            }
        };

        Ok(HandlerDescriptor {
            arity: 1,
            kind,
            type_name: param.type_name,
        })
    }

    /// Validates `handler` and erases its type.
    pub fn bind<H, T>(handler: H) -> Result<ValidatedHandler, ContractError>
    where
        H: Handler<T>,
        T: 'static,
    {
        let descriptor = Self::validate(&handler)?;
        Ok(ValidatedHandler {
            descriptor,
            handler: into_handler(handler),
        })
    }
}

/// A handler that passed [`HandlerContract`], ready for dispatch.
#[derive(Clone)]
pub struct ValidatedHandler {
    descriptor: HandlerDescriptor,
    handler: BoxedHandler,
}

impl ValidatedHandler {
    /// The validation result.
    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// The type-erased handler.
    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }
}

impl fmt::Debug for ValidatedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedHandler")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Update;
    use sakura_macros::UpdatePayload;
    use serde::Deserialize;
    use serde_json::{Map, Value};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    #[derive(Debug, Deserialize, UpdatePayload)]
    #[update(field = "message")]
    #[allow(dead_code)]
    struct TextMessage {
        text: String,
    }

    #[test]
    fn test_zero_parameters_rejected() {
        let err = HandlerContract::validate(&|| async {}).unwrap_err();
        assert_eq!(err, ContractError::InvalidArity { found: 0 });
    }

    #[test]
    fn test_two_parameters_rejected() {
        let handler = |_: Update, _: Update| async {};
        let err = HandlerContract::validate(&handler).unwrap_err();
        assert_eq!(err, ContractError::InvalidArity { found: 2 });
    }

    #[test]
    fn test_dynamic_parameter_rejected() {
        let handler = |_: Value| async {};
        let err = HandlerContract::validate(&handler).unwrap_err();
        assert!(matches!(
            err,
            ContractError::UndeclaredParameterType { type_name } if type_name.contains("Value")
        ));
    }

    #[test]
    fn test_primitive_parameters_rejected() {
        let int = |_: i64| async {};
        assert!(matches!(
            HandlerContract::validate(&int),
            Err(ContractError::UnsupportedParameterType { type_name: "i64" })
        ));

        let text = |_: String| async {};
        assert!(matches!(
            HandlerContract::validate(&text),
            Err(ContractError::UnsupportedParameterType { .. })
        ));

        let flag = |_: bool| async {};
        assert!(matches!(
            HandlerContract::validate(&flag),
            Err(ContractError::UnsupportedParameterType { type_name: "bool" })
        ));
    }

    #[test]
    fn test_record_parameters_accepted() {
        let plain = |_: Update| async {};
        let descriptor = HandlerContract::validate(&plain).unwrap();
        assert_eq!(descriptor.arity(), 1);
        assert_eq!(descriptor.kind(), StructuredKind::Record);

        let shared = |_: Arc<Update>| async {};
        assert_eq!(
            HandlerContract::validate(&shared).unwrap().kind(),
            StructuredKind::Record
        );

        let derived = |_: TextMessage| async {};
        let descriptor = HandlerContract::validate(&derived).unwrap();
        assert_eq!(descriptor.kind(), StructuredKind::Record);
        assert!(descriptor.type_name().ends_with("TextMessage"));
    }

    #[test]
    fn test_map_parameters_accepted() {
        let json_map = |_: Map<String, Value>| async {};
        let hash_map = |_: HashMap<String, Value>| async {};
        let tree_map = |_: BTreeMap<String, Value>| async {};

        for kind in [
            HandlerContract::validate(&json_map).unwrap().kind(),
            HandlerContract::validate(&hash_map).unwrap().kind(),
            HandlerContract::validate(&tree_map).unwrap().kind(),
        ] {
            assert_eq!(kind, StructuredKind::Map);
        }
    }

    #[test]
    fn test_bind_keeps_descriptor() {
        let bound = HandlerContract::bind(|_: Update| async {}).unwrap();
        assert_eq!(bound.descriptor().kind(), StructuredKind::Record);

        let rejected = HandlerContract::bind(|_: u32| async {});
        assert!(rejected.is_err());
    }
}
