//! The update model.
//!
//! An [`Update`] is one unit of work returned by `getUpdates`. Only
//! `update_id` is interpreted by the poller; everything else is kept as an
//! opaque JSON payload and handed to the handler untouched.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ExtractError, ExtractResult};

/// A single update received from the long-polling endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Unique, increasing identifier within a polling session.
    pub update_id: i64,

    /// Everything except `update_id`, e.g. `{"message": {...}}`.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Update {
    /// Creates an update from an id and a payload object.
    pub fn new(update_id: i64, payload: Map<String, Value>) -> Self {
        Self { update_id, payload }
    }

    /// Returns the update identifier.
    pub fn id(&self) -> i64 {
        self.update_id
    }

    /// Returns the tag of this update (`"message"`, `"callback_query"`, ...).
    ///
    /// Each update carries exactly one of the known tags; unknown payloads
    /// yield `None`.
    pub fn kind(&self) -> Option<UpdateKind> {
        self.payload.keys().find_map(|k| k.parse().ok())
    }

    /// Returns a top-level payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Deserializes the whole update (including `update_id`) into `T`.
    pub fn extract<T: DeserializeOwned>(&self) -> ExtractResult<T> {
        let value = serde_json::to_value(self).map_err(|e| deserialize_error::<T>(&e))?;
        serde_json::from_value(value).map_err(|e| deserialize_error::<T>(&e))
    }

    /// Deserializes one top-level field into `T`.
    pub fn extract_field<T: DeserializeOwned>(&self, field: &'static str) -> ExtractResult<T> {
        let value = self
            .payload
            .get(field)
            .ok_or(ExtractError::MissingField { field })?;
        T::deserialize(value).map_err(|e| deserialize_error::<T>(&e))
    }

    /// Returns the update as a JSON object, `update_id` included.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::with_capacity(self.payload.len() + 1);
        map.insert("update_id".to_string(), Value::from(self.update_id));
        map.extend(self.payload.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }
}

fn deserialize_error<T>(err: &serde_json::Error) -> ExtractError {
    ExtractError::Deserialize {
        type_name: std::any::type_name::<T>(),
        reason: err.to_string(),
    }
}

/// Known update tags, as accepted by the `allowed_updates` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    BusinessConnection,
    BusinessMessage,
    EditedBusinessMessage,
    DeletedBusinessMessages,
    MessageReaction,
    MessageReactionCount,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    ShippingQuery,
    PreCheckoutQuery,
    PurchasedPaidMedia,
    Poll,
    PollAnswer,
    MyChatMember,
    ChatMember,
    ChatJoinRequest,
    ChatBoost,
    RemovedChatBoost,
}

impl UpdateKind {
    /// Every known tag, in API documentation order.
    pub const ALL: [UpdateKind; 23] = [
        Self::Message,
        Self::EditedMessage,
        Self::ChannelPost,
        Self::EditedChannelPost,
        Self::BusinessConnection,
        Self::BusinessMessage,
        Self::EditedBusinessMessage,
        Self::DeletedBusinessMessages,
        Self::MessageReaction,
        Self::MessageReactionCount,
        Self::InlineQuery,
        Self::ChosenInlineResult,
        Self::CallbackQuery,
        Self::ShippingQuery,
        Self::PreCheckoutQuery,
        Self::PurchasedPaidMedia,
        Self::Poll,
        Self::PollAnswer,
        Self::MyChatMember,
        Self::ChatMember,
        Self::ChatJoinRequest,
        Self::ChatBoost,
        Self::RemovedChatBoost,
    ];

    /// Returns the wire name of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::BusinessConnection => "business_connection",
            Self::BusinessMessage => "business_message",
            Self::EditedBusinessMessage => "edited_business_message",
            Self::DeletedBusinessMessages => "deleted_business_messages",
            Self::MessageReaction => "message_reaction",
            Self::MessageReactionCount => "message_reaction_count",
            Self::InlineQuery => "inline_query",
            Self::ChosenInlineResult => "chosen_inline_result",
            Self::CallbackQuery => "callback_query",
            Self::ShippingQuery => "shipping_query",
            Self::PreCheckoutQuery => "pre_checkout_query",
            Self::PurchasedPaidMedia => "purchased_paid_media",
            Self::Poll => "poll",
            Self::PollAnswer => "poll_answer",
            Self::MyChatMember => "my_chat_member",
            Self::ChatMember => "chat_member",
            Self::ChatJoinRequest => "chat_join_request",
            Self::ChatBoost => "chat_boost",
            Self::RemovedChatBoost => "removed_chat_boost",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown update kind '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Update {
        serde_json::from_value(json!({
            "update_id": 42,
            "message": {
                "message_id": 7,
                "chat": { "id": 1001, "type": "private" },
                "text": "hello"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_payload_is_kept_verbatim() {
        let update = sample();
        assert_eq!(update.id(), 42);
        assert_eq!(update.kind(), Some(UpdateKind::Message));
        assert_eq!(update.get("message").unwrap()["text"], "hello");

        let back = serde_json::to_value(&update).unwrap();
        assert_eq!(back["update_id"], 42);
        assert_eq!(back["message"]["chat"]["id"], 1001);
    }

    #[test]
    fn test_extract_field() {
        #[derive(Deserialize)]
        struct Chat {
            id: i64,
        }
        #[derive(Deserialize)]
        struct Message {
            text: String,
            chat: Chat,
        }

        let update = sample();
        let msg: Message = update.extract_field("message").unwrap();
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.chat.id, 1001);

        let err = update.extract_field::<Message>("callback_query");
        assert!(matches!(
            err,
            Err(ExtractError::MissingField {
                field: "callback_query"
            })
        ));
    }

    #[test]
    fn test_to_map_includes_id() {
        let map = sample().to_map();
        assert_eq!(map["update_id"], 42);
        assert!(map.contains_key("message"));
    }

    #[test]
    fn test_update_kind_parse() {
        assert_eq!(
            "callback_query".parse::<UpdateKind>(),
            Ok(UpdateKind::CallbackQuery)
        );
        assert!("bogus".parse::<UpdateKind>().is_err());
        for kind in UpdateKind::ALL {
            assert_eq!(kind.as_str().parse::<UpdateKind>(), Ok(kind));
        }
    }
}
