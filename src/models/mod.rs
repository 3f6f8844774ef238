//! Typed resources
//!
//! Field names follow the API's `{Entity}_{Field}` convention through serde
//! renames. Relationship fields are `Option`s: `None` means "not loaded", never
//! "known to be empty".

mod favorite;
mod image;
mod message;
mod property;
mod user;

pub use favorite::Favorite;
pub use image::Image;
pub use message::{conversation_with, group_conversations, Conversation, Message};
pub use property::{Availability, Property, PropertyKind, SearchFilter};
pub use user::{Role, User};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{SyncError, SyncResult, ValidationError};
use crate::schema::Row;
use crate::sync::ParentScope;

/// A resource with its own table and remote collection.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name, also the remote path segment
    const TABLE: &'static str;

    fn id(&self) -> Option<i64>;

    /// Checks run before the resource is sent to the server.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// How collections of this resource are scoped to a parent, if at all.
    fn parent_scope() -> Option<ParentScope> {
        None
    }
}

/// Any of the cached resources.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    User(User),
    Property(Property),
    Image(Image),
    Message(Message),
    Favorite(Favorite),
}

impl Entity {
    pub fn from_row(table: &str, row: Row) -> SyncResult<Self> {
        let value = Value::Object(row);
        Ok(match table {
            "users" => Entity::User(serde_json::from_value(value)?),
            "properties" => Entity::Property(serde_json::from_value(value)?),
            "images" => Entity::Image(serde_json::from_value(value)?),
            "messages" => Entity::Message(serde_json::from_value(value)?),
            "favorites" => Entity::Favorite(serde_json::from_value(value)?),
            other => return Err(SyncError::UnknownResource(other.to_string())),
        })
    }

    pub fn table(&self) -> &'static str {
        match self {
            Entity::User(_) => User::TABLE,
            Entity::Property(_) => Property::TABLE,
            Entity::Image(_) => Image::TABLE,
            Entity::Message(_) => Message::TABLE,
            Entity::Favorite(_) => Favorite::TABLE,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Entity::User(u) => u.id(),
            Entity::Property(p) => p.id(),
            Entity::Image(i) => i.id(),
            Entity::Message(m) => m.id(),
            Entity::Favorite(f) => f.id(),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id().map(|id| id.to_string()).unwrap_or_else(|| "-".into());
        match self {
            Entity::User(u) => write!(
                f,
                "user #{} {} <{}>",
                id,
                u.full_name(),
                u.email.as_deref().unwrap_or("")
            ),
            Entity::Property(p) => write!(
                f,
                "property #{} {} ({}, {})",
                id,
                p.title.as_deref().unwrap_or(""),
                p.city.as_deref().unwrap_or(""),
                p.kind().map(|k| k.label()).unwrap_or("unknown type")
            ),
            Entity::Image(i) => write!(
                f,
                "image #{} order {} {}",
                id,
                i.order.unwrap_or_default(),
                i.url.as_deref().unwrap_or("")
            ),
            Entity::Message(m) => write!(
                f,
                "message #{} {} -> {}: {}",
                id,
                m.sender_id.unwrap_or_default(),
                m.receiver_id.unwrap_or_default(),
                m.text.as_deref().unwrap_or("")
            ),
            Entity::Favorite(fav) => write!(
                f,
                "favorite #{} tenant {} property {}",
                id,
                fav.tenant_id.unwrap_or_default(),
                fav.property_id.unwrap_or_default()
            ),
        }
    }
}

/// Deserializers tolerant of the shapes the API and the local store produce
/// (numeric strings, 0/1 flags, JSON text for lists).
pub(crate) mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected a number, got {}", other))),
        }
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected an integer, got {}", other))),
        }
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) => Ok(Some(n.as_f64().unwrap_or(0.0) != 0.0)),
            Some(Value::String(s)) => match s.trim() {
                "1" | "true" => Ok(Some(true)),
                "0" | "false" | "" => Ok(Some(false)),
                other => Err(D::Error::custom(format!("expected a flag, got {}", other))),
            },
            Some(other) => Err(D::Error::custom(format!("expected a flag, got {}", other))),
        }
    }

    /// Lists arrive as arrays, as JSON text or as comma-separated text.
    pub fn opt_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        let items = match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(Value::String(s)) => match serde_json::from_str::<Vec<Value>>(&s) {
                Ok(items) => items,
                Err(_) => {
                    return Ok(Some(
                        s.split(',')
                            .map(str::trim)
                            .filter(|part| !part.is_empty())
                            .map(str::to_string)
                            .collect(),
                    ))
                }
            },
            Some(other) => return Err(D::Error::custom(format!("expected a list, got {}", other))),
        };

        Ok(Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_entity_from_row() {
        let entity = Entity::from_row(
            "messages",
            row(json!({"Message_ID": 2, "Sender_ID": 1, "Receiver_ID": 3, "Message_Text": "hey"})),
        )
        .unwrap();
        assert_eq!(entity.table(), "messages");
        assert_eq!(entity.id(), Some(2));
        assert_eq!(entity.to_string(), "message #2 1 -> 3: hey");

        assert!(matches!(
            Entity::from_row("rooms", Row::new()),
            Err(SyncError::UnknownResource(_))
        ));
    }

    #[test]
    fn test_lenient_fields() {
        let property: Property = serde_json::from_value(json!({
            "Property_ID": "12",
            "Property_Price_Per_Month": "950.50",
            "Property_Is_Active": 1,
            "Property_Amenities": "[\"wifi\", \"parking\"]",
        }))
        .unwrap();
        assert_eq!(property.id, Some(12));
        assert_eq!(property.price_per_month, Some(950.5));
        assert_eq!(property.is_active, Some(true));
        assert_eq!(property.amenities, Some(vec!["wifi".into(), "parking".into()]));

        let property: Property =
            serde_json::from_value(json!({"Property_Amenities": "wifi, garden"})).unwrap();
        assert_eq!(property.amenities, Some(vec!["wifi".into(), "garden".into()]));

        assert!(serde_json::from_value::<Property>(json!({"Property_Price_Per_Month": "cheap"})).is_err());
    }
}
