use serde::{Deserialize, Serialize};

use super::{lenient, Property, Resource, User};
use crate::sync::ParentScope;

/// A tenant's saved listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(rename = "Favorite_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "Tenant_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    #[serde(rename = "Property_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(rename = "Favorite_CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "Favorite_UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "Favorite_DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Box<Property>>,
}

impl Resource for Favorite {
    const TABLE: &'static str = "favorites";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn parent_scope() -> Option<ParentScope> {
        Some(ParentScope::new("users", "Tenant_ID"))
    }
}
