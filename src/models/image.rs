use serde::{Deserialize, Serialize};

use super::{lenient, Property, Resource};
use crate::sync::ParentScope;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "Image_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "Property_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(rename = "Image_Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Image_Path", default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "Image_Type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "Image_URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "Image_Order", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(rename = "Image_CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "Image_UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "Image_DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Box<Property>>,
}

impl Image {
    /// Where the image can be fetched from: the URL, else the storage path.
    pub fn location(&self) -> Option<&str> {
        self.url.as_deref().or(self.path.as_deref())
    }
}

impl Resource for Image {
    const TABLE: &'static str = "images";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn parent_scope() -> Option<ParentScope> {
        Some(ParentScope::new("properties", "Property_ID"))
    }
}
