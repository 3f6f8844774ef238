//! Listing endpoints beyond plain CRUD: multipart create/update with images
//! and the availability sub-resource. These answer `{"property": {...}}`,
//! which is stored locally like any fetched listing.

use serde_json::Value;
use tracing::{debug, error};

use crate::client::{ImageUpload, UploadForm};
use crate::error::ValidationError;
use crate::models::{Availability, Property, Resource};
use crate::protocol::RemoteResult;
use crate::sync::manager::ResourceSync;

const CREATE_WITH_IMAGES: &str = "createPropertyWithImages";
const UPDATE_WITH_IMAGES: &str = "updatePropertyWithImages";

impl ResourceSync<Property> {
    /// Create a listing together with its images.
    pub async fn create_with_images(
        &self,
        property: &Property,
        images: Vec<ImageUpload>,
    ) -> Result<Option<Property>, ValidationError> {
        property.validate()?;
        let Some(form) = self.listing_form(property, images) else {
            return Ok(None);
        };
        if !self.ensure_online().await {
            return Ok(None);
        }

        let result = self.context().remote.post_form(CREATE_WITH_IMAGES, &form).await;
        Ok(self.finish_listing_write("create", result, property.user_id).await)
    }

    /// Replace a listing's fields and images. Images to keep are passed as
    /// [`ImageUpload::Existing`].
    pub async fn update_with_images(
        &self,
        property: &Property,
        images: Vec<ImageUpload>,
    ) -> Result<Option<Property>, ValidationError> {
        let id = property
            .id
            .ok_or_else(|| ValidationError::single("The property has no id and cannot be updated."))?;
        property.validate()?;
        let Some(form) = self.listing_form(property, images) else {
            return Ok(None);
        };
        if !self.ensure_online().await {
            return Ok(None);
        }

        let path = format!("{}/{}", UPDATE_WITH_IMAGES, id);
        let result = self.context().remote.post_form(&path, &form).await;
        Ok(self.finish_listing_write("update", result, property.user_id).await)
    }

    /// Change the availability window or the active flag of a listing.
    pub async fn update_availability(&self, id: i64, availability: &Availability) -> Option<Property> {
        let body = match serde_json::to_value(availability) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize availability: {}", e);
                return None;
            }
        };
        if !self.ensure_online().await {
            return None;
        }

        let path = format!("{}/{}/availability", Property::TABLE, id);
        let result = self.context().remote.put_json(&path, &body).await;
        self.finish_listing_write("availability update", result, None).await
    }

    fn listing_form(&self, property: &Property, images: Vec<ImageUpload>) -> Option<UploadForm> {
        let value = match serde_json::to_value(property) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return None,
            Err(e) => {
                error!("Failed to serialize property: {}", e);
                return None;
            }
        };
        let schema = self.context().registry.get(Property::TABLE)?;
        Some(UploadForm::from_object(&schema.scalar_fields(&value), images))
    }

    async fn finish_listing_write(
        &self,
        action: &str,
        result: RemoteResult,
        owner_id: Option<i64>,
    ) -> Option<Property> {
        let body = self.accepted(action, result)?;
        let payload = match body {
            Value::Object(mut object) => match object.remove("property") {
                Some(property) => property,
                None => Value::Object(object),
            },
            other => other,
        };

        let property = if payload.is_object() {
            if let Err(e) = self.store_payload(payload.clone()).await {
                error!("Failed to store returned property: {}", e);
            }
            match serde_json::from_value::<Property>(payload) {
                Ok(property) => Some(property),
                Err(e) => {
                    debug!("Returned property could not be read: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Some(id) = property.as_ref().and_then(|p| p.id) {
            self.reload_item(id).await;
        }
        self.refresh_scope(owner_id.or_else(|| property.as_ref().and_then(|p| p.user_id)))
            .await;
        property
    }
}
