//! Multipart payloads for the listing endpoints that accept image files.

use serde_json::{Map, Value};

/// An image attached to a listing create/update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUpload {
    /// An image already stored on the server, referenced by URL or path
    Existing(String),
    /// A new file to upload
    File {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl ImageUpload {
    pub fn file(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ImageUpload::File {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Transport-agnostic multipart form: text fields plus image parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadForm {
    pub fields: Vec<(String, String)>,
    pub images: Vec<ImageUpload>,
}

impl UploadForm {
    /// Build a form from the scalar fields of a JSON object.
    ///
    /// Strings are sent verbatim, booleans as `1`/`0`, other values as JSON
    /// text. Nested objects are relationship payloads and are not sent; null
    /// fields are omitted.
    pub fn from_object(object: &Map<String, Value>, images: Vec<ImageUpload>) -> Self {
        let fields = object
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::Null | Value::Object(_) => return None,
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
                    other => other.to_string(),
                };
                Some((key.clone(), text))
            })
            .collect();

        Self { fields, images }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_from_object() {
        let object = json!({
            "Property_Title": "Loft",
            "Property_Is_Active": true,
            "Property_Price_Per_Month": 1200.5,
            "Property_Amenities": ["wifi"],
            "Property_Description": null,
            "user": {"User_ID": 1},
        });
        let Value::Object(object) = object else { unreachable!() };

        let form = UploadForm::from_object(&object, vec![ImageUpload::Existing("a.jpg".into())]);
        assert_eq!(form.field("Property_Title"), Some("Loft"));
        assert_eq!(form.field("Property_Is_Active"), Some("1"));
        assert_eq!(form.field("Property_Price_Per_Month"), Some("1200.5"));
        assert_eq!(form.field("Property_Amenities"), Some("[\"wifi\"]"));
        assert_eq!(form.field("Property_Description"), None);
        assert_eq!(form.field("user"), None);
        assert_eq!(form.images.len(), 1);
    }
}
