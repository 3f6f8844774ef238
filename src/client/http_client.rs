use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ImageUpload, RemoteApi, UploadForm};
use crate::protocol::{ApiFailure, RemoteResult};

/// Part name used for every uploaded image file
const IMAGE_PART: &str = "images";
/// Text field listing images already stored on the server
const EXISTING_IMAGES_FIELD: &str = "existingImages";

/// REST client for the rental API.
///
/// Every call returns the parsed JSON body on success and an [`ApiFailure`]
/// otherwise; nothing here returns a transport error to the caller.
pub struct RestClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RestClient {
    /// Fails only when the HTTP client cannot be built; a client without
    /// the request timeout is never substituted.
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.set_token(token);
        self
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> RemoteResult {
        let mut request = self.builder(method.clone(), path);
        if let Some(b) = body {
            request = request.json(b);
        }
        self.send(method, path, request).await
    }

    async fn send(&self, method: Method, path: &str, request: reqwest::RequestBuilder) -> RemoteResult {
        debug!("{} {}", method, path);

        let response = request.send().await.map_err(|e| {
            warn!("{} {} failed: {}", method, path, e);
            ApiFailure::transport(format!("HTTP request failed: {}", e))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiFailure::transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!("{} {} answered HTTP {}", method, path, status.as_u16());
            return Err(ApiFailure::status(status.as_u16(), text));
        }

        // Deletes commonly answer 204 with no body
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiFailure::status(
                status.as_u16(),
                format!("Failed to parse response: {} - Text: {}", e, text),
            )
        })
    }
}

fn multipart(form: &UploadForm) -> Result<Form, ApiFailure> {
    let mut multipart = Form::new();
    for (name, value) in &form.fields {
        multipart = multipart.text(name.clone(), value.clone());
    }

    let mut existing = Vec::new();
    for image in &form.images {
        match image {
            ImageUpload::Existing(url) => existing.push(Value::String(url.clone())),
            ImageUpload::File {
                file_name,
                mime_type,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| ApiFailure::transport(format!("Invalid mime type: {}", e)))?;
                multipart = multipart.part(IMAGE_PART, part);
            }
        }
    }

    if !existing.is_empty() {
        multipart = multipart.text(EXISTING_IMAGES_FIELD, Value::Array(existing).to_string());
    }
    Ok(multipart)
}

#[async_trait]
impl RemoteApi for RestClient {
    async fn fetch_collection(&self, resource: &str) -> RemoteResult {
        self.request(Method::GET, resource, None).await
    }

    async fn fetch_collection_by_parent(
        &self,
        parent: &str,
        parent_id: i64,
        resource: &str,
    ) -> RemoteResult {
        let path = format!("{}/{}/{}", parent, parent_id, resource);
        self.request(Method::GET, &path, None).await
    }

    async fn fetch_one(&self, resource: &str, id: i64) -> RemoteResult {
        self.request(Method::GET, &format!("{}/{}", resource, id), None)
            .await
    }

    async fn create(&self, resource: &str, payload: &Value) -> RemoteResult {
        self.request(Method::POST, resource, Some(payload)).await
    }

    async fn update(&self, resource: &str, id: i64, payload: &Value) -> RemoteResult {
        self.request(Method::PUT, &format!("{}/{}", resource, id), Some(payload))
            .await
    }

    async fn delete(&self, resource: &str, id: i64) -> RemoteResult {
        self.request(Method::DELETE, &format!("{}/{}", resource, id), None)
            .await
    }

    async fn put_json(&self, path: &str, payload: &Value) -> RemoteResult {
        self.request(Method::PUT, path, Some(payload)).await
    }

    async fn post_form(&self, path: &str, form: &UploadForm) -> RemoteResult {
        let request = self.builder(Method::POST, path).multipart(multipart(form)?);
        self.send(Method::POST, path, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = RestClient::new("http://api.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://api.local/api");
        assert_eq!(client.url("properties/3"), "http://api.local/api/properties/3");
        assert_eq!(client.url("/users"), "http://api.local/api/users");
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let form = UploadForm {
            fields: vec![],
            images: vec![ImageUpload::file("a.jpg", "not a mime", vec![1, 2, 3])],
        };
        assert!(multipart(&form).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_network_error() {
        let client = RestClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();

        let failure = client.fetch_collection("properties").await.unwrap_err();
        assert!(failure.is_network_error());
        assert_eq!(failure.status, None);

        let failure = client.delete("properties", 1).await.unwrap_err();
        assert!(failure.is_network_error());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = RestClient::new(&format!("http://{}", addr), Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let failure = client.fetch_collection("properties").await.unwrap_err();

        assert!(failure.is_network_error());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
