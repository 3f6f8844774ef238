mod http_client;
mod upload;

pub use http_client::RestClient;
pub use upload::{ImageUpload, UploadForm};

use async_trait::async_trait;
use serde_json::Value;

use crate::protocol::RemoteResult;

/// Resource-addressed access to the remote REST API.
///
/// Paths follow the API's conventions: `/{resource}`, `/{resource}/{id}` and
/// `/{parent}/{parent_id}/{resource}`.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn fetch_collection(&self, resource: &str) -> RemoteResult;

    async fn fetch_collection_by_parent(
        &self,
        parent: &str,
        parent_id: i64,
        resource: &str,
    ) -> RemoteResult;

    async fn fetch_one(&self, resource: &str, id: i64) -> RemoteResult;

    async fn create(&self, resource: &str, payload: &Value) -> RemoteResult;

    async fn update(&self, resource: &str, id: i64, payload: &Value) -> RemoteResult;

    async fn delete(&self, resource: &str, id: i64) -> RemoteResult;

    /// PUT a JSON body to an arbitrary path (sub-resources such as availability)
    async fn put_json(&self, path: &str, payload: &Value) -> RemoteResult;

    /// POST a multipart form to an arbitrary path
    async fn post_form(&self, path: &str, form: &UploadForm) -> RemoteResult;
}
