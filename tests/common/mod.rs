//! Common test utilities for sync tests
//!
//! Provides shared helpers for:
//! - A scripted in-process remote API that records every call
//! - Contexts over a temporary SQLite store
//! - Sample payloads shaped like the rental API's responses

#![allow(dead_code)]

use async_trait::async_trait;
use rental_sync::client::{RemoteApi, UploadForm};
use rental_sync::protocol::{ApiFailure, RemoteResult};
use rental_sync::sync::{AutoConfirm, LocalStore, NeverConfirm, StaticProbe, SyncContext};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Remote API answering from a script keyed by `"METHOD path"`.
///
/// Unscripted requests fail like an unreachable server.
#[derive(Default)]
pub struct FakeRemote {
    responses: Mutex<HashMap<String, RemoteResult>>,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<Value>>,
    forms: Mutex<Vec<UploadForm>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, key: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), Ok(body));
    }

    pub fn fail(&self, key: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), Err(ApiFailure::status(status, "scripted failure")));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, key: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == key)
    }

    /// JSON bodies sent with POST and PUT, in order
    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn forms(&self) -> Vec<UploadForm> {
        self.forms.lock().unwrap().clone()
    }

    fn answer(&self, key: String) -> RemoteResult {
        self.calls.lock().unwrap().push(key.clone());
        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(ApiFailure::transport(format!("no route for {}", key))))
    }

    fn record_body(&self, body: &Value) {
        self.bodies.lock().unwrap().push(body.clone());
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn fetch_collection(&self, resource: &str) -> RemoteResult {
        self.answer(format!("GET {}", resource))
    }

    async fn fetch_collection_by_parent(
        &self,
        parent: &str,
        parent_id: i64,
        resource: &str,
    ) -> RemoteResult {
        self.answer(format!("GET {}/{}/{}", parent, parent_id, resource))
    }

    async fn fetch_one(&self, resource: &str, id: i64) -> RemoteResult {
        self.answer(format!("GET {}/{}", resource, id))
    }

    async fn create(&self, resource: &str, payload: &Value) -> RemoteResult {
        self.record_body(payload);
        self.answer(format!("POST {}", resource))
    }

    async fn update(&self, resource: &str, id: i64, payload: &Value) -> RemoteResult {
        self.record_body(payload);
        self.answer(format!("PUT {}/{}", resource, id))
    }

    async fn delete(&self, resource: &str, id: i64) -> RemoteResult {
        self.answer(format!("DELETE {}/{}", resource, id))
    }

    async fn put_json(&self, path: &str, payload: &Value) -> RemoteResult {
        self.record_body(payload);
        self.answer(format!("PUT {}", path))
    }

    async fn post_form(&self, path: &str, form: &UploadForm) -> RemoteResult {
        self.forms.lock().unwrap().push(form.clone());
        self.answer(format!("POST {}", path))
    }
}

/// A context wired to a fake remote and a switchable probe.
pub struct Harness {
    pub ctx: SyncContext,
    pub remote: Arc<FakeRemote>,
    pub probe: Arc<StaticProbe>,
    _dir: TempDir,
}

impl Harness {
    /// Online, deletes refused.
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Online, deletes confirmed.
    pub async fn confirming() -> Self {
        Self::build(true).await
    }

    async fn build(confirm: bool) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store =
            LocalStore::open(dir.path().join("cache.db")).expect("Failed to open local store");
        let remote = FakeRemote::new();
        let probe = Arc::new(StaticProbe::new(true));

        let mut ctx = SyncContext::new(store, remote.clone(), probe.clone());
        ctx = if confirm {
            ctx.with_confirm(Arc::new(AutoConfirm))
        } else {
            ctx.with_confirm(Arc::new(NeverConfirm))
        };
        ctx.init().await.expect("Failed to create tables");

        Self {
            ctx,
            remote,
            probe,
            _dir: dir,
        }
    }

    pub fn go_offline(&self) {
        self.probe.set_online(false);
    }

    pub fn go_online(&self) {
        self.probe.set_online(true);
    }

    pub async fn count(&self, table: &str) -> i64 {
        let rows = self
            .ctx
            .store
            .execute(&format!("SELECT COUNT(*) AS n FROM {}", table), &[])
            .await
            .expect("count query failed");
        rows.rows[0]["n"].as_i64().unwrap()
    }
}

pub fn landlord(id: i64) -> Value {
    json!({
        "User_ID": id,
        "User_First_Name": "Dana",
        "User_Last_Name": "Reyes",
        "User_Email": format!("landlord{}@example.com", id),
        "User_Role": "Landlord"
    })
}

pub fn tenant(id: i64) -> Value {
    json!({
        "User_ID": id,
        "User_First_Name": "Sam",
        "User_Last_Name": "Ortiz",
        "User_Email": format!("tenant{}@example.com", id),
        "User_Role": "Tenant"
    })
}

/// A listing as the API returns it: owner and images nested.
pub fn listing(id: i64, owner: i64) -> Value {
    json!({
        "Property_ID": id,
        "User_ID": owner,
        "Property_Title": format!("Flat {}", id),
        "Property_Address": "12 Harbour Road",
        "Property_City": "Lisbon",
        "Property_Zip_Code": "1100-001",
        "Property_Price_Per_Month": 950.0,
        "Property_Num_Bedrooms": 2,
        "Property_Num_Bathrooms": 1,
        "Property_Amenities": ["wifi", "balcony"],
        "Property_Property_Type": 1,
        "Property_Is_Active": true,
        "user": landlord(owner),
        "images": [
            {"Image_ID": id * 10 + 2, "Property_ID": id, "Image_URL": "https://cdn.example/b.jpg", "Image_Order": 2},
            {"Image_ID": id * 10 + 1, "Property_ID": id, "Image_URL": "https://cdn.example/a.jpg", "Image_Order": 1}
        ]
    })
}

pub fn message(id: i64, from: i64, to: i64, property: i64, text: &str) -> Value {
    json!({
        "Message_ID": id,
        "Sender_ID": from,
        "Receiver_ID": to,
        "Property_ID": property,
        "Message_Text": text,
        "Message_CreatedAt": format!("2026-03-0{}T10:00:00Z", id)
    })
}
