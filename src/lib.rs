pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod schema;
pub mod sync;

pub use client::{ImageUpload, RemoteApi, RestClient, UploadForm};
pub use config::Config;
pub use error::{SyncError, SyncResult, ValidationError};
pub use models::{Entity, Favorite, Image, Message, Property, PropertyKind, Resource, User};
pub use protocol::{ApiFailure, RemoteResult, NETWORK_ERROR};
pub use schema::{ResourceSchema, Row, SchemaRegistry};
pub use sync::{
    Fetched, ItemState, LocalStore, NoticeBus, ParentScope, ResourceSync, SyncContext, SyncStatus,
};
