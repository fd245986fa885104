#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use healthtrack_api::config::AppConfig;
use healthtrack_api::database::MemoryStore;
use healthtrack_api::routes;
use healthtrack_api::storage::{ObjectStorage, PresignedUrl, StorageError};
use healthtrack_api::AppState;

/// Object storage double that records every call and can be told to fail deletes.
#[derive(Default)]
pub struct RecordingStorage {
    deleted: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
}

impl RecordingStorage {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        _content_length: u64,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Ok(PresignedUrl {
            url: format!("https://storage.test/{}?op=put", key),
            headers,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in.as_secs() as i64),
        })
    }

    async fn presign_download(&self, key: &str, expires_in: Duration) -> Result<PresignedUrl, StorageError> {
        Ok(PresignedUrl {
            url: format!("https://storage.test/{}?op=get", key),
            headers: BTreeMap::new(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in.as_secs() as i64),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        // Recorded even when failing: the attempt is what counts
        self.deleted.lock().unwrap().push(key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Request("simulated outage".to_string()));
        }
        Ok(())
    }
}

/// The full router over an in-memory store and recording storage.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<RecordingStorage>,
}

pub struct Session {
    pub token: String,
    pub user_id: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::development())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(RecordingStorage::default());
        let state = AppState::new(config, store.clone(), storage.clone());
        Self {
            router: routes::app(state),
            store,
            storage,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body from {}", uri))?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register a fresh account and return its token and id.
    pub async fn register(&self, email: &str) -> Result<Session> {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "correct horse battery" })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        Ok(Session {
            token: body["data"]["token"].as_str().context("token missing")?.to_string(),
            user_id: body["data"]["user"]["id"].as_str().context("user id missing")?.to_string(),
        })
    }

    /// Create a track and return its slug.
    pub async fn create_track(&self, session: &Session, title: &str) -> Result<String> {
        let (status, body) = self
            .post(&format!("/api/users/{}/tracks", session.user_id), &session.token, json!({ "title": title }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create track failed: {} {}", status, body);
        Ok(body["data"]["slug"].as_str().context("slug missing")?.to_string())
    }

    /// Create an event and return its id.
    pub async fn create_event(&self, session: &Session, slug: &str, body: Value) -> Result<String> {
        let (status, response) = self
            .post(&format!("/api/users/{}/tracks/{}/events", session.user_id, slug), &session.token, body)
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create event failed: {} {}", status, response);
        Ok(response["data"]["id"].as_str().context("event id missing")?.to_string())
    }
}

/// Upload, confirm and return the stored object key.
pub async fn attach_file(app: &TestApp, session: &Session, slug: &str, event_id: &str, file_name: &str) -> Result<String> {
    let base = format!("/api/users/{}/tracks/{}/events/{}", session.user_id, slug, event_id);

    let (status, ticket) = app
        .post(
            &format!("{}/upload-url", base),
            &session.token,
            json!({ "fileName": file_name, "contentType": "application/pdf", "size": 2048 }),
        )
        .await?;
    anyhow::ensure!(status == StatusCode::OK, "upload-url failed: {} {}", status, ticket);

    let (status, confirmed) = app
        .post(
            &format!("{}/upload-confirm", base),
            &session.token,
            json!({ "uploadId": ticket["data"]["uploadId"] }),
        )
        .await?;
    anyhow::ensure!(status == StatusCode::OK, "upload-confirm failed: {} {}", status, confirmed);

    Ok(confirmed["data"]["fileUrl"].as_str().context("fileUrl missing")?.to_string())
}
