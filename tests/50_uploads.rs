mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use healthtrack_api::database::{HealthStore, NewPendingUpload};
use healthtrack_api::services::uploads::sweep_expired_uploads;

use common::{attach_file, TestApp};

#[tokio::test]
async fn upload_confirm_download_flow() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Bloods").await?;
    let event = app.create_event(&ada, &slug, json!({ "type": "RESULT" })).await?;
    let base = format!("/api/users/{}/tracks/{}/events/{}", ada.user_id, slug, event);

    let (status, ticket) = app
        .post(
            &format!("{}/upload-url", base),
            &ada.token,
            json!({ "fileName": "Lipid panel.pdf", "contentType": "application/pdf", "size": 4096 }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let key = ticket["data"]["key"].as_str().unwrap_or_default().to_string();
    assert!(key.starts_with(&format!("users/{}/", ada.user_id)), "{}", key);
    assert!(key.ends_with("-Lipid_panel.pdf"), "{}", key);
    assert!(ticket["data"]["uploadUrl"].as_str().unwrap_or_default().contains(&key));
    assert_eq!(ticket["data"]["headers"]["content-type"], json!("application/pdf"));

    // Not attached until confirmed
    let (status, body) = app.get(&format!("{}/download-url", base), &ada.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Event has no file"));

    let (status, confirmed) = app
        .post(&format!("{}/upload-confirm", base), &ada.token, json!({ "uploadId": ticket["data"]["uploadId"] }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["data"]["fileUrl"], json!(key));

    let (status, download) = app.get(&format!("{}/download-url", base), &ada.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(download["data"]["url"].as_str().unwrap_or_default().contains(&key));
    assert!(download["data"]["expiresAt"].is_string());

    // A ticket is single-use
    let (status, body) = app
        .post(&format!("{}/upload-confirm", base), &ada.token, json!({ "uploadId": ticket["data"]["uploadId"] }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Upload not found"));
    Ok(())
}

#[tokio::test]
async fn upload_requests_are_validated() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let event = app.create_event(&ada, &slug, json!({})).await?;
    let uri = format!("/api/users/{}/tracks/{}/events/{}/upload-url", ada.user_id, slug, event);

    let (status, body) = app
        .post(&uri, &ada.token, json!({ "fileName": "run.exe", "contentType": "application/x-msdownload", "size": 10 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().starts_with("contentType: "));

    let (status, body) = app
        .post(
            &uri,
            &ada.token,
            json!({ "fileName": "scan.png", "contentType": "image/png", "size": 10 * 1024 * 1024 + 1 }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("size: Must be at most 10485760 bytes"));

    let (status, body) = app.post(&uri, &ada.token, json!({ "contentType": "image/png", "size": 0 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("fileName: Required, size: Must be greater than 0"));

    let (status, _) = app
        .post(&uri, &ada.token, json!({ "fileName": "scan.png", "contentType": "image/png", "size": 10 * 1024 * 1024 }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn replacing_an_attachment_deletes_the_old_object() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Letters").await?;
    let event = app.create_event(&ada, &slug, json!({ "type": "LETTER" })).await?;

    let first = attach_file(&app, &ada, &slug, &event, "v1.pdf").await?;
    assert!(app.storage.deleted().is_empty());

    let second = attach_file(&app, &ada, &slug, &event, "v2.pdf").await?;
    assert_ne!(first, second);
    assert_eq!(app.storage.deleted(), vec![first]);
    Ok(())
}

#[tokio::test]
async fn tickets_are_bound_to_their_event() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let first = app.create_event(&ada, &slug, json!({})).await?;
    let second = app.create_event(&ada, &slug, json!({})).await?;
    let base = format!("/api/users/{}/tracks/{}/events", ada.user_id, slug);

    let (_, ticket) = app
        .post(
            &format!("{}/{}/upload-url", base, first),
            &ada.token,
            json!({ "fileName": "a.png", "contentType": "image/png", "size": 100 }),
        )
        .await?;

    let (status, body) = app
        .post(
            &format!("{}/{}/upload-confirm", base, second),
            &ada.token,
            json!({ "uploadId": ticket["data"]["uploadId"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Upload not found"));

    let (status, body) = app
        .post(&format!("{}/{}/upload-confirm", base, first), &ada.token, json!({ "uploadId": "nope" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("uploadId: Invalid upload id"));
    Ok(())
}

#[tokio::test]
async fn expired_tickets_cannot_be_confirmed() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let event = app.create_event(&ada, &slug, json!({})).await?;

    let stale = app
        .store
        .insert_pending_upload(NewPendingUpload {
            user_id: ada.user_id.parse()?,
            event_id: event.parse()?,
            object_key: format!("users/{}/stale.png", ada.user_id),
            file_name: "stale.png".to_string(),
            content_type: "image/png".to_string(),
            size_bytes: 100,
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await?;

    let (status, body) = app
        .post(
            &format!("/api/users/{}/tracks/{}/events/{}/upload-confirm", ada.user_id, slug, event),
            &ada.token,
            json!({ "uploadId": stale.id }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("uploadId: Upload has expired"));
    Ok(())
}

#[tokio::test]
async fn sweep_removes_only_expired_tickets() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let event = app.create_event(&ada, &slug, json!({})).await?;
    let uri = format!("/api/users/{}/tracks/{}/events/{}/upload-url", ada.user_id, slug, event);

    let (_, ticket) = app
        .post(&uri, &ada.token, json!({ "fileName": "a.png", "contentType": "image/png", "size": 100 }))
        .await?;
    let key = ticket["data"]["key"].as_str().unwrap_or_default().to_string();
    let upload_id: Uuid = ticket["data"]["uploadId"].as_str().unwrap_or_default().parse()?;

    let now = sweep_expired_uploads(app.store.as_ref(), app.storage.as_ref(), Utc::now()).await?;
    assert_eq!(now.removed, 0);
    assert!(app.store.find_pending_upload(upload_id).await?.is_some());

    app.storage.fail_deletes(true);
    let later = Utc::now() + Duration::days(1);
    let report = sweep_expired_uploads(app.store.as_ref(), app.storage.as_ref(), later).await?;
    assert_eq!(report.removed, 1);
    assert_eq!(report.storage_failures, 1);
    assert_eq!(app.storage.deleted(), vec![key]);
    assert!(app.store.find_pending_upload(upload_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn deleting_a_track_removes_objects_behind_unconfirmed_tickets() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let event = app.create_event(&ada, &slug, json!({})).await?;
    let track_uri = format!("/api/users/{}/tracks/{}", ada.user_id, slug);

    let (_, ticket) = app
        .post(
            &format!("{}/events/{}/upload-url", track_uri, event),
            &ada.token,
            json!({ "fileName": "a.png", "contentType": "image/png", "size": 100 }),
        )
        .await?;
    let key = ticket["data"]["key"].as_str().unwrap_or_default().to_string();

    let (status, _) = app.delete(&track_uri, &ada.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.storage.deleted(), vec![key]);

    // Nothing left behind for the sweep
    let later = Utc::now() + Duration::days(365);
    let report = sweep_expired_uploads(app.store.as_ref(), app.storage.as_ref(), later).await?;
    assert_eq!(report.removed, 0);
    Ok(())
}

#[tokio::test]
async fn deleting_an_event_removes_its_file_and_unconfirmed_tickets() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let event = app.create_event(&ada, &slug, json!({})).await?;
    let stored = attach_file(&app, &ada, &slug, &event, "first.pdf").await?;
    let event_uri = format!("/api/users/{}/tracks/{}/events/{}", ada.user_id, slug, event);

    let (_, ticket) = app
        .post(
            &format!("{}/upload-url", event_uri),
            &ada.token,
            json!({ "fileName": "second.pdf", "contentType": "application/pdf", "size": 100 }),
        )
        .await?;
    let pending = ticket["data"]["key"].as_str().unwrap_or_default().to_string();

    app.storage.fail_deletes(true);
    let (status, _) = app.delete(&event_uri, &ada.token).await?;
    assert_eq!(status, StatusCode::OK);

    let mut deleted = app.storage.deleted();
    deleted.sort();
    let mut expected = vec![stored, pending];
    expected.sort();
    assert_eq!(deleted, expected);
    Ok(())
}
