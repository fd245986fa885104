mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{attach_file, TestApp};

#[tokio::test]
async fn colliding_titles_get_numbered_slugs() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let bob = app.register("bob@example.com").await?;

    assert_eq!(app.create_track(&ada, "Sleep & Hydration Tracking!").await?, "sleep-hydration-tracking");
    assert_eq!(app.create_track(&ada, "sleep hydration tracking").await?, "sleep-hydration-tracking-2");
    assert_eq!(app.create_track(&ada, "Sleep -- Hydration Tracking").await?, "sleep-hydration-tracking-3");
    assert_eq!(app.create_track(&bob, "Sleep & Hydration Tracking!").await?, "sleep-hydration-tracking");
    assert_eq!(app.create_track(&ada, "!!!").await?, "track");
    assert_eq!(app.create_track(&ada, "???").await?, "track-2");

    let (status, body) = app.get(&format!("/api/users/{}/tracks", ada.user_id), &ada.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn track_creation_is_validated() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let uri = format!("/api/users/{}/tracks", ada.user_id);

    let (status, body) = app.post(&uri, &ada.token, json!({ "title": "   " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("title: Required"));

    let (status, body) = app
        .post(&uri, &ada.token, json!({ "title": "x".repeat(121), "description": "ok" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("title: Must be at most 120 characters"));

    let (status, body) = app
        .post(&uri, &ada.token, json!({ "title": " Knee rehab ", "description": "  " }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["title"], json!("Knee rehab"));
    assert_eq!(body["data"]["description"], json!(null));
    assert!(body["data"].get("userId").is_none());
    Ok(())
}

#[tokio::test]
async fn patch_keeps_the_slug() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Sleep").await?;
    let uri = format!("/api/users/{}/tracks/{}", ada.user_id, slug);

    let (status, body) = app
        .patch(&uri, &ada.token, json!({ "title": "Sleep quality", "description": "Nightly notes" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], json!("Sleep quality"));
    assert_eq!(body["data"]["slug"], json!("sleep"));
    assert_eq!(body["data"]["description"], json!("Nightly notes"));

    let (status, body) = app.patch(&uri, &ada.token, json!({ "description": null })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], json!("Sleep quality"));
    assert_eq!(body["data"]["description"], json!(null));
    Ok(())
}

#[tokio::test]
async fn missing_track_is_404() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;

    let uri = format!("/api/users/{}/tracks/nope", ada.user_id);
    for (status, body) in [app.get(&uri, &ada.token).await?, app.delete(&uri, &ada.token).await?] {
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Track not found"));
    }
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_one_stored_file_and_cascades() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Bloods").await?;
    let with_file = app.create_event(&ada, &slug, json!({ "type": "RESULT", "title": "Panel" })).await?;
    app.create_event(&ada, &slug, json!({ "title": "Follow-up" })).await?;
    let key = attach_file(&app, &ada, &slug, &with_file, "panel.pdf").await?;

    let uri = format!("/api/users/{}/tracks/{}", ada.user_id, slug);
    let (status, body) = app.delete(&uri, &ada.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], json!(true));
    assert_eq!(app.storage.deleted(), vec![key]);

    let (status, _) = app.get(&uri, &ada.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.get(&format!("{}/events/{}", uri, with_file), &ada.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Track not found"));
    Ok(())
}

#[tokio::test]
async fn delete_succeeds_when_storage_cleanup_fails() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let slug = app.create_track(&ada, "Scans").await?;
    let with_file = app.create_event(&ada, &slug, json!({ "title": "MRI" })).await?;
    app.create_event(&ada, &slug, json!({ "title": "Notes" })).await?;
    attach_file(&app, &ada, &slug, &with_file, "mri.png").await?;

    app.storage.fail_deletes(true);
    let uri = format!("/api/users/{}/tracks/{}", ada.user_id, slug);
    let (status, body) = app.delete(&uri, &ada.token).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(app.storage.deleted().len(), 1);

    let (status, _) = app.get(&uri, &ada.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn recreated_title_reuses_a_freed_slug() -> Result<()> {
    let app = TestApp::new();
    let ada = app.register("ada@example.com").await?;
    let first = app.create_track(&ada, "Sleep").await?;
    app.create_track(&ada, "Sleep").await?;

    app.delete(&format!("/api/users/{}/tracks/{}", ada.user_id, first), &ada.token).await?;
    assert_eq!(app.create_track(&ada, "Sleep").await?, "sleep");
    Ok(())
}
