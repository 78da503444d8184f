mod common;

use anyhow::Result;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use common::{TestServer, User};

const CLIP: &[u8] = b"0123456789abcdefghij";

async fn upload(server: &TestServer, doctor: &User, title: &str) -> Result<(StatusCode, Value)> {
    let form = Form::new()
        .text("title", title.to_string())
        .text("description", "Daily routines for toddlers")
        .text("category", "behavior")
        .text("tags", "sleep")
        .text("tags", "routine")
        .text("difficulty", "intermediate")
        .part(
            "file",
            Part::bytes(CLIP.to_vec()).file_name("clip.mp4").mime_str("video/mp4")?,
        );
    let res = server
        .request(Method::POST, "/api/videos", Some(&doctor.token))
        .multipart(form)
        .send()
        .await?;
    common::read(res).await
}

#[tokio::test]
async fn uploaded_videos_are_published_with_author_snapshot() -> Result<()> {
    let server = TestServer::spawn().await?;
    let doctor = server.doctor("Dr. Wei").await?;

    let (status, body) = upload(&server, &doctor, "Calm evenings").await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let video = &body["data"];
    assert_eq!(video["status"], "published");
    assert_eq!(video["tags"], json!(["sleep", "routine"]));
    assert_eq!(video["difficulty"], "intermediate");
    assert_eq!(video["authorSnapshotName"], "Dr. Wei");
    assert_eq!(video["fileSizeBytes"], CLIP.len());
    assert!(video.get("storagePath").is_none());

    let (_, mine) = server.get("/api/videos/mine", &doctor.token).await?;
    assert_eq!(mine["data"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn courses_are_listed_viewed_and_streamed() -> Result<()> {
    let server = TestServer::spawn().await?;
    let doctor = server.doctor("Dr. Kong").await?;
    let parent = server.register("PARENT").await?;

    let (_, body) = upload(&server, &doctor, "Play therapy").await?;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, listing) = server.get("/api/client/expert-courses?q=kong", &parent.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["data"]["items"][0]["id"], id);

    let (_, detail) = server.get(&format!("/api/client/expert-courses/{}", id), &parent.token).await?;
    assert_eq!(detail["data"]["viewCount"], 1);

    let stream = format!("/api/client/expert-courses/{}/stream", id);
    let res = server
        .request(Method::GET, &stream, Some(&parent.token))
        .header(RANGE, "bytes=0-3")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    let range = res.headers().get(CONTENT_RANGE).and_then(|v| v.to_str().ok()).map(str::to_string);
    assert_eq!(range.as_deref(), Some(format!("bytes 0-3/{}", CLIP.len()).as_str()));
    assert_eq!(res.bytes().await?.as_ref(), &CLIP[..4]);

    // Media elements cannot send headers; the token rides in the query.
    let res = server
        .client
        .get(server.url(&format!("{}?token={}", stream, parent.token)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await?.as_ref(), CLIP);
    Ok(())
}

#[tokio::test]
async fn videos_are_managed_by_their_author() -> Result<()> {
    let server = TestServer::spawn().await?;
    let author = server.doctor("Dr. Pan").await?;
    let other = server.doctor("Dr. Shi").await?;

    let (_, body) = upload(&server, &author, "Fine motor games").await?;
    let path = format!("/api/videos/{}", body["data"]["id"]);

    let (status, _) = server.patch(&path, &other.token, json!({ "title": "Mine now" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = server.delete(&path, &other.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .patch(&path, &author.token, json!({ "title": "Fine motor games, part 1", "difficulty": "beginner" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Fine motor games, part 1");
    assert_eq!(body["data"]["difficulty"], "beginner");

    let (status, _) = server.delete(&path, &author.token).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.get(&path, &author.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn non_video_files_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let doctor = server.doctor("Dr. Lu").await?;

    let form = Form::new()
        .text("title", "Slides")
        .text("description", "Not a video")
        .text("category", "misc")
        .part(
            "file",
            Part::bytes(b"%PDF".to_vec()).file_name("slides.pdf").mime_str("application/pdf")?,
        );
    let res = server
        .request(Method::POST, "/api/videos", Some(&doctor.token))
        .multipart(form)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["file"].is_string());
    Ok(())
}
