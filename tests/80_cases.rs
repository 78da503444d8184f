mod common;

use std::path::Path;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::json;

use common::TestServer;

fn pdf(name: &str) -> Part {
    Part::bytes(b"%PDF-1.4 test".to_vec())
        .file_name(name.to_string())
        .mime_str("application/pdf")
        .unwrap()
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

#[tokio::test]
async fn cases_are_created_from_multipart_forms() -> Result<()> {
    let server = TestServer::spawn().await?;
    let doctor = server.doctor("Dr. Yang").await?;
    let cases_dir = server.state.uploads.root().join("cases");

    let form = Form::new()
        .text("title", "Speech delay")
        .text("description", "Follow-up notes")
        .text("caseType", "offline")
        .part("files", pdf("report.pdf"))
        .part("files", pdf("scan.pdf"));
    let res = server
        .request(Method::POST, "/api/cases", Some(&doctor.token))
        .multipart(form)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let case = &body["data"];
    assert_eq!(case["title"], "Speech delay");
    assert_eq!(case["caseType"], "offline");
    assert_eq!(case["status"], "uploaded");
    assert_eq!(case["files"].as_array().map(Vec::len), Some(2));
    assert!(case["files"][0].get("storagePath").is_none());
    assert_eq!(count_files(&cases_dir), 2);

    let id = case["id"].as_i64().unwrap();
    let file_id = case["files"][0]["id"].as_i64().unwrap();
    let (status, _) = server
        .delete(&format!("/api/cases/{}/files/{}", id, file_id), &doctor.token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count_files(&cases_dir), 1);

    let (status, _) = server.delete(&format!("/api/cases/{}", id), &doctor.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count_files(&cases_dir), 0);
    Ok(())
}

#[tokio::test]
async fn case_uploads_are_validated() -> Result<()> {
    let server = TestServer::spawn().await?;
    let doctor = server.doctor("Dr. Tang").await?;
    let cases_dir = server.state.uploads.root().join("cases");

    let no_files = Form::new().text("title", "Empty");
    let res = server
        .request(Method::POST, "/api/cases", Some(&doctor.token))
        .multipart(no_files)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["files"].is_string());

    let wrong_type = Form::new().text("title", "Script").part(
        "files",
        Part::bytes(b"#!/bin/sh".to_vec())
            .file_name("run.sh")
            .mime_str("application/x-sh")?,
    );
    let res = server
        .request(Method::POST, "/api/cases", Some(&doctor.token))
        .multipart(wrong_type)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let no_title = Form::new().part("files", pdf("orphan.pdf"));
    let res = server
        .request(Method::POST, "/api/cases", Some(&doctor.token))
        .multipart(no_title)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(count_files(&cases_dir), 0);
    Ok(())
}

#[tokio::test]
async fn cases_belong_to_their_doctor() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.doctor("Dr. Feng").await?;
    let other = server.doctor("Dr. Bai").await?;

    let form = Form::new().text("title", "Private case").part("files", pdf("a.pdf"));
    let res = server
        .request(Method::POST, "/api/cases", Some(&owner.token))
        .multipart(form)
        .send()
        .await?;
    let (_, body) = common::read(res).await?;
    let path = format!("/api/cases/{}", body["data"]["id"]);

    let (status, _) = server.get(&path, &other.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = server.patch(&path, &other.token, json!({ "status": "reviewed" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.patch(&path, &owner.token, json!({ "status": "reviewed" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "reviewed");

    let (_, mine) = server.get("/api/cases/mine", &other.token).await?;
    assert_eq!(mine["data"]["total"], 0);
    Ok(())
}
