mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestServer;

#[tokio::test]
async fn child_profile_starts_empty_and_merges_updates() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;

    let (status, body) = server
        .post(
            "/api/parent/growth/children",
            &parent.token,
            json!({ "name": "Xiao Hong", "gender": "女", "birthDate": "2019-04-12" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();
    let profile_path = format!("/api/parent/growth/children/{}/profile", id);

    let (status, body) = server.get(&profile_path, &parent.token).await?;
    assert_eq!(status, StatusCode::OK);
    let current = &body["data"]["currentStatus"];
    assert!(current["physicalDevelopment"]["height"].is_null());
    assert_eq!(current["dailySkills"]["selfCare"], 0);
    assert_eq!(current["behaviorObservation"]["strengths"], json!([]));

    let (status, body) = server
        .patch(
            &profile_path,
            &parent.token,
            json!({ "heightCm": 112.5, "behaviorStrengths": ["curious"], "dailyMotor": 70 }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let current = &body["data"]["currentStatus"];
    assert_eq!(current["physicalDevelopment"]["height"], 112.5);
    assert!(current["physicalDevelopment"]["lastUpdated"].is_string());
    assert_eq!(current["behaviorObservation"]["strengths"], json!(["curious"]));
    assert_eq!(current["dailySkills"]["motor"], 70);

    let (_, body) = server.patch(&profile_path, &parent.token, json!({ "weightKg": 19.0 })).await?;
    let physical = &body["data"]["currentStatus"]["physicalDevelopment"];
    assert_eq!(physical["height"], 112.5);
    assert_eq!(physical["weight"], 19.0);

    let (status, body) = server.patch(&profile_path, &parent.token, json!({ "heightCm": 500 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["heightCm"].is_string());
    Ok(())
}

#[tokio::test]
async fn health_records_follow_child_ownership() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;
    let stranger = server.register("PARENT").await?;

    let (_, body) = server
        .post(
            "/api/parent/growth/children",
            &parent.token,
            json!({ "name": "Xiao Gang", "gender": "男", "birthDate": "2018-09-01" }),
        )
        .await?;
    let child_id = body["data"]["id"].as_i64().unwrap();
    let records = format!("/api/parent/growth/children/{}/health-records", child_id);

    let (status, body) = server
        .post(
            &records,
            &parent.token,
            json!({ "date": "2024-03-01", "type": "checkup", "result": "healthy" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let record_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["type"], "checkup");

    let (status, _) = server.get(&records, &stranger.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let record = format!("/api/parent/growth/health-records/{}", record_id);
    let (status, _) = server.patch(&record, &stranger.token, json!({ "result": "tampered" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.patch(&record, &parent.token, json!({ "result": "follow up in 6 months" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], "follow up in 6 months");

    let (_, listing) = server.get(&records, &parent.token).await?;
    assert_eq!(listing["data"]["total"], 1);

    let (status, _) = server.delete(&format!("/api/parent/growth/children/{}", child_id), &parent.token).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.get(&records, &parent.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn children_are_listed_per_parent() -> Result<()> {
    let server = TestServer::spawn().await?;
    let a = server.register("PARENT").await?;
    let b = server.register("PARENT").await?;

    server
        .post(
            "/api/parent/growth/children",
            &a.token,
            json!({ "name": "Child A", "gender": "男", "birthDate": "2020-01-01" }),
        )
        .await?;

    let (_, mine) = server.get("/api/parent/growth/children", &a.token).await?;
    assert_eq!(mine["data"].as_array().map(Vec::len), Some(1));
    let (_, theirs) = server.get("/api/parent/growth/children", &b.token).await?;
    assert_eq!(theirs["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}
