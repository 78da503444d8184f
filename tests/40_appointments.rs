mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use common::{intake, merge, TestServer};

#[tokio::test]
async fn appointment_lifecycle() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;
    let doctor = server.doctor("Dr. Chen").await?;

    let (status, body) = server
        .post(
            "/api/parent/appointments",
            &parent.token,
            merge(intake(), json!({ "doctorId": doctor.id })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, mine) = server.get("/api/parent/appointments/mine", &parent.token).await?;
    assert_eq!(mine["data"]["total"], 1);
    assert_eq!(mine["data"]["items"][0]["status"], "pending");
    assert_eq!(mine["data"]["items"][0]["doctorName"], "Dr. Chen");

    let (status, queue) = server.get("/api/admin/appointments", &doctor.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["data"]["items"][0]["id"], id);

    let (status, body) = server
        .patch(
            &format!("/api/admin/appointments/{}", id),
            &doctor.token,
            json!({ "status": "confirmed", "notes": "See you Monday" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let res = server
        .request(Method::PATCH, &format!("/api/parent/appointments/{}/cancel", id), Some(&parent.token))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field_errors"]["status"], "Only pending appointments can be cancelled");
    Ok(())
}

#[tokio::test]
async fn pending_appointments_can_be_cancelled_by_their_parent_only() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;
    let other = server.register("PARENT").await?;
    let doctor = server.doctor("Dr. Zhao").await?;

    let (_, body) = server
        .post(
            "/api/parent/appointments",
            &parent.token,
            merge(intake(), json!({ "doctorId": doctor.id })),
        )
        .await?;
    let id = body["data"]["id"].as_i64().unwrap();

    let path = format!("/api/parent/appointments/{}/cancel", id);
    let (status, _) = server.patch(&path, &other.token, json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.patch(&path, &parent.token, json!({ "reason": "Feeling better" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    Ok(())
}

#[tokio::test]
async fn doctors_only_see_and_update_their_own_queue() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;
    let assigned = server.doctor("Dr. Sun").await?;
    let other = server.doctor("Dr. Lin").await?;
    let admin = server.admin().await?;

    let (_, body) = server
        .post(
            "/api/parent/appointments",
            &parent.token,
            merge(intake(), json!({ "doctorId": assigned.id })),
        )
        .await?;
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, queue) = server.get("/api/admin/appointments", &other.token).await?;
    assert_eq!(queue["data"]["total"], 0);

    let path = format!("/api/admin/appointments/{}", id);
    let (status, _) = server.patch(&path, &other.token, json!({ "status": "rejected" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, queue) = server.get("/api/admin/appointments", &admin.token).await?;
    assert_eq!(queue["data"]["total"], 1);
    let (status, _) = server.patch(&path, &admin.token, json!({ "status": "completed" })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn page_size_is_clamped_to_the_listing_ceiling() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;

    let (status, body) = server
        .get("/api/parent/appointments/mine?page=1&pageSize=1000", &parent.token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pageSize"], 100);

    let (_, body) = server.get("/api/parent/forum/posts?pageSize=1000", &parent.token).await?;
    assert_eq!(body["data"]["pageSize"], 50);
    Ok(())
}

#[tokio::test]
async fn appointment_intake_is_validated() -> Result<()> {
    let server = TestServer::spawn().await?;
    let parent = server.register("PARENT").await?;
    let doctor = server.doctor("Dr. Qian").await?;

    let (status, body) = server
        .post(
            "/api/parent/appointments",
            &parent.token,
            merge(intake(), json!({ "doctorId": doctor.id, "parentPhone": "12345" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["parentPhone"].is_string());

    let (status, _) = server
        .post(
            "/api/parent/appointments",
            &parent.token,
            merge(intake(), json!({ "doctorId": parent.id })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
