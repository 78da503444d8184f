mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_reports_storage() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_describes_the_api() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/")).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CareLink API");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn api_routes_require_a_token() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/parent/forum/posts")).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}
