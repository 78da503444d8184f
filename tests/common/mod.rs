#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use carelink_api::app::{self, AppState};
use carelink_api::config::{AppConfig, BootstrapConfig};
use carelink_api::database::{MemoryStore, Store};

pub const ADMIN_EMAIL: &str = "root@carelink.test";
pub const ADMIN_PASSWORD: &str = "root-password";
pub const PASSWORD: &str = "password123";

static NEXT_USER: AtomicU32 = AtomicU32::new(1);

/// A server running in this test's runtime over a fresh memory store.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    _uploads: TempDir,
}

/// A registered account and its bearer token.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub token: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(tweak: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let uploads = tempfile::tempdir().context("failed to create upload dir")?;
        let mut config = AppConfig::for_tests(uploads.path());
        config.bootstrap = BootstrapConfig {
            superadmin_email: Some(ADMIN_EMAIL.to_string()),
            superadmin_password: Some(ADMIN_PASSWORD.to_string()),
        };
        tweak(&mut config);

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store)?;
        state
            .services
            .accounts
            .seed_super_admin(&state.config.bootstrap)
            .await?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let router = app::router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            state,
            _uploads: uploads,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        read(self.request(Method::GET, path, Some(token)).send().await?).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        read(self.request(Method::POST, path, Some(token)).json(&body).send().await?).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        read(self.request(Method::PATCH, path, Some(token)).json(&body).send().await?).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        read(self.request(Method::DELETE, path, Some(token)).send().await?).await
    }

    pub async fn register(&self, role: &str) -> Result<User> {
        let n = NEXT_USER.fetch_add(1, Ordering::SeqCst);
        let email = format!("{}-{}@carelink.test", role.to_lowercase(), n);
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": PASSWORD, "role": role }))
            .send()
            .await?;
        let (status, body) = read(res).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        user_from(&body, email)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        read(res).await
    }

    pub async fn admin(&self) -> Result<User> {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "admin login failed: {} {}", status, body);
        user_from(&body, ADMIN_EMAIL.to_string())
    }

    /// A DOCTOR account with a listed profile.
    pub async fn doctor(&self, name: &str) -> Result<User> {
        let doctor = self.register("DOCTOR").await?;
        let (status, body) = self
            .patch(
                "/api/doctors/me/profile",
                &doctor.token,
                json!({ "name": name, "hospital": "Children's Hospital", "title": "Attending" }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "profile update failed: {} {}", status, body);
        Ok(doctor)
    }
}

fn user_from(body: &Value, email: String) -> Result<User> {
    let data = &body["data"];
    Ok(User {
        id: data["user"]["id"].as_i64().context("missing user id")?,
        email,
        token: data["accessToken"]
            .as_str()
            .context("missing access token")?
            .to_string(),
    })
}

pub async fn read(res: Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let text = res.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))?
    };
    Ok((status, body))
}

/// A valid intake form for appointments and bookings.
pub fn intake() -> Value {
    json!({
        "childName": "Xiao Ming",
        "childAge": 6,
        "childGender": "男",
        "parentName": "Li Hua",
        "parentPhone": "13800138000",
        "symptoms": "Trouble sleeping"
    })
}

pub fn merge(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    base
}
