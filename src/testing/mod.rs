use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tempfile::TempDir;

use crate::auth::{Identity, TokenIssuer};
use crate::config::AppConfig;
use crate::database::models::{ChildIntake, DoctorProfile, NewAccount, Role};
use crate::database::repository::AccountRepo;
use crate::database::{MemoryStore, Store};
use crate::services::Services;
use crate::uploads::UploadStore;

static NEXT_ACCOUNT: AtomicU32 = AtomicU32::new(1);

/// Services wired over a fresh in-memory store and a temporary upload root.
pub struct TestContext {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub services: Services,
    pub uploads: UploadStore,
    _upload_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build with a config tweak, e.g. turning on record concealment.
    pub fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let upload_dir = tempfile::tempdir().expect("create upload dir");
        let mut config = AppConfig::for_tests(upload_dir.path());
        tweak(&mut config);

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let tokens = TokenIssuer::new(&config.security).expect("token issuer");
        let uploads = UploadStore::new(&config.uploads);
        let services = Services::new(store.clone(), &config, tokens, uploads.clone())
            .expect("services");

        Self {
            config,
            store,
            services,
            uploads,
            _upload_dir: upload_dir,
        }
    }

    /// Insert an enabled account with a unique email; the hash is not usable for login.
    pub async fn account(&self, role: Role) -> Identity {
        let n = NEXT_ACCOUNT.fetch_add(1, Ordering::Relaxed);
        let account = self
            .store
            .create_account(NewAccount {
                email: Some(format!("user{}@test.local", n)),
                phone: None,
                password_hash: "unusable".to_string(),
                role,
                enabled: true,
            })
            .await
            .expect("create account");
        Identity::from(&account)
    }

    /// A DOCTOR with a listed profile.
    pub async fn doctor(&self, name: &str) -> Identity {
        let identity = self.account(Role::Doctor).await;
        let mut profile = DoctorProfile::empty(identity.id);
        profile.name = name.to_string();
        profile.hospital = "City Children's Hospital".to_string();
        profile.title = Some("Attending".to_string());
        self.store
            .save_doctor_profile(&profile)
            .await
            .expect("save profile");
        identity
    }
}

pub fn sample_intake() -> ChildIntake {
    ChildIntake {
        child_name: "Xiao Ming".to_string(),
        child_age: 6,
        child_gender: "男".to_string(),
        parent_name: "Li Hua".to_string(),
        parent_phone: "13800138000".to_string(),
        preferred_date: None,
        preferred_time: Some("morning".to_string()),
        symptoms: Some("speech delay".to_string()),
        previous_treatment: None,
    }
}
