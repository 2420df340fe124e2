use std::sync::Arc;

use crate::auth::repo::{MemoryUserStore, UserStore};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Ok(Self::from_parts(config, Arc::new(MemoryUserStore::new())))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            api_version: "/api/v1".into(),
            client_url: "http://localhost:3000".into(),
            jwt: crate::config::JwtConfig {
                access_secret: "test-access".into(),
                access_ttl: Duration::from_secs(5 * 60),
                refresh_secret: "test-refresh".into(),
                refresh_ttl: Duration::from_secs(60 * 60),
            },
        });
        Self::from_parts(config, Arc::new(MemoryUserStore::new()))
    }
}
