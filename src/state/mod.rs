use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::aml::{AmlCheckService, AmlProvider};
use crate::config::{AuthConfig, CacheConfig, WorkflowConfig};
use crate::entities::wallet_check;
use crate::workflow::RequestLifecycle;
use crate::workflow::input::InputPolicy;

#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseConnection,
    pub cache: Arc<ApiCache>,
    pub lifecycle: RequestLifecycle,
    pub aml: AmlCheckService,
    pub auth: AuthConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        database: DatabaseConnection,
        cache: Arc<ApiCache>,
        provider: Arc<dyn AmlProvider>,
        workflow: &WorkflowConfig,
        auth: AuthConfig,
    ) -> Self {
        assert!(
            cache.wallet_check_capacity >= 100,
            "Wallet check cache capacity must be configured"
        );
        let policy = Arc::new(InputPolicy::from_config(workflow));
        let lifecycle = RequestLifecycle::new(database.clone(), Arc::clone(&policy));
        let aml = AmlCheckService::new(
            database.clone(),
            provider,
            cache.wallet_checks.clone(),
            policy,
        );
        Self {
            database,
            cache,
            lifecycle,
            aml,
            auth,
            start_time: Instant::now(),
        }
    }
}

pub struct ApiCache {
    /// Stored checks never change, so entries only leave by TTL or capacity.
    pub wallet_checks: Cache<Uuid, Arc<wallet_check::Model>>,
    pub wallet_check_capacity: u64,
}

impl ApiCache {
    pub fn new(config: &CacheConfig) -> Self {
        assert!(
            config.wallet_checks_max_capacity >= 100,
            "Wallet check cache capacity threshold"
        );

        let wallet_checks = Cache::builder()
            .max_capacity(config.wallet_checks_max_capacity)
            .time_to_live(Duration::from_secs(config.wallet_checks_ttl_seconds))
            .time_to_idle(Duration::from_secs(config.wallet_checks_ttl_seconds / 2 + 1))
            .build();

        Self {
            wallet_checks,
            wallet_check_capacity: config.wallet_checks_max_capacity,
        }
    }
}
