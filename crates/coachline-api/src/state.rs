//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository/hasher traits, but AppState pins them
//! to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use coachline_core::relay::Relay;
use coachline_core::service::account::AccountService;
use coachline_core::service::history::HistoryService;
use coachline_infra::config::{load_relay_config, resolve_data_dir};
use coachline_infra::crypto::password::Argon2PasswordHasher;
use coachline_infra::crypto::token::Sha256TokenIssuer;
use coachline_infra::sqlite::identity::SqliteIdentityDirectory;
use coachline_infra::sqlite::message::SqliteMessageStore;
use coachline_infra::sqlite::pool::{DatabasePool, database_url};
use coachline_infra::sqlite::session::SqliteSessionStore;
use coachline_types::config::RelayConfig;
use tokio::task::JoinHandle;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteAccountService = AccountService<
    SqliteIdentityDirectory,
    SqliteSessionStore,
    Argon2PasswordHasher,
    Sha256TokenIssuer,
>;

pub type ConcreteHistoryService = HistoryService<SqliteIdentityDirectory, SqliteMessageStore>;

/// Shared application state holding all services and the relay handle.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<ConcreteAccountService>,
    pub history_service: Arc<ConcreteHistoryService>,
    pub relay: Relay,
    pub config: Arc<RelayConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire
    /// services, start the relay's dispatcher.
    ///
    /// The returned handle completes once the dispatcher has drained its
    /// queue, which happens after every clone of the state is dropped.
    pub async fn init() -> anyhow::Result<(Self, JoinHandle<()>)> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_relay_config(&data_dir).await;

        let db_url = format!("{}?mode=rwc", database_url(&data_dir));
        let db_pool = DatabasePool::new(&db_url).await?;

        let directory = SqliteIdentityDirectory::new(db_pool.clone());
        let store = SqliteMessageStore::new(db_pool.clone());

        let account_service = AccountService::new(
            directory.clone(),
            SqliteSessionStore::new(db_pool.clone()),
            Argon2PasswordHasher::new(),
            Sha256TokenIssuer::new(),
            config.auth.session_ttl_hours,
        );
        let history_service = HistoryService::new(directory.clone(), store.clone());

        let (relay, dispatcher) = Relay::start_configured(directory, store, &config.relay);

        Ok((
            Self {
                account_service: Arc::new(account_service),
                history_service: Arc::new(history_service),
                relay,
                config: Arc::new(config),
                data_dir,
                db_pool,
            },
            dispatcher,
        ))
    }
}
