//! Application state and composition.

use std::sync::Arc;

use anyhow::Context;
use questline_domain::{Adventure, Character, Resource, StoredFile, Topic, Verb};

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config::AppConfig,
    event_bus::{BusHook, EventBus, EventListener},
    listeners::{AuditTrail, OrphanedFileSweeper},
    persistence::{SqliteConnection, SqliteDocumentStore, SqliteFileStore, SqliteSessionStore},
    ports::{ClockPort, PrincipalProvider, RandomPort, ResourceStore},
};
use crate::use_cases::lifecycle::{AccessPolicy, ResourceLifecycle};

/// Main application state.
///
/// One lifecycle per resource kind, all sharing a single database.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub adventures: ResourceLifecycle<Adventure>,
    pub characters: ResourceLifecycle<Character>,
    pub files: ResourceLifecycle<StoredFile>,
    pub sessions: Arc<dyn PrincipalProvider>,
    pub file_store: Arc<SqliteFileStore>,
    pub clock: Arc<dyn ClockPort>,
    buses: Vec<Arc<EventBus>>,
    connection: SqliteConnection,
}

impl App {
    /// Opens the database, wires stores to their event buses and seeds sessions.
    ///
    /// Must run inside a Tokio runtime: each bus spawns its dispatcher.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let connection = SqliteConnection::open(&config.database_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database_path.display()))?;

        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let random: Arc<dyn RandomPort> = Arc::new(SystemRandom::new());

        let adventure_store = Arc::new(SqliteDocumentStore::<Adventure>::new(&connection, clock.clone()));
        let character_store = Arc::new(SqliteDocumentStore::<Character>::new(&connection, clock.clone()));
        let file_store = Arc::new(SqliteFileStore::new(&connection));

        // Event buses: one per kind, fed by the stores' commit hooks
        let adventure_bus = EventBus::start(Adventure::KIND);
        let character_bus = EventBus::start(Character::KIND);
        let file_bus = EventBus::start(StoredFile::KIND);
        adventure_store.register_hook(BusHook::new(adventure_bus.clone()));
        character_store.register_hook(BusHook::new(character_bus.clone()));
        file_store.register_hook(BusHook::new(file_bus.clone()));

        let audit: Arc<dyn EventListener> = Arc::new(AuditTrail);
        let sweeper: Arc<dyn EventListener> = Arc::new(OrphanedFileSweeper::new(file_store.clone()));
        for bus in [&adventure_bus, &character_bus, &file_bus] {
            bus.subscribe(Topic::All(Verb::Save), audit.clone());
            bus.subscribe(Topic::All(Verb::Remove), audit.clone());
        }
        for bus in [&adventure_bus, &character_bus] {
            bus.subscribe(Topic::All(Verb::Remove), sweeper.clone());
        }

        let sessions = Arc::new(SqliteSessionStore::new(&connection, clock.clone()));
        for grant in &config.session_seed {
            sessions
                .grant(grant)
                .await
                .with_context(|| format!("Failed to seed session for user {}", grant.user_id))?;
        }
        if !config.session_seed.is_empty() {
            tracing::info!(count = config.session_seed.len(), "Seeded sessions");
        }

        let policy = AccessPolicy::standard();
        Ok(Self {
            adventures: ResourceLifecycle::new(
                adventure_store,
                policy.clone(),
                random.clone(),
                config.short_ids,
            ),
            characters: ResourceLifecycle::new(
                character_store,
                policy.clone(),
                random.clone(),
                config.short_ids,
            ),
            files: ResourceLifecycle::new(file_store.clone(), policy, random, config.short_ids),
            sessions,
            file_store,
            clock,
            buses: vec![adventure_bus, character_bus, file_bus],
            connection,
        })
    }

    /// Stops accepting events and waits until every queued one was delivered.
    pub async fn stop_event_buses(&self) {
        for bus in &self.buses {
            bus.shutdown().await;
        }
    }

    /// Drains the event buses, then closes the database.
    pub async fn shutdown(&self) {
        self.stop_event_buses().await;
        self.connection.close().await;
        tracing::info!("Application shut down");
    }
}
