// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring of production adapters into a supervisor

use crate::config::{expand_tilde, Config};
use crate::supervisor::Supervisor;
use metarelay_adapters::{AgentDispatcher, SupabaseClient};
use metarelay_core::EventStoreError;
use metarelay_handlers::HandlerRegistry;
use metarelay_storage::SqliteEventStore;

/// Supervisor with concrete production adapter types.
pub type ProductionSupervisor = Supervisor<SupabaseClient, SqliteEventStore, AgentDispatcher>;

/// Open the event store configured in `db_path`.
pub fn open_store(config: &Config) -> Result<SqliteEventStore, EventStoreError> {
    SqliteEventStore::open(expand_tilde(&config.db_path))
}

/// Build a supervisor with production adapters: SQLite store, Supabase
/// cloud client, shell dispatcher, and the configured handler rules.
pub fn production(config: Config) -> Result<ProductionSupervisor, EventStoreError> {
    let store = open_store(&config)?;
    let cloud = SupabaseClient::new(
        config.cloud.supabase_url.as_str(),
        config.cloud.supabase_key.as_str(),
    );
    let registry = HandlerRegistry::new(config.handlers.clone());

    Ok(Supervisor::new(
        config,
        cloud,
        store,
        AgentDispatcher::new(),
        registry,
    ))
}
