// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Creates session managers bound to one shared client.

use std::sync::Arc;

use sessiondb_config::{SessionDbConfig, StorageConfig};
use sessiondb_core::{DEFAULT_SESSION_TYPE, SessionDbResult};
use sessiondb_storage::{ConnectionPool, DocumentClient, SessionRepository, paths};
use tracing::debug;

use crate::hooks::Hooks;
use crate::manager::SessionManager;

/// Hands out [`SessionManager`]s that borrow a pooled client.
///
/// Creating a manager opens no connection; it only builds a repository over
/// the shared client and creates or joins the session document.
#[derive(Debug, Clone)]
pub struct SessionManagerFactory {
    client: Arc<DocumentClient>,
    collection: String,
    indexed_fields: Vec<String>,
    session_type: String,
    default_hooks: Hooks,
}

impl SessionManagerFactory {
    /// Initialize (or reuse) `pool` with the storage settings and bind to it.
    pub fn new(pool: &ConnectionPool, storage: &StorageConfig) -> SessionDbResult<Self> {
        let client = pool.initialize(&storage.connection_uri, &storage.pool)?;
        Self::from_client(client, storage.collection.clone())
    }

    /// Like [`new`](Self::new), also picking up the indexed metadata fields.
    pub fn from_config(pool: &ConnectionPool, config: &SessionDbConfig) -> SessionDbResult<Self> {
        Ok(Self::new(pool, &config.storage)?
            .with_indexed_fields(config.report.indexed_fields.clone()))
    }

    pub fn from_client(client: Arc<DocumentClient>, collection: impl Into<String>) -> SessionDbResult<Self> {
        let collection = collection.into();
        paths::validate_collection(&collection)?;
        Ok(Self {
            client,
            collection,
            indexed_fields: Vec::new(),
            session_type: DEFAULT_SESSION_TYPE.to_string(),
            default_hooks: Hooks::default(),
        })
    }

    pub fn with_indexed_fields(mut self, fields: Vec<String>) -> Self {
        self.indexed_fields = fields;
        self
    }

    /// Session type recorded for sessions this factory creates.
    pub fn with_session_type(mut self, session_type: impl Into<String>) -> Self {
        self.session_type = session_type.into();
        self
    }

    /// Hooks used when [`create_session_manager`](Self::create_session_manager)
    /// is not given any.
    pub fn with_default_hooks(mut self, hooks: Hooks) -> Self {
        self.default_hooks = hooks;
        self
    }

    pub fn client(&self) -> &Arc<DocumentClient> {
        &self.client
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// A repository over the shared client, for callers that need no manager.
    pub fn repository(&self) -> SessionDbResult<SessionRepository> {
        Ok(
            SessionRepository::with_client(Arc::clone(&self.client), self.collection.clone())?
                .with_indexed_fields(self.indexed_fields.clone()),
        )
    }

    pub fn create_session_manager(
        &self,
        session_id: &str,
        hooks: Option<Hooks>,
    ) -> SessionDbResult<SessionManager> {
        let hooks = hooks.unwrap_or_else(|| self.default_hooks.clone());
        debug!(session_id, collection = %self.collection, ?hooks, "creating session manager");
        SessionManager::open(session_id, &self.session_type, self.repository()?, hooks)
    }
}

#[cfg(test)]
mod tests {
    use sessiondb_config::PoolConfig;
    use sessiondb_core::SessionDbError;

    use super::*;

    fn factory() -> SessionManagerFactory {
        let client = DocumentClient::connect("sqlite::memory:", &PoolConfig::default()).unwrap();
        SessionManagerFactory::from_client(Arc::new(client), "sessions").unwrap()
    }

    #[test]
    fn managers_share_the_client() {
        let factory = factory();
        let before = Arc::strong_count(factory.client());
        let a = factory.create_session_manager("a", None).unwrap();
        let b = factory.create_session_manager("b", None).unwrap();
        assert!(Arc::ptr_eq(a.repository().client(), b.repository().client()));
        assert_eq!(Arc::strong_count(factory.client()), before + 2);
        assert_eq!(factory.client().counts().total, 1);
    }

    #[test]
    fn closing_a_manager_keeps_the_pooled_client_open() {
        let factory = factory();
        let manager = factory.create_session_manager("a", None).unwrap();
        manager.close();
        assert!(!factory.client().is_closed());
        let again = factory.create_session_manager("a", None).unwrap();
        assert!(again.read_session().unwrap().is_some());
    }

    #[test]
    fn session_type_is_applied() {
        let factory = factory().with_session_type("batch");
        let manager = factory.create_session_manager("a", None).unwrap();
        assert_eq!(manager.read_session().unwrap().unwrap().session_type, "batch");
    }

    #[test]
    fn explicit_hooks_replace_defaults() {
        let factory = factory().with_default_hooks(Hooks::new().with_metadata(Arc::new(crate::AuditHook)));
        assert!(factory.create_session_manager("a", None).unwrap().hooks().metadata.is_some());
        assert!(factory
            .create_session_manager("a", Some(Hooks::new()))
            .unwrap()
            .hooks()
            .is_empty());
    }

    #[test]
    fn rejects_bad_collection_names() {
        let client = DocumentClient::connect("sqlite::memory:", &PoolConfig::default()).unwrap();
        assert!(matches!(
            SessionManagerFactory::from_client(Arc::new(client), "drop table").unwrap_err(),
            SessionDbError::Validation(_)
        ));
    }
}
