// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session repository: the only component that issues statements.
//!
//! Every operation validates its identifiers first, then runs one query
//! function on a pooled connection. A repository either owns its client
//! (built from a connection URI; closing the repository closes the client)
//! or borrows one (typically from a [`ConnectionPool`](crate::ConnectionPool));
//! a borrowed client is never closed here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::Connection;
use sessiondb_config::StorageConfig;
use sessiondb_core::{
    AgentData, ContentBlock, EventLoopMetrics, Feedback, Message, MessagePatch, Metadata,
    MetadataValue, NewMessage, Rating, Session, SessionAgent, SessionDbError, SessionDbResult,
};
use tracing::{debug, info};

use crate::client::{Access, DocumentClient};
use crate::models::{MetadataFilter, SessionSummary};
use crate::{migrations, paths, queries};

/// Session persistence over one collection of a [`DocumentClient`].
#[derive(Debug)]
pub struct SessionRepository {
    client: Arc<DocumentClient>,
    collection: String,
    indexed_fields: Vec<String>,
    owned: bool,
    prepared: AtomicBool,
    closed: AtomicBool,
}

impl SessionRepository {
    /// Open a repository that owns a freshly connected client.
    pub fn connect(config: &StorageConfig) -> SessionDbResult<Self> {
        paths::validate_collection(&config.collection)?;
        let client = DocumentClient::connect(&config.connection_uri, &config.pool)?;
        Ok(Self::build(Arc::new(client), config.collection.clone(), true))
    }

    /// Borrow a client owned elsewhere.
    pub fn with_client(client: Arc<DocumentClient>, collection: impl Into<String>) -> SessionDbResult<Self> {
        let collection = collection.into();
        paths::validate_collection(&collection)?;
        Ok(Self::build(client, collection, false))
    }

    /// Metadata keys that get an expression index.
    pub fn with_indexed_fields(mut self, fields: Vec<String>) -> Self {
        self.indexed_fields = fields;
        self
    }

    fn build(client: Arc<DocumentClient>, collection: String, owned: bool) -> Self {
        Self {
            client,
            collection,
            indexed_fields: Vec::new(),
            owned,
            prepared: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn client(&self) -> &Arc<DocumentClient> {
        &self.client
    }

    /// Whether closing this repository closes the client.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Create the collection's expression indexes. Failures are logged, never fatal.
    ///
    /// Runs automatically on first use; calling it again is harmless.
    pub fn ensure_indexes(&self) -> SessionDbResult<usize> {
        self.write(|conn| {
            Ok(migrations::ensure_indexes(
                conn,
                &self.collection,
                &self.indexed_fields,
            ))
        })
    }

    // --- sessions ---

    /// Create the session, or return the stored one unchanged if the id is taken.
    pub fn create_session(
        &self,
        session_id: &str,
        session_type: &str,
        metadata: Metadata,
    ) -> SessionDbResult<Session> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("session_type", session_type)?;
        validate_keys(metadata.keys())?;
        let (session, created) = self.write(|conn| {
            queries::sessions::create_session(
                conn,
                &self.collection,
                session_id,
                session_type,
                metadata.clone(),
            )
        })?;
        if created {
            info!(session_id, "session created");
        } else {
            debug!(session_id, "joined existing session");
        }
        Ok(session)
    }

    pub fn read_session(&self, session_id: &str) -> SessionDbResult<Option<Session>> {
        paths::validate_identifier("session_id", session_id)?;
        self.read(|conn| queries::sessions::read_session(conn, &self.collection, session_id))
    }

    pub fn session_exists(&self, session_id: &str) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        self.read(|conn| queries::sessions::session_exists(conn, &self.collection, session_id))
    }

    pub fn delete_session(&self, session_id: &str) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        let removed =
            self.write(|conn| queries::sessions::delete_session(conn, &self.collection, session_id))?;
        if removed {
            info!(session_id, "session deleted");
        }
        Ok(removed)
    }

    // --- metadata ---

    /// Set each key of `patch` under `metadata`, all in one write.
    ///
    /// Returns `false` when the session does not exist.
    pub fn update_metadata(&self, session_id: &str, patch: &Metadata) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        if patch.is_empty() {
            return Err(SessionDbError::Validation(
                "metadata patch must not be empty".into(),
            ));
        }
        validate_keys(patch.keys())?;
        self.write(|conn| {
            queries::metadata::update_metadata(conn, &self.collection, session_id, patch)
        })
    }

    /// Unset each of `keys` under `metadata`, all in one write.
    pub fn delete_metadata(&self, session_id: &str, keys: &[String]) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        if keys.is_empty() {
            return Err(SessionDbError::Validation(
                "at least one metadata key is required".into(),
            ));
        }
        validate_keys(keys.iter())?;
        self.write(|conn| {
            queries::metadata::delete_metadata(conn, &self.collection, session_id, keys)
        })
    }

    pub fn get_metadata(&self, session_id: &str) -> SessionDbResult<Option<Metadata>> {
        paths::validate_identifier("session_id", session_id)?;
        self.read(|conn| queries::metadata::get_metadata(conn, &self.collection, session_id))
    }

    // --- agents ---

    /// Write an agent's data, keeping its original `created_at`.
    pub fn create_or_update_agent(
        &self,
        session_id: &str,
        agent_id: &str,
        agent_data: &AgentData,
    ) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.write(|conn| {
            queries::agents::upsert_agent(conn, &self.collection, session_id, agent_id, agent_data)
        })
    }

    pub fn read_agent(&self, session_id: &str, agent_id: &str) -> SessionDbResult<Option<SessionAgent>> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.read(|conn| queries::agents::read_agent(conn, &self.collection, session_id, agent_id))
    }

    pub fn agent_ids(&self, session_id: &str) -> SessionDbResult<Vec<String>> {
        paths::validate_identifier("session_id", session_id)?;
        self.read(|conn| queries::agents::agent_ids(conn, &self.collection, session_id))
    }

    // --- messages ---

    /// Append a message and return it with its store-assigned `message_id`.
    pub fn append_message(
        &self,
        session_id: &str,
        agent_id: &str,
        message: &NewMessage,
    ) -> SessionDbResult<Option<Message>> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.write(|conn| {
            queries::messages::append_message(conn, &self.collection, session_id, agent_id, message)
        })
    }

    /// Change the content and/or metrics of one message, keeping its `created_at`.
    pub fn update_message(
        &self,
        session_id: &str,
        agent_id: &str,
        message_id: u64,
        patch: &MessagePatch,
    ) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        if patch.is_empty() {
            return Err(SessionDbError::Validation(
                "message patch must set content or metrics".into(),
            ));
        }
        self.write(|conn| {
            queries::messages::update_message(
                conn,
                &self.collection,
                session_id,
                agent_id,
                message_id,
                patch,
            )
        })
    }

    /// Blank a message's content while keeping its id and position.
    pub fn redact_message(
        &self,
        session_id: &str,
        agent_id: &str,
        message_id: u64,
        replacement: Vec<ContentBlock>,
    ) -> SessionDbResult<bool> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        let redacted = self.write(|conn| {
            queries::messages::redact_message(
                conn,
                &self.collection,
                session_id,
                agent_id,
                message_id,
                &replacement,
            )
        })?;
        if redacted {
            info!(session_id, agent_id, message_id, "message redacted");
        }
        Ok(redacted)
    }

    /// One message for a conversation-history consumer (metrics stripped).
    pub fn read_message(
        &self,
        session_id: &str,
        agent_id: &str,
        message_id: u64,
    ) -> SessionDbResult<Option<Message>> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.read(|conn| {
            queries::messages::read_message(conn, &self.collection, session_id, agent_id, message_id)
        })
    }

    /// Messages ordered by id for a conversation-history consumer (metrics stripped).
    pub fn list_messages(
        &self,
        session_id: &str,
        agent_id: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> SessionDbResult<Vec<Message>> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.read(|conn| {
            queries::messages::list_messages(
                conn,
                &self.collection,
                session_id,
                agent_id,
                limit,
                offset,
            )
        })
    }

    pub fn last_message_id(&self, session_id: &str, agent_id: &str) -> SessionDbResult<Option<u64>> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.read(|conn| {
            queries::messages::last_message_id(conn, &self.collection, session_id, agent_id)
        })
    }

    pub fn message_metrics(
        &self,
        session_id: &str,
        agent_id: &str,
    ) -> SessionDbResult<Vec<(u64, Option<EventLoopMetrics>)>> {
        paths::validate_identifier("session_id", session_id)?;
        paths::validate_identifier("agent_id", agent_id)?;
        self.read(|conn| {
            queries::messages::message_metrics(conn, &self.collection, session_id, agent_id)
        })
    }

    // --- feedback ---

    /// Append feedback with a store-assigned `created_at`.
    pub fn add_feedback(
        &self,
        session_id: &str,
        rating: Option<Rating>,
        comment: Option<String>,
    ) -> SessionDbResult<Option<Feedback>> {
        paths::validate_identifier("session_id", session_id)?;
        self.write(|conn| {
            queries::feedback::add_feedback(
                conn,
                &self.collection,
                session_id,
                rating,
                comment.clone(),
            )
        })
    }

    pub fn get_feedbacks(&self, session_id: &str) -> SessionDbResult<Vec<Feedback>> {
        paths::validate_identifier("session_id", session_id)?;
        self.read(|conn| queries::feedback::get_feedbacks(conn, &self.collection, session_id))
    }

    // --- reporting ---

    pub fn list_session_summaries(
        &self,
        offset: u64,
        limit: u64,
        filter: &MetadataFilter,
    ) -> SessionDbResult<Vec<SessionSummary>> {
        self.read(|conn| {
            queries::reporting::list_session_summaries(conn, &self.collection, offset, limit, filter)
        })
    }

    pub fn count_sessions(&self, filter: &MetadataFilter) -> SessionDbResult<u64> {
        self.read(|conn| queries::reporting::count_sessions(conn, &self.collection, filter))
    }

    pub fn metadata_keys(&self, sample_limit: u64) -> SessionDbResult<Vec<String>> {
        self.read(|conn| queries::reporting::metadata_keys(conn, &self.collection, sample_limit))
    }

    pub fn metadata_field_values(
        &self,
        field: &str,
        sample_limit: u64,
    ) -> SessionDbResult<Vec<MetadataValue>> {
        paths::validate_identifier("metadata key", field)?;
        self.read(|conn| {
            queries::reporting::metadata_field_values(conn, &self.collection, field, sample_limit)
        })
    }

    /// Release resources. Only an owned client is closed; calling this
    /// again is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.owned {
            debug!(collection = %self.collection, "closing owned client");
            self.client.close();
        } else {
            debug!(collection = %self.collection, "leaving borrowed client open");
        }
    }

    fn read<T, F>(&self, f: F) -> SessionDbResult<T>
    where
        F: FnMut(&mut Connection) -> SessionDbResult<T>,
    {
        self.run(Access::Read, f)
    }

    fn write<T, F>(&self, f: F) -> SessionDbResult<T>
    where
        F: FnMut(&mut Connection) -> SessionDbResult<T>,
    {
        self.run(Access::Write, f)
    }

    fn run<T, F>(&self, access: Access, f: F) -> SessionDbResult<T>
    where
        F: FnMut(&mut Connection) -> SessionDbResult<T>,
    {
        if self.is_closed() {
            return Err(SessionDbError::ClientClosed);
        }
        self.prepare()?;
        self.client.with_connection(access, f)
    }

    /// Create the collection and its indexes on first use.
    ///
    /// Preparation is remembered by the client per collection and indexed field
    /// set, so repositories created per request skip it once any repository
    /// with the same fields has run it.
    /// Concurrent first calls may both run the DDL, which is idempotent.
    fn prepare(&self) -> SessionDbResult<()> {
        if self.prepared.load(Ordering::Acquire) {
            return Ok(());
        }
        if !self.client.is_prepared(&self.collection, &self.indexed_fields) {
            self.client.with_connection(Access::Write, |conn| {
                migrations::ensure_collection(conn, &self.collection)?;
                migrations::ensure_indexes(conn, &self.collection, &self.indexed_fields);
                Ok(())
            })?;
            self.client
                .mark_prepared(&self.collection, &self.indexed_fields);
        }
        self.prepared.store(true, Ordering::Release);
        Ok(())
    }
}

fn validate_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> SessionDbResult<()> {
    for key in keys {
        paths::validate_identifier("metadata key", key)?;
    }
    Ok(())
}
