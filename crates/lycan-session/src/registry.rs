//! The session registry: every participant connected to one room.
//!
//! Sessions are keyed by [`SessionId`] with a secondary index by
//! [`UserId`]; the join order is kept separately because role dealing and
//! the participant list both depend on it.
//!
//! # Concurrency note
//!
//! Plain maps, no locking: the registry is owned by its room's actor task
//! and never shared.

use std::collections::HashMap;

use lycan_protocol::{Participant, RoleId, UserId};

use crate::{Session, SessionError, SessionId};

/// Tracks connected sessions, host designation, and per-user roles.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    by_user: HashMap<UserId, SessionId>,
    /// Session ids in join order.
    order: Vec<SessionId>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session. The first session of an empty room becomes host.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the id is taken.
    pub fn add(&mut self, mut session: Session) -> Result<(), SessionError> {
        if self.sessions.contains_key(&session.id) {
            return Err(SessionError::AlreadyRegistered(session.id));
        }

        session.is_host = self.sessions.is_empty();
        if session.is_host {
            tracing::info!(user_id = %session.user_id, "host designated");
        }

        self.by_user.insert(session.user_id, session.id);
        self.order.push(session.id);
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// Removes a session and returns it.
    ///
    /// If the host leaves, the earliest remaining joiner becomes host.
    /// Returns `None` for unknown ids: disconnect races are expected.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        self.order.retain(|sid| *sid != id);
        self.by_user.remove(&session.user_id);

        if session.is_host {
            if let Some(next) = self
                .order
                .first()
                .and_then(|sid| self.sessions.get_mut(sid))
            {
                next.is_host = true;
                tracing::info!(user_id = %next.user_id, "host passed on");
            }
        }

        Some(session)
    }

    /// Looks up a session by its connection key.
    pub fn find_by_connection(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Looks up a session by participant id.
    pub fn find_by_user_id(&self, user_id: UserId) -> Option<&Session> {
        self.by_user
            .get(&user_id)
            .and_then(|sid| self.sessions.get(sid))
    }

    /// Public projections in join order.
    pub fn list_participants(&self) -> Vec<Participant> {
        self.iter().map(Session::participant).collect()
    }

    /// Participant ids in join order.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.iter().map(|s| s.user_id).collect()
    }

    /// Ids of participants holding a dealt role, in join order.
    pub fn player_ids(&self) -> Vec<UserId> {
        self.iter()
            .filter(|s| s.role.is_some())
            .map(|s| s.user_id)
            .collect()
    }

    /// Sessions in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> + '_ {
        self.order.iter().filter_map(|sid| self.sessions.get(sid))
    }

    /// Number of connected sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Authorization predicate for host-only commands.
    pub fn is_host(&self, user_id: UserId) -> bool {
        self.find_by_user_id(user_id).is_some_and(|s| s.is_host)
    }

    /// The current host, if anyone is connected.
    pub fn host(&self) -> Option<&Session> {
        self.iter().find(|s| s.is_host)
    }

    /// Records a dealt role. Returns `false` if the user is not connected.
    pub fn set_role(&mut self, user_id: UserId, role: RoleId) -> bool {
        match self
            .by_user
            .get(&user_id)
            .and_then(|sid| self.sessions.get_mut(sid))
        {
            Some(session) => {
                session.role = Some(role);
                true
            }
            None => false,
        }
    }

    /// Forgets every dealt role.
    pub fn clear_roles(&mut self) {
        for session in self.sessions.values_mut() {
            session.role = None;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
