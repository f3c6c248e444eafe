use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{Result, TuitionServerError};

#[derive(Debug, Clone)]
pub struct SessionData {
    pub session_id: String,
    pub admin_id: ObjectId,
    pub username: String,
    pub expires_at: Instant,
}

impl SessionData {
    pub fn new(admin_id: ObjectId, username: String, expiry_hours: u64) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let expires_at = Instant::now() + Duration::from_secs(expiry_hours * 3600);

        Self {
            session_id,
            admin_id,
            username,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory session store. Sessions are lost on restart, which is acceptable
/// for a single-admin deployment; the admin simply logs in again.
#[derive(Clone)]
pub struct SessionManager {
    // session_id -> SessionData
    sessions: Arc<DashMap<String, SessionData>>,
    expiry_hours: u64,
}

impl SessionManager {
    pub fn new(expiry_hours: u64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            expiry_hours,
        }
    }

    pub fn create_session(&self, admin_id: ObjectId, username: String) -> SessionData {
        let session_data = SessionData::new(admin_id, username, self.expiry_hours);

        self.sessions
            .insert(session_data.session_id.clone(), session_data.clone());

        log::info!(
            "Created session {} for admin {}",
            session_data.session_id,
            session_data.username
        );

        session_data
    }

    pub fn validate_session(&self, session_id: &str) -> Result<SessionData> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(TuitionServerError::InvalidSession)?;

        if session.is_expired() {
            drop(session);
            self.invalidate_session(session_id);
            return Err(TuitionServerError::InvalidSession);
        }

        Ok(session.clone())
    }

    pub fn invalidate_session(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            log::info!("Invalidated session: {}", session_id);
        }
    }

    pub fn cleanup_expired(&self) -> usize {
        let mut removed = 0;

        self.sessions.retain(|session_id, session| {
            if session.is_expired() {
                log::debug!("Cleaned up expired session: {}", session_id);
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session() {
        let manager = SessionManager::new(24);
        let admin_id = ObjectId::new();

        let session = manager.create_session(admin_id, "admin".to_string());
        assert_eq!(session.admin_id, admin_id);
        assert_eq!(session.username, "admin");
        assert_eq!(manager.active_session_count(), 1);
    }

    #[test]
    fn test_validate_session() {
        let manager = SessionManager::new(24);
        let admin_id = ObjectId::new();

        let session = manager.create_session(admin_id, "admin".to_string());
        let validated = manager.validate_session(&session.session_id).unwrap();

        assert_eq!(validated.admin_id, admin_id);
    }

    #[test]
    fn test_validate_unknown_session_fails() {
        let manager = SessionManager::new(24);
        assert!(manager.validate_session("no-such-session").is_err());
    }

    #[test]
    fn test_invalidate_session() {
        let manager = SessionManager::new(24);
        let admin_id = ObjectId::new();

        let session = manager.create_session(admin_id, "admin".to_string());
        assert_eq!(manager.active_session_count(), 1);

        manager.invalidate_session(&session.session_id);
        assert_eq!(manager.active_session_count(), 0);
        assert!(manager.validate_session(&session.session_id).is_err());
    }

    #[test]
    fn test_concurrent_sessions_allowed() {
        // The admin may be logged in from two browsers at once.
        let manager = SessionManager::new(24);
        let admin_id = ObjectId::new();

        let session1 = manager.create_session(admin_id, "admin".to_string());
        let session2 = manager.create_session(admin_id, "admin".to_string());

        assert_ne!(session1.session_id, session2.session_id);
        assert_eq!(manager.active_session_count(), 2);
        assert!(manager.validate_session(&session1.session_id).is_ok());
        assert!(manager.validate_session(&session2.session_id).is_ok());
    }

    #[test]
    fn test_session_expiry() {
        let manager = SessionManager::new(0); // Expire immediately
        let admin_id = ObjectId::new();

        let session = manager.create_session(admin_id, "admin".to_string());

        std::thread::sleep(Duration::from_millis(10));

        assert!(manager.validate_session(&session.session_id).is_err());
    }

    #[test]
    fn test_cleanup_expired() {
        let manager = SessionManager::new(0);
        let admin_id = ObjectId::new();

        manager.create_session(admin_id, "admin".to_string());
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(manager.cleanup_expired(), 1);
        assert_eq!(manager.active_session_count(), 0);
    }
}
