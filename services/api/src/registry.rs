use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use viva_core::session::InterviewSession;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown session: {0}")]
    NotFound(String),
}

/// A live session shared between the registry and its owning connection
/// handler. The mutex serializes access to the session's fields, but under
/// normal operation only the owning handler ever locks it: the registry
/// guarantees identity lookup, not field-level arbitration.
pub type SharedSession = Arc<Mutex<InterviewSession>>;

/// Concurrency-safe mapping from session id to its state machine. The sole
/// owner of session lifetime: connection handlers create on connect and
/// remove on END or disconnect. Sessions live only in memory; this process
/// is deliberately single-instance (persistence is the only durable copy).
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
    judge_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(judge_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            judge_timeout,
        }
    }

    /// Creates a fresh session under a new v4 id and registers it.
    pub async fn create(&self) -> (String, SharedSession) {
        let session_id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(InterviewSession::new(
            session_id.clone(),
            self.judge_timeout,
        )));
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session.clone());
        (session_id, session)
    }

    /// Looks up a live session. Never creates one implicitly.
    pub async fn get(&self, session_id: &str) -> Result<SharedSession, RegistryError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(session_id.to_string()))
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viva_core::session::InterviewState;

    #[tokio::test]
    async fn create_get_remove_lifecycle() {
        let registry = SessionRegistry::new(Duration::from_secs(5));
        let (id, _session) = registry.create().await;

        let found = registry.get(&id).await.unwrap();
        assert_eq!(found.lock().await.state, InterviewState::Start);

        registry.remove(&id).await;
        assert!(matches!(
            registry.get(&id).await,
            Err(RegistryError::NotFound(_))
        ));
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_not_created() {
        let registry = SessionRegistry::new(Duration::from_secs(5));
        assert!(registry.get("nope").await.is_err());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn concurrent_sessions_stay_isolated() {
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(5)));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (id, session) = registry.create().await;
                // Mutate our own session only.
                session.lock().await.current_question_index = 3;
                id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        assert_eq!(registry.len().await, 16);

        for id in &ids {
            let session = registry.get(id).await.unwrap();
            let session = session.lock().await;
            assert_eq!(session.current_question_index, 3);
            assert!(session.transcript.is_empty());
        }
    }
}
