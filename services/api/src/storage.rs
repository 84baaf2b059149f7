use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use viva_core::feedback::FeedbackReport;
use viva_core::session::{InterviewSession, InterviewState, QuestionTranscript};

/// Durable record of one session, written to `DATA_DIR/session_<id>.json`.
/// Overwritten in place as the session progresses; after END it is the
/// immutable answer to the read-side queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub questions_and_answers: Vec<QuestionTranscript>,
    pub feedback: Option<FeedbackReport>,
    pub terminal_state: InterviewState,
}

impl SessionRecord {
    pub fn from_session(session: &InterviewSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            created_at: session.created_at,
            ended_at: session.ended_at,
            questions_and_answers: session.transcript.clone(),
            feedback: session.feedback.clone(),
            terminal_state: session.state,
        }
    }
}

/// JSON-file persistence, one file per session id. Distinct ids write
/// distinct files, so concurrent handlers never interfere; a given id is
/// only ever written by its owning connection handler.
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.data_dir.join(format!("session_{session_id}.json"))
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| {
                format!("Failed to create data directory: {}", self.data_dir.display())
            })?;
        let path = self.session_path(&record.session_id);
        let json = serde_json::to_vec_pretty(record).context("Failed to serialize session record")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write session record: {}", path.display()))?;
        Ok(())
    }

    pub async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let path = self.session_path(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session record: {}", path.display()));
            }
        };
        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt session record: {}", path.display()))?;
        Ok(Some(record))
    }

    /// Ids of every stored session, in no particular order.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read data directory: {}", self.data_dir.display())
                });
            }
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = parse_session_file_name(name) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn parse_session_file_name(name: &str) -> Option<&str> {
    name.strip_prefix("session_")?.strip_suffix(".json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn finished_session() -> InterviewSession {
        let mut session = InterviewSession::new("abc123".to_string(), Duration::from_secs(5));
        session.state = InterviewState::End;
        session.ended_at = Some(Utc::now());
        session.feedback = Some(FeedbackReport::fallback());
        session
    }

    #[tokio::test]
    async fn save_then_load_round_trips_the_record() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path());

        let record = SessionRecord::from_session(&finished_session());
        storage.save(&record).await?;

        let loaded = storage.load("abc123").await?.expect("record should exist");
        assert_eq!(loaded.session_id, "abc123");
        assert_eq!(loaded.terminal_state, InterviewState::End);
        assert!(loaded.feedback.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn load_of_unknown_id_is_none() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path());
        assert!(storage.load("missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn list_only_returns_session_files() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path());

        let record = SessionRecord::from_session(&finished_session());
        storage.save(&record).await?;
        tokio::fs::write(dir.path().join("notes.txt"), b"ignored").await?;

        let ids = storage.list().await?;
        assert_eq!(ids, vec!["abc123".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn overwrite_keeps_one_file_per_session() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path());

        let mut session = InterviewSession::new("abc123".to_string(), Duration::from_secs(5));
        storage.save(&SessionRecord::from_session(&session)).await?;

        session.state = InterviewState::End;
        session.feedback = Some(FeedbackReport::fallback());
        storage.save(&SessionRecord::from_session(&session)).await?;

        assert_eq!(storage.list().await?.len(), 1);
        let loaded = storage.load("abc123").await?.unwrap();
        assert_eq!(loaded.terminal_state, InterviewState::End);
        Ok(())
    }
}
