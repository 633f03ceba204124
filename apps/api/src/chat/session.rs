use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// A conversation about one resume. History only grows, one question/answer pair at a time.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub history: Vec<ChatTurn>,
}

/// In-memory chat sessions. Lost on restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ChatSession>>>,
}

impl SessionStore {
    pub async fn create(&self, filename: &str) -> ChatSession {
        let session = ChatSession {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            created_at: Utc::now(),
            history: Vec::new(),
        };
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<ChatSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Appends a user turn and the assistant's reply together.
    /// Returns the updated session, or `None` if it no longer exists.
    pub async fn record_exchange(
        &self,
        id: Uuid,
        question: &str,
        answer: &str,
    ) -> Option<ChatSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        let now = Utc::now();
        session.history.push(ChatTurn {
            role: Role::User,
            content: question.to_string(),
            at: now,
        });
        session.history.push(ChatTurn {
            role: Role::Assistant,
            content: answer.to_string(),
            at: now,
        });
        Some(session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}
