//! Chat with a single resume: question in, grounded answer out, history kept per session.

pub mod handlers;
pub mod prompts;
pub mod session;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::chat::prompts::{build_chat_prompt, chat_system_prompt};
use crate::chat::session::{ChatSession, SessionStore};
use crate::errors::AppError;
use crate::index::ResumeIndex;
use crate::llm_client::TextGenerator;
use crate::retrieval::retrieve_by_filename;

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub session: ChatSession,
}

pub async fn open_session(
    index: &RwLock<ResumeIndex>,
    sessions: &SessionStore,
    filename: &str,
) -> Result<ChatSession, AppError> {
    retrieve_by_filename(&*index.read().await, filename)?;
    let session = sessions.create(filename).await;
    info!("Opened chat session {} on {filename}", session.id);
    Ok(session)
}

/// Answers `question` about the session's resume.
///
/// History is only touched after the model has answered, so a failed call leaves it as it was.
pub async fn ask(
    index: &RwLock<ResumeIndex>,
    sessions: &SessionStore,
    generator: &dyn TextGenerator,
    session_id: Uuid,
    question: &str,
) -> Result<ChatReply, AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let session = history(sessions, session_id).await?;
    // Copy the text out so the index lock is not held across the model call.
    let resume_text = retrieve_by_filename(&*index.read().await, &session.filename)?
        .text
        .clone();

    let prompt = build_chat_prompt(&resume_text, question);
    let answer = generator
        .generate(&prompt, &chat_system_prompt())
        .await?
        .trim()
        .to_string();

    let session = sessions
        .record_exchange(session_id, question, &answer)
        .await
        .ok_or_else(|| session_not_found(session_id))?;
    Ok(ChatReply { answer, session })
}

pub async fn history(sessions: &SessionStore, session_id: Uuid) -> Result<ChatSession, AppError> {
    sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))
}

pub async fn reset(sessions: &SessionStore, session_id: Uuid) -> Result<(), AppError> {
    if sessions.remove(session_id).await {
        info!("Chat session {session_id} reset");
        Ok(())
    } else {
        Err(session_not_found(session_id))
    }
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Chat session {id} not found"))
}
