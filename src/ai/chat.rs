// src/ai/chat.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    ai::{ChatMessage, CompletionClient, CompletionRequest},
    config::CHAT_HISTORY_LIMIT,
    error::AppError,
};

const TUTOR_INSTRUCTION: &str = "You are a friendly AI tutor for an English academy. You:
1. Answer questions about English grammar, vocabulary and language concepts.
2. Explain exam questions, but never give direct answers during an active exam.
3. Share study tips and learning strategies.
4. Help students understand their mistakes and how to improve.
5. Guide students in using the platform.

During an active exam, explain the concept being tested instead of the answer.
Adapt explanations to the student's level, keep replies short and clear, and use examples when they help.";

/// DTO for one tutoring turn.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 100))]
    pub student_id: String,
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
    pub student_level: Option<String>,
    pub course_progress: Option<String>,
    pub exam_context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub is_helpful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest_topic: Option<String>,
}

/// One student's conversation. The first entry is always the tutor instruction.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self {
            messages: vec![ChatMessage::system(TUTOR_INSTRUCTION)],
        }
    }
}

impl ChatHistory {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Appends messages, then evicts the oldest entries after the instruction
    /// until at most `CHAT_HISTORY_LIMIT` remain.
    pub fn extend(&mut self, new_messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(new_messages);

        if self.messages.len() > CHAT_HISTORY_LIMIT {
            let excess = self.messages.len() - CHAT_HISTORY_LIMIT;
            self.messages.drain(1..=excess);
        }
    }
}

/// Context entries added ahead of the student's message for this turn.
fn turn_messages(req: &ChatRequest) -> Vec<ChatMessage> {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    let mut messages = Vec::new();
    if let Some(level) = non_empty(&req.student_level) {
        messages.push(ChatMessage::system(format!("Student level: {} (CEFR)", level)));
    }
    if let Some(progress) = non_empty(&req.course_progress) {
        messages.push(ChatMessage::system(format!(
            "Current course progress: {}",
            progress
        )));
    }
    if let Some(exam) = non_empty(&req.exam_context) {
        messages.push(ChatMessage::system(format!(
            "Exam context: {} (ACTIVE EXAM - NO DIRECT ANSWERS)",
            exam
        )));
    }
    messages.push(ChatMessage::user(req.message.clone()));
    messages
}

/// Per-student tutoring conversations.
///
/// The outer map lock is only held to look up or insert a session. Each
/// session has its own async lock, held for a whole turn, so turns for one
/// student run one at a time while different students proceed in parallel.
#[derive(Clone, Default)]
pub struct ChatSessionStore {
    sessions: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<ChatHistory>>>>>,
}

impl ChatSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self, student_id: &str) -> Arc<tokio::sync::Mutex<ChatHistory>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.entry(student_id.to_string()).or_default().clone()
    }

    /// Drops a student's conversation. Returns whether one existed.
    pub fn clear(&self, student_id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(student_id).is_some()
    }

    /// Snapshot of a student's conversation, if any.
    pub async fn history(&self, student_id: &str) -> Option<Vec<ChatMessage>> {
        let session = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(student_id).cloned()
        }?;
        let history = session.lock().await;
        Some(history.messages().to_vec())
    }

    /// Runs one tutoring turn. The history only changes when the completion succeeds.
    pub async fn chat(
        &self,
        client: &dyn CompletionClient,
        req: &ChatRequest,
    ) -> Result<ChatResponse, AppError> {
        let session = self.session(&req.student_id);
        let mut history = session.lock().await;

        let mut pending = turn_messages(req);
        let mut messages = history.messages().to_vec();
        messages.extend(pending.iter().cloned());

        let reply = client
            .complete(CompletionRequest {
                messages,
                temperature: 0.8,
                json_response: false,
            })
            .await?;

        pending.push(ChatMessage::assistant(reply.clone()));
        history.extend(pending);

        Ok(ChatResponse {
            reply,
            is_helpful: true,
            suggest_topic: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with the number of messages it was sent.
    struct Counting;

    #[async_trait]
    impl CompletionClient for Counting {
        async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
            Ok(format!("seen {}", request.messages.len()))
        }
    }

    struct Failing(AtomicUsize);

    #[async_trait]
    impl CompletionClient for Failing {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(AppError::InternalServerError("down".to_string()))
        }
    }

    fn request(student_id: &str, message: &str) -> ChatRequest {
        ChatRequest {
            student_id: student_id.to_string(),
            message: message.to_string(),
            student_level: None,
            course_progress: None,
            exam_context: None,
        }
    }

    #[test]
    fn test_history_eviction_keeps_instruction() {
        let mut history = ChatHistory::default();
        for i in 0..30 {
            history.extend([ChatMessage::user(format!("m{}", i))]);
        }

        let messages = history.messages();
        assert_eq!(messages.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, TUTOR_INSTRUCTION);
        assert_eq!(messages[1].content, "m11");
        assert_eq!(messages[CHAT_HISTORY_LIMIT - 1].content, "m29");
    }

    #[test]
    fn test_turn_messages_adds_context_before_message() {
        let mut req = request("7", "What is a gerund?");
        req.student_level = Some("A2".to_string());
        req.exam_context = Some("Unit 3 quiz".to_string());
        req.course_progress = Some("   ".to_string());

        let messages = turn_messages(&req);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "Student level: A2 (CEFR)");
        assert!(messages[1].content.contains("ACTIVE EXAM"));
        assert_eq!(messages[2], ChatMessage::user("What is a gerund?"));
    }

    #[tokio::test]
    async fn test_chat_records_turns_per_student() {
        let store = ChatSessionStore::new();

        let first = store.chat(&Counting, &request("1", "hello")).await.unwrap();
        assert_eq!(first.reply, "seen 2");
        let second = store.chat(&Counting, &request("1", "again")).await.unwrap();
        assert_eq!(second.reply, "seen 4");

        let other = store.chat(&Counting, &request("2", "hi")).await.unwrap();
        assert_eq!(other.reply, "seen 2");

        let history = store.history("1").await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[4], ChatMessage::assistant("seen 4"));
    }

    #[tokio::test]
    async fn test_chat_history_is_capped() {
        let store = ChatSessionStore::new();
        for i in 0..25 {
            store.chat(&Counting, &request("9", &format!("q{}", i))).await.unwrap();
        }

        let history = store.history("9").await.unwrap();
        assert_eq!(history.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(history[0].content, TUTOR_INSTRUCTION);
        assert_eq!(history[CHAT_HISTORY_LIMIT - 2], ChatMessage::user("q24"));
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        let store = ChatSessionStore::new();
        store.chat(&Counting, &request("3", "hello")).await.unwrap();

        let failing = Failing(AtomicUsize::new(0));
        assert!(store.chat(&failing, &request("3", "lost")).await.is_err());
        assert_eq!(failing.0.load(Ordering::SeqCst), 1);

        assert_eq!(store.history("3").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_clear_removes_session() {
        let store = ChatSessionStore::new();
        store.chat(&Counting, &request("4", "hello")).await.unwrap();

        assert!(store.clear("4"));
        assert!(!store.clear("4"));
        assert!(store.history("4").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_turns_for_one_student_are_serialized() {
        let store = ChatSessionStore::new();
        let client = Arc::new(Counting);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                store.chat(client.as_ref(), &request("5", &format!("c{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Each turn saw every earlier turn in full.
        let history = store.history("5").await.unwrap();
        assert_eq!(history.len(), 17);
        let replies: Vec<_> = history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .collect();
        let expected: Vec<_> = (1..=8).map(|n| format!("seen {}", n * 2)).collect();
        assert_eq!(replies, expected);
    }
}
