// src/state.rs

use std::sync::Arc;

use crate::ai::{CompletionClient, chat::ChatSessionStore};
use crate::config::Config;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub llm: Arc<dyn CompletionClient>,
    pub chat_sessions: ChatSessionStore,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CompletionClient> {
    fn from_ref(state: &AppState) -> Self {
        state.llm.clone()
    }
}

impl FromRef<AppState> for ChatSessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.chat_sessions.clone()
    }
}
