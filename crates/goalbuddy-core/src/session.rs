//! In-process session cache.

use crate::state::UserState;
use crate::traits::{Session, StateStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// `StateStore` backed by a process-local map. Lost on restart.
#[derive(Default)]
pub struct MemoryStateStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known participants.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, identity: i64) -> Session {
        self.sessions
            .lock()
            .await
            .get(&identity)
            .copied()
            .unwrap_or_default()
    }

    async fn set_state(&self, identity: i64, state: UserState) {
        self.sessions.lock().await.entry(identity).or_default().state = state;
    }

    async fn set_row(&self, identity: i64, row: usize) {
        self.sessions.lock().await.entry(identity).or_default().row = Some(row);
    }

    async fn reset(&self, identity: i64, state: UserState) {
        self.sessions
            .lock()
            .await
            .insert(identity, Session { state, row: None });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_identity_is_idle() {
        let store = MemoryStateStore::new();
        assert_eq!(store.get(1).await, Session::default());
        assert_eq!(store.get(1).await.state, UserState::Idle);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_state_keeps_row() {
        let store = MemoryStateStore::new();
        store.set_row(5, 12).await;
        store.set_state(5, UserState::GoalSet).await;
        let session = store.get(5).await;
        assert_eq!(session.state, UserState::GoalSet);
        assert_eq!(session.row, Some(12));
    }

    #[tokio::test]
    async fn test_reset_clears_row() {
        let store = MemoryStateStore::new();
        store.set_row(5, 12).await;
        store.set_state(5, UserState::Completed).await;
        store.reset(5, UserState::AwaitingGoal).await;
        assert_eq!(
            store.get(5).await,
            Session {
                state: UserState::AwaitingGoal,
                row: None
            }
        );
        assert_eq!(store.len().await, 1);
    }
}
