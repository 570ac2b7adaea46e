//! Process-wide conversation history.

use std::collections::VecDeque;

use tokio::sync::Mutex;

/// Ordered question/answer turns shared by every memory-enabled request.
///
/// With a window of `k`, only the most recent `k` turns are retained.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Mutex<VecDeque<(String, String)>>,
    window: Option<usize>,
}

impl ConversationMemory {
    /// Create an empty history, optionally bounded to the last `window` turns.
    pub fn new(window: Option<usize>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            window,
        }
    }

    /// Copy of the retained turns, oldest first.
    pub async fn history(&self) -> Vec<(String, String)> {
        self.turns.lock().await.iter().cloned().collect()
    }

    /// Append a turn, evicting the oldest ones beyond the window.
    pub async fn append(&self, question: impl Into<String>, answer: impl Into<String>) {
        let mut turns = self.turns.lock().await;
        turns.push_back((question.into(), answer.into()));
        if let Some(window) = self.window {
            while turns.len() > window {
                turns.pop_front();
            }
        }
    }

    /// Number of retained turns.
    pub async fn len(&self) -> usize {
        self.turns.lock().await.len()
    }

    /// Whether no turns are retained.
    pub async fn is_empty(&self) -> bool {
        self.turns.lock().await.is_empty()
    }

    /// Forget every turn.
    pub async fn clear(&self) {
        self.turns.lock().await.clear();
        tracing::info!("Conversation memory cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_turns_in_order() {
        let memory = ConversationMemory::new(None);
        memory.append("q1", "a1").await;
        memory.append("q2", "a2").await;

        assert_eq!(
            memory.history().await,
            vec![
                ("q1".to_string(), "a1".to_string()),
                ("q2".to_string(), "a2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn window_evicts_oldest_turns() {
        let memory = ConversationMemory::new(Some(2));
        for i in 0..5 {
            memory.append(format!("q{i}"), format!("a{i}")).await;
        }

        let history = memory.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].0, "q3");
        assert_eq!(history[1].0, "q4");
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let memory = ConversationMemory::new(None);
        memory.append("q", "a").await;
        memory.clear().await;
        assert!(memory.is_empty().await);
        assert_eq!(memory.len().await, 0);
    }
}
