//! Bounded conversation history.

use std::collections::VecDeque;

use medchat_core::types::Turn;

/// Default number of turns kept per session.
pub const MAX_HISTORY_LENGTH: usize = 5;

/// Chronological log of completed turns, capped at `capacity`.
///
/// Appending to a full buffer drops the single oldest turn first, so the
/// length never exceeds the cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(MAX_HISTORY_LENGTH)
    }
}

impl HistoryBuffer {
    /// Empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        if self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Snapshot of the turns, oldest first.
    pub fn as_sequence(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> Turn {
        Turn::new(format!("Q{}", n), format!("A{}", n))
    }

    #[test]
    fn test_length_is_min_of_appends_and_cap() {
        for n in 0..12 {
            let mut history = HistoryBuffer::default();
            for i in 1..=n {
                history.append(turn(i));
                assert!(history.len() <= MAX_HISTORY_LENGTH);
            }
            assert_eq!(history.len(), n.min(MAX_HISTORY_LENGTH));
        }
    }

    #[test]
    fn test_six_appends_evict_oldest() {
        let mut history = HistoryBuffer::default();
        for i in 1..=6 {
            history.append(turn(i));
        }
        let questions: Vec<String> = history.iter().map(|t| t.question.clone()).collect();
        assert_eq!(questions, vec!["Q2", "Q3", "Q4", "Q5", "Q6"]);
    }

    #[test]
    fn test_clear_then_append() {
        let mut history = HistoryBuffer::default();
        history.append(turn(1));
        history.append(turn(2));
        history.clear();
        assert!(history.is_empty());
        history.append(turn(3));
        assert_eq!(history.len(), 1);
        assert_eq!(history.as_sequence(), vec![turn(3)]);
    }

    #[test]
    fn test_zero_capacity_becomes_one() {
        let mut history = HistoryBuffer::new(0);
        assert_eq!(history.capacity(), 1);
        history.append(turn(1));
        history.append(turn(2));
        assert_eq!(history.as_sequence(), vec![turn(2)]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut history = HistoryBuffer::new(3);
        history.append(turn(1));
        let snapshot = history.as_sequence();
        history.append(turn(2));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(history.len(), 2);
    }
}
