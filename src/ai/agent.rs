use std::collections::HashMap;

use tracing::debug;

use crate::checkpoint::TableRecord;
use crate::error::PersistenceError;
use crate::game::{Board, Move};

/// Learning hyperparameters for a tabular agent.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub alpha: f64,
    pub gamma: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            alpha: 0.1,
            gamma: 0.95,
        }
    }
}

/// State key -> move -> value. Entries appear lazily on first update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<String, HashMap<Move, f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: &str, mv: Move) -> Option<f64> {
        self.values.get(state).and_then(|moves| moves.get(&mv)).copied()
    }

    pub fn set(&mut self, state: &str, mv: Move, value: f64) {
        self.values
            .entry(state.to_string())
            .or_default()
            .insert(mv, value);
    }

    /// Number of distinct states with at least one entry.
    pub fn state_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_record(&self) -> TableRecord {
        let q_values = self
            .values
            .iter()
            .map(|(state, moves)| {
                let moves = moves
                    .iter()
                    .map(|(mv, value)| (mv.to_string(), *value))
                    .collect();
                (state.clone(), moves)
            })
            .collect();
        TableRecord { q_values }
    }

    /// Rebuild a table from its persisted form, rejecting malformed keys and
    /// non-finite values.
    pub fn from_record(record: &TableRecord) -> Result<Self, PersistenceError> {
        let mut table = QTable::new();
        for (state, moves) in &record.q_values {
            if !is_state_key(state) {
                return Err(PersistenceError::SchemaMismatch(format!(
                    "invalid state key '{state}'"
                )));
            }
            for (notation, &value) in moves {
                let mv: Move = notation
                    .parse()
                    .map_err(|e| PersistenceError::SchemaMismatch(format!("{e}")))?;
                if !value.is_finite() {
                    return Err(PersistenceError::SchemaMismatch(format!(
                        "non-finite value for {state}/{notation}"
                    )));
                }
                table.set(state, mv, value);
            }
        }
        Ok(table)
    }
}

fn is_state_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| matches!(b, b'0' | b'1' | b'2'))
}

/// The agent's most recent decision in the current episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentTrace {
    pub last_state: Option<String>,
    pub last_action: Option<Move>,
    pub current_state: Option<String>,
}

/// One side's learner: a Q-table plus the trace used for the terminal update.
#[derive(Debug, Clone)]
pub struct QAgent {
    name: String,
    config: AgentConfig,
    table: QTable,
    trace: AgentTrace,
}

impl QAgent {
    pub fn new(name: impl Into<String>, config: AgentConfig) -> Self {
        QAgent {
            name: name.into(),
            config,
            table: QTable::new(),
            trace: AgentTrace::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> AgentConfig {
        self.config
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn replace_table(&mut self, table: QTable) {
        self.table = table;
    }

    pub fn trace(&self) -> &AgentTrace {
        &self.trace
    }

    /// Stored value, 0 when the state or move has never been updated.
    pub fn q_value(&self, state: &str, mv: Move) -> f64 {
        self.table.get(state, mv).unwrap_or(0.0)
    }

    /// Best value for `state` among the moves legal on `board` for the
    /// board's current turn. 0 when there are no legal moves.
    pub fn max_q_value(&self, state: &str, board: &Board) -> f64 {
        board
            .available_moves()
            .into_iter()
            .map(|mv| self.q_value(state, mv))
            .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
            .unwrap_or(0.0)
    }

    /// One-step Bellman update of `Q(last_state, last_action)`. Returns the
    /// new value.
    pub fn update_q_value(
        &mut self,
        last_state: &str,
        last_action: Move,
        reward: f64,
        current_state: &str,
        board: &Board,
    ) -> f64 {
        let current_q = self.q_value(last_state, last_action);
        let max_q = self.max_q_value(current_state, board);
        let AgentConfig { alpha, gamma } = self.config;
        let updated = current_q + alpha * (reward + gamma * max_q - current_q);
        self.table.set(last_state, last_action, updated);
        debug!(
            agent = %self.name,
            action = %last_action,
            reward,
            old = current_q,
            new = updated,
            "q-value updated"
        );
        updated
    }

    pub fn record_action(&mut self, state: String, mv: Move) {
        self.trace.last_state = Some(state);
        self.trace.last_action = Some(mv);
    }

    pub fn record_result(&mut self, state: String) {
        self.trace.current_state = Some(state);
    }

    pub fn clear_trace(&mut self) {
        self.trace = AgentTrace::default();
    }

    /// Apply the terminal reward to the last recorded decision. Returns the
    /// absolute change in value, or `None` if the agent has no complete trace.
    pub fn apply_terminal_reward(&mut self, reward: f64, board: &Board) -> Option<f64> {
        let AgentTrace {
            last_state: Some(last_state),
            last_action: Some(last_action),
            current_state: Some(current_state),
        } = self.trace.clone()
        else {
            debug!(agent = %self.name, "no move this episode, skipping update");
            return None;
        };
        let before = self.q_value(&last_state, last_action);
        let after = self.update_q_value(&last_state, last_action, reward, &current_state, board);
        Some((after - before).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Player;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn agent() -> QAgent {
        QAgent::new("player1", AgentConfig { alpha: 0.5, gamma: 0.9 })
    }

    #[test]
    fn test_q_value_defaults_to_zero() {
        let agent = agent();
        assert_eq!(agent.q_value("anything", mv("D3")), 0.0);
        assert!(agent.table().is_empty());
    }

    #[test]
    fn test_max_q_value_bounded_to_legal_moves() {
        let mut agent = agent();
        let board = Board::new();
        let state = board.state_key();
        // A6 is not legal from the opening; its large value must be ignored.
        agent.table.set(&state, mv("A6"), 10.0);
        agent.table.set(&state, mv("C4"), -0.5);
        agent.table.set(&state, mv("F5"), 0.25);
        assert_eq!(agent.max_q_value(&state, &board), 0.25);
    }

    #[test]
    fn test_max_q_value_missing_moves_count_as_zero() {
        let mut agent = agent();
        let board = Board::new();
        let state = board.state_key();
        for m in ["D3", "C4", "F5"] {
            agent.table.set(&state, mv(m), -1.0);
        }
        // E6 is absent and therefore worth 0
        assert_eq!(agent.max_q_value(&state, &board), 0.0);
    }

    #[test]
    fn test_max_q_value_without_moves_is_zero() {
        let agent = agent();
        // Always play the first legal move until neither side can move
        let mut board = Board::new();
        while let Some(&m) = board.available_moves().first() {
            board.make_move(m).unwrap();
            if board.available_moves().is_empty() {
                let other = board.current_player().other();
                board.set_current_player(other);
            }
        }
        assert!(board.available_moves().is_empty());
        assert_eq!(agent.max_q_value(&board.state_key(), &board), 0.0);
    }

    #[test]
    fn test_update_q_value_bellman() {
        let mut agent = agent();
        let board = Board::new();
        let next = board.state_key();
        agent.table.set(&next, mv("D3"), 0.4);
        agent.table.set("s0", mv("A1"), 0.2);

        // 0.2 + 0.5 * (1.0 + 0.9 * 0.4 - 0.2) = 0.78
        let updated = agent.update_q_value("s0", mv("A1"), 1.0, &next, &board);
        assert!((updated - 0.78).abs() < 1e-12);
        assert!((agent.q_value("s0", mv("A1")) - 0.78).abs() < 1e-12);
    }

    #[test]
    fn test_apply_terminal_reward_without_trace_is_noop() {
        let mut agent = agent();
        let board = Board::new();
        assert_eq!(agent.apply_terminal_reward(1.0, &board), None);
        assert!(agent.table().is_empty());
    }

    #[test]
    fn test_apply_terminal_reward_uses_trace() {
        let mut agent = agent();
        let mut board = Board::new();
        let before = board.state_key();
        board.make_move(mv("D3")).unwrap();
        agent.record_action(before.clone(), mv("D3"));
        agent.record_result(board.state_key());

        let delta = agent.apply_terminal_reward(-1.0, &board).unwrap();
        // max over the white replies is 0, so Q = 0 + 0.5 * (-1 - 0)
        assert!((delta - 0.5).abs() < 1e-12);
        assert!((agent.q_value(&before, mv("D3")) + 0.5).abs() < 1e-12);

        agent.clear_trace();
        assert_eq!(agent.trace(), &AgentTrace::default());
    }

    #[test]
    fn test_table_record_roundtrip() {
        let mut table = QTable::new();
        let state = Board::new().state_key();
        table.set(&state, mv("D3"), 0.125);
        table.set(&state, mv("E6"), -0.75);

        let record = table.to_record();
        assert_eq!(record.q_values[&state]["D3"], 0.125);
        let restored = QTable::from_record(&record).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_from_record_rejects_bad_keys() {
        let mut record = TableRecord::default();
        record
            .q_values
            .entry("not-a-state".to_string())
            .or_default()
            .insert("D3".to_string(), 1.0);
        assert!(matches!(
            QTable::from_record(&record),
            Err(PersistenceError::SchemaMismatch(_))
        ));

        let mut record = TableRecord::default();
        record
            .q_values
            .entry(Board::new().state_key())
            .or_default()
            .insert("Z9".to_string(), 1.0);
        assert!(QTable::from_record(&record).is_err());
    }

    #[test]
    fn test_player_slot_names() {
        let agent = QAgent::new(Player::White.name(), AgentConfig::default());
        assert_eq!(agent.name(), "player2");
        assert_eq!(agent.config(), AgentConfig::default());
    }
}
