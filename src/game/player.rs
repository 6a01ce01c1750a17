use super::board::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    White,
}

impl Player {
    /// Get the other player
    pub fn other(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Convert player to cell type
    pub fn to_cell(self) -> Cell {
        match self {
            Player::Black => Cell::Black,
            Player::White => Cell::White,
        }
    }

    /// Name used for the player's slot in persisted models and in logs.
    pub fn name(self) -> &'static str {
        match self {
            Player::Black => "player1",
            Player::White => "player2",
        }
    }

    /// Index into a `[T; 2]` pair ordered black, white.
    pub fn index(self) -> usize {
        match self {
            Player::Black => 0,
            Player::White => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_player() {
        assert_eq!(Player::Black.other(), Player::White);
        assert_eq!(Player::White.other(), Player::Black);
    }

    #[test]
    fn test_player_name() {
        assert_eq!(Player::Black.name(), "player1");
        assert_eq!(Player::White.name(), "player2");
    }

    #[test]
    fn test_to_cell() {
        assert_eq!(Player::Black.to_cell(), Cell::Black);
        assert_eq!(Player::White.to_cell(), Cell::White);
    }
}
