use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::Player;

pub const SIZE: usize = 8;

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl Cell {
    /// Digit used for this cell in a state key.
    pub fn digit(self) -> char {
        match self {
            Cell::Empty => '0',
            Cell::Black => '1',
            Cell::White => '2',
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Black => '●',
            Cell::White => '○',
        }
    }
}

/// A board coordinate. Written as column letter then row number, e.g. `D3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    /// Returns `None` when either coordinate is off the board.
    pub fn new(row: usize, col: usize) -> Option<Move> {
        (row < SIZE && col < SIZE).then_some(Move { row, col })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.col as u8) as char, self.row + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid move notation '{0}' (expected A-H followed by 1-8)")]
pub struct ParseMoveError(pub String);

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoveError(s.to_string());
        let mut chars = s.chars();
        let (Some(letter), Some(digit), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(err());
        };
        let letter = letter.to_ascii_uppercase();
        if !('A'..='H').contains(&letter) || !('1'..='8').contains(&digit) {
            return Err(err());
        }
        let col = letter as usize - 'A' as usize;
        let row = digit as usize - '1' as usize;
        Ok(Move { row, col })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("coordinate is off the board")]
    OutOfBounds,
    #[error("cell is already occupied")]
    Occupied,
    #[error("move captures no disks")]
    NoCapture,
}

/// Disk counts per color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    pub black: u32,
    pub white: u32,
}

impl Scores {
    /// Score for `player` followed by the opponent's score.
    pub fn for_player(self, player: Player) -> (u32, u32) {
        match player {
            Player::Black => (self.black, self.white),
            Player::White => (self.white, self.black),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
    current_player: Player,
}

impl Board {
    /// Create a board in the standard opening position with black to move.
    pub fn new() -> Self {
        let mut board = Board {
            cells: [[Cell::Empty; SIZE]; SIZE],
            current_player: Player::Black,
        };
        board.initialize();
        board
    }

    /// Reset to the opening position: white on D4/E5, black on E4/D5.
    pub fn initialize(&mut self) {
        let mid = SIZE / 2;
        self.cells = [[Cell::Empty; SIZE]; SIZE];
        self.cells[mid - 1][mid - 1] = Cell::White;
        self.cells[mid - 1][mid] = Cell::Black;
        self.cells[mid][mid - 1] = Cell::Black;
        self.cells[mid][mid] = Cell::White;
        self.current_player = Player::Black;
    }

    /// Rebuild a board from a state key. `None` unless the key is 64 cells
    /// of `0`, `1` or `2`.
    pub fn from_state_key(key: &str, current_player: Player) -> Option<Board> {
        if key.len() != SIZE * SIZE {
            return None;
        }
        let mut cells = [[Cell::Empty; SIZE]; SIZE];
        for (i, b) in key.bytes().enumerate() {
            cells[i / SIZE][i % SIZE] = match b {
                b'0' => Cell::Empty,
                b'1' => Cell::Black,
                b'2' => Cell::White,
                _ => return None,
            };
        }
        Some(Board {
            cells,
            current_player,
        })
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn set_current_player(&mut self, player: Player) {
        self.current_player = player;
    }

    /// True iff `(row, col)` is empty and placing `player` there brackets
    /// at least one opposing disk in some direction.
    pub fn is_valid_move(&self, row: usize, col: usize, player: Player) -> bool {
        if row >= SIZE || col >= SIZE || self.cells[row][col] != Cell::Empty {
            return false;
        }
        DIRECTIONS
            .iter()
            .any(|&dir| self.capture_run(row, col, dir, player) > 0)
    }

    /// Number of opposing disks captured walking from `(row, col)` in `dir`.
    /// Zero unless the run of opponents is closed by one of `player`'s disks.
    fn capture_run(&self, row: usize, col: usize, dir: (isize, isize), player: Player) -> usize {
        let own = player.to_cell();
        let mut r = row as isize + dir.0;
        let mut c = col as isize + dir.1;
        let mut run = 0;

        while (0..SIZE as isize).contains(&r) && (0..SIZE as isize).contains(&c) {
            match self.cells[r as usize][c as usize] {
                Cell::Empty => return 0,
                cell if cell == own => return run,
                _ => run += 1,
            }
            r += dir.0;
            c += dir.1;
        }

        0
    }

    /// Place a disk for the player to move, flip every captured run and pass
    /// the turn. Returns the flipped coordinates; the board is untouched on
    /// error.
    pub fn make_move(&mut self, mv: Move) -> Result<Vec<Move>, MoveError> {
        if mv.row >= SIZE || mv.col >= SIZE {
            return Err(MoveError::OutOfBounds);
        }
        if self.cells[mv.row][mv.col] != Cell::Empty {
            return Err(MoveError::Occupied);
        }

        let player = self.current_player;
        let runs: Vec<((isize, isize), usize)> = DIRECTIONS
            .iter()
            .map(|&dir| (dir, self.capture_run(mv.row, mv.col, dir, player)))
            .filter(|&(_, run)| run > 0)
            .collect();
        if runs.is_empty() {
            debug!(%mv, "rejected move with no capture");
            return Err(MoveError::NoCapture);
        }

        let own = player.to_cell();
        self.cells[mv.row][mv.col] = own;
        let mut flipped = Vec::new();
        for ((dr, dc), run) in runs {
            for step in 1..=run as isize {
                let r = (mv.row as isize + dr * step) as usize;
                let c = (mv.col as isize + dc * step) as usize;
                self.cells[r][c] = own;
                flipped.push(Move { row: r, col: c });
            }
        }

        self.current_player = player.other();
        debug!(%mv, player = player.name(), flipped = flipped.len(), "move applied");
        Ok(flipped)
    }

    /// Legal moves for the player to move, in row-major scan order.
    pub fn available_moves(&self) -> Vec<Move> {
        let player = self.current_player;
        (0..SIZE)
            .flat_map(|row| (0..SIZE).map(move |col| Move { row, col }))
            .filter(|mv| self.is_valid_move(mv.row, mv.col, player))
            .collect()
    }

    /// Row-major concatenation of cell digits; the key into every Q-table.
    pub fn state_key(&self) -> String {
        self.cells.iter().flatten().map(|cell| cell.digit()).collect()
    }

    pub fn count(&self, cell: Cell) -> u32 {
        self.cells.iter().flatten().filter(|&&c| c == cell).count() as u32
    }

    pub fn scores(&self) -> Scores {
        Scores {
            black: self.count(Cell::Black),
            white: self.count(Cell::White),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  A B C D E F G H")?;
        for (i, row) in self.cells.iter().enumerate() {
            write!(f, "{}", i + 1)?;
            for cell in row {
                write!(f, " {}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
