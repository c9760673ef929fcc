//! Score Four engine (4x4x4 gravity tic-tac-toe) with alpha-beta pruning.
//! The engine is fully stateless: callers feed a move history string
//! (e.g. `a1b2c3`, White moving first) and request a search depth (1-10).
//! The AI plays for the side whose turn is next after that history.
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cells per edge of the cube.
pub const SIZE: usize = 4;
const COLUMNS: usize = SIZE * SIZE;
const MAX_CELLS: usize = COLUMNS * SIZE;

/// Sentinel score outside the evaluator's range. Half of `i32::MAX` so
/// window arithmetic can never overflow.
const INF: i32 = i32::MAX / 2;

/// Precomputed winning lines of four as bitmasks, 76 in all.
static WIN_MASKS: Lazy<Vec<u64>> = Lazy::new(generate_win_masks);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    White,
    Black,
}

impl Player {
    fn idx(self) -> usize {
        match self {
            Player::White => 0,
            Player::Black => 1,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::White => Player::Black,
            Player::Black => Player::White,
        }
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid move string at position {position}: {reason}")]
    ParseMove { position: usize, reason: String },
    #[error("column ({x}, {y}) is full")]
    ColumnFull { x: usize, y: usize },
    #[error("column ({x}, {y}) is out of bounds")]
    ColumnOutOfBounds { x: usize, y: usize },
    #[error("no legal moves remain")]
    NoMoves,
    #[error("depth {0} is out of range (1-10)")]
    DepthOutOfRange(u8),
    #[error("the game is already over")]
    GameOver,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub position: String,
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub column: String,
}

/// A column of the cube, named `a1`..`d4` in text form; gravity picks the
/// height a stone dropped into it lands at.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub x: usize,
    pub y: usize,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = (b'a' + self.x as u8) as char;
        write!(f, "{}{}", letter, self.y + 1)
    }
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(letter), Some(digit), None) => parse_token(letter, digit, 0),
            _ => Err(GameError::ParseMove {
                position: 0,
                reason: format!("expected a two-character move, got {s:?}"),
            }),
        }
    }
}

/// A position of the game, one `u64` plane per player. Occupancy is the
/// union of the planes and the side to move is the parity of the stone
/// count, so neither is stored. `play` returns a fresh state; positions
/// already reached are never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameState {
    players: [u64; 2],
    last_move: Option<Move>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: [0, 0],
            last_move: None,
        }
    }

    /// Replay a move list from the empty board. Moves past a completed
    /// win are rejected rather than stacked onto a finished game.
    pub fn from_history(moves: &[Move]) -> Result<Self, GameError> {
        let mut state = Self::new();
        for &mv in moves {
            if state.is_terminal() {
                return Err(GameError::GameOver);
            }
            state = state.play(mv)?;
        }
        Ok(state)
    }

    pub fn bits(&self, player: Player) -> u64 {
        self.players[player.idx()]
    }

    pub fn occupied(&self) -> u64 {
        self.players[0] | self.players[1]
    }

    /// Stones placed so far.
    pub fn count(&self) -> u32 {
        self.occupied().count_ones()
    }

    /// Side to move: White on even stone counts, Black on odd.
    pub fn turn(&self) -> Player {
        if self.count() % 2 == 0 {
            Player::White
        } else {
            Player::Black
        }
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    /// Drop the current mover's stone into column (x, y) and return the
    /// resulting position. The receiver is left untouched.
    pub fn play(&self, mv: Move) -> Result<GameState, GameError> {
        if mv.x >= SIZE || mv.y >= SIZE {
            return Err(GameError::ColumnOutOfBounds { x: mv.x, y: mv.y });
        }
        // Gravity keeps a column's stones contiguous from the bottom, so
        // the landing height is the number of stones already in it.
        let column = (self.occupied() >> ((mv.x * SIZE + mv.y) * SIZE)) & 0xF;
        let height = column.count_ones() as usize;
        if height >= SIZE {
            return Err(GameError::ColumnFull { x: mv.x, y: mv.y });
        }
        let mut next = *self;
        next.players[self.turn().idx()] |= cell_bit(mv.x, mv.y, height);
        next.last_move = Some(mv);
        Ok(next)
    }

    /// Columns whose top cell is still free, row-major over x then y.
    /// The order is part of the engine's observable behavior: the search
    /// breaks ties in favor of the first enumerated move.
    pub fn moves(&self) -> Vec<Move> {
        let occupied = self.occupied();
        let mut moves = Vec::with_capacity(COLUMNS);
        for x in 0..SIZE {
            for y in 0..SIZE {
                if occupied & cell_bit(x, y, SIZE - 1) == 0 {
                    moves.push(Move { x, y });
                }
            }
        }
        moves
    }

    /// Whether the player who made the previous move completed a line.
    /// Only that player's plane is inspected; a line owned by the side to
    /// move is not a win here, and the game relies on that polarity.
    pub fn is_terminal(&self) -> bool {
        let plane = self.bits(self.turn().opponent());
        WIN_MASKS.iter().any(|&mask| plane & mask == mask)
    }

    pub fn winner(&self) -> Option<Player> {
        if self.is_terminal() {
            Some(self.turn().opponent())
        } else {
            None
        }
    }

    pub fn is_full(&self) -> bool {
        self.count() as usize >= MAX_CELLS
    }

    pub fn stone_at(&self, x: usize, y: usize, z: usize) -> Option<Player> {
        if x >= SIZE || y >= SIZE || z >= SIZE {
            return None;
        }
        let bit = cell_bit(x, y, z);
        if self.players[0] & bit != 0 {
            Some(Player::White)
        } else if self.players[1] & bit != 0 {
            Some(Player::Black)
        } else {
            None
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Score a finished position from White's side: +1 when White completed
/// a line, -1 when Black did, 0 for anything else including a full
/// board. Wins are not graded by distance; a mate at the horizon scores
/// the same as a mate in one.
pub fn evaluate(state: &GameState) -> i32 {
    match state.winner() {
        Some(Player::White) => 1,
        Some(Player::Black) => -1,
        None => 0,
    }
}

/// Plain alpha-beta to a fixed depth, no transposition table and no move
/// ordering beyond the row-major column scan of [`GameState::moves`].
/// The evaluation function is part of the configuration so callers can
/// substitute their own leaf scoring.
pub struct AlphaBeta {
    depth: u8,
    evaluate: fn(&GameState) -> i32,
}

impl AlphaBeta {
    pub fn new(depth: u8, evaluate: fn(&GameState) -> i32) -> Self {
        Self { depth, evaluate }
    }

    /// Choose a move for the side to move, or `None` when the game is
    /// already decided or no column is open.
    ///
    /// A move that finishes the game on the spot is played without any
    /// search; the first such column in scan order wins the race. All
    /// other root moves are searched with a fresh full-width window each,
    /// and ties keep the earliest move, so the choice is deterministic.
    pub fn find_best_move(&self, state: &GameState) -> Option<Move> {
        if state.is_terminal() {
            return None;
        }
        let moves = state.moves();
        for &mv in &moves {
            let child = state.play(mv).expect("legal move must succeed");
            if child.is_terminal() {
                return Some(mv);
            }
        }

        let maximizing = state.turn() == Player::White;
        let mut best: Option<(Move, i32)> = None;
        for &mv in &moves {
            let child = state.play(mv).expect("legal move must succeed");
            let value = self.search(&child, self.depth.saturating_sub(1), -INF, INF, !maximizing);
            let better = match best {
                None => true,
                Some((_, best_value)) if maximizing => value > best_value,
                Some((_, best_value)) => value < best_value,
            };
            if better {
                best = Some((mv, value));
            }
        }
        best.map(|(mv, _)| mv)
    }

    /// Alpha-beta over the remaining depth. `maximizing` names the player
    /// of the position explicitly rather than negating scores between
    /// plies; White takes the max branch, Black the min branch.
    pub fn search(
        &self,
        state: &GameState,
        depth: u8,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
    ) -> i32 {
        if depth == 0 || state.is_terminal() || state.is_full() {
            return (self.evaluate)(state);
        }
        if maximizing {
            let mut value = -INF;
            for mv in state.moves() {
                let child = state.play(mv).expect("legal move must succeed");
                value = value.max(self.search(&child, depth - 1, alpha, beta, false));
                alpha = alpha.max(value);
                if alpha >= beta {
                    break;
                }
            }
            value
        } else {
            let mut value = INF;
            for mv in state.moves() {
                let child = state.play(mv).expect("legal move must succeed");
                value = value.min(self.search(&child, depth - 1, alpha, beta, true));
                beta = beta.min(value);
                if beta <= alpha {
                    break;
                }
            }
            value
        }
    }
}

/// Parse a whole history string into the moves it encodes. Letters are
/// accepted in either case; `position` in errors is the index of the
/// offending character. Which player made each move follows from its
/// position in the string, White first.
pub fn parse_history(history: &str) -> Result<Vec<Move>, GameError> {
    let chars: Vec<char> = history.trim().chars().collect();
    if chars.len() % 2 != 0 {
        return Err(GameError::ParseMove {
            position: chars.len() - 1,
            reason: "dangling column letter at end of history".to_string(),
        });
    }
    let mut moves = Vec::with_capacity(chars.len() / 2);
    for (k, pair) in chars.chunks(2).enumerate() {
        moves.push(parse_token(pair[0], pair[1], k * 2)?);
    }
    Ok(moves)
}

fn parse_token(letter: char, digit: char, position: usize) -> Result<Move, GameError> {
    let x = match letter.to_ascii_lowercase() {
        c @ 'a'..='d' => c as usize - 'a' as usize,
        _ => {
            return Err(GameError::ParseMove {
                position,
                reason: format!("expected a column letter a-d, got {letter:?}"),
            })
        }
    };
    let y = match digit {
        c @ '1'..='4' => c as usize - '1' as usize,
        _ => {
            return Err(GameError::ParseMove {
                position: position + 1,
                reason: format!("expected a row digit 1-4, got {digit:?}"),
            })
        }
    };
    Ok(Move { x, y })
}

/// Serve one stateless move request: replay the history, then search to
/// the requested depth for the side whose turn it is.
pub fn best_move(request: MoveRequest) -> Result<MoveResponse, GameError> {
    if !(1..=10).contains(&request.level) {
        return Err(GameError::DepthOutOfRange(request.level));
    }
    let moves = parse_history(&request.position)?;
    let state = GameState::from_history(&moves)?;
    if state.is_terminal() {
        return Err(GameError::GameOver);
    }
    let chosen = AlphaBeta::new(request.level, evaluate)
        .find_best_move(&state)
        .ok_or(GameError::NoMoves)?;
    Ok(MoveResponse {
        column: chosen.to_string(),
    })
}

fn generate_win_masks() -> Vec<u64> {
    let mut masks = Vec::new();
    // Along x
    for y in 0..SIZE {
        for z in 0..SIZE {
            let mut mask = 0;
            for x in 0..SIZE {
                mask |= cell_bit(x, y, z);
            }
            masks.push(mask);
        }
    }
    // Along y
    for x in 0..SIZE {
        for z in 0..SIZE {
            let mut mask = 0;
            for y in 0..SIZE {
                mask |= cell_bit(x, y, z);
            }
            masks.push(mask);
        }
    }
    // Along z, the gravity columns
    for x in 0..SIZE {
        for y in 0..SIZE {
            let mut mask = 0;
            for z in 0..SIZE {
                mask |= cell_bit(x, y, z);
            }
            masks.push(mask);
        }
    }
    // Diagonals of each horizontal layer
    for z in 0..SIZE {
        let (mut main, mut anti) = (0, 0);
        for i in 0..SIZE {
            main |= cell_bit(i, i, z);
            anti |= cell_bit(i, SIZE - 1 - i, z);
        }
        masks.push(main);
        masks.push(anti);
    }
    // Diagonals of each vertical xz plane
    for y in 0..SIZE {
        let (mut main, mut anti) = (0, 0);
        for i in 0..SIZE {
            main |= cell_bit(i, y, i);
            anti |= cell_bit(i, y, SIZE - 1 - i);
        }
        masks.push(main);
        masks.push(anti);
    }
    // Diagonals of each vertical yz plane
    for x in 0..SIZE {
        let (mut main, mut anti) = (0, 0);
        for i in 0..SIZE {
            main |= cell_bit(x, i, i);
            anti |= cell_bit(x, i, SIZE - 1 - i);
        }
        masks.push(main);
        masks.push(anti);
    }
    // Space diagonals through the cube's corners
    let (mut d1, mut d2, mut d3, mut d4) = (0, 0, 0, 0);
    for i in 0..SIZE {
        d1 |= cell_bit(i, i, i);
        d2 |= cell_bit(i, i, SIZE - 1 - i);
        d3 |= cell_bit(i, SIZE - 1 - i, i);
        d4 |= cell_bit(SIZE - 1 - i, i, i);
    }
    masks.extend([d1, d2, d3, d4]);
    masks
}

fn cell_bit(x: usize, y: usize, z: usize) -> u64 {
    1u64 << ((x * SIZE + y) * SIZE + z)
}
