//! A breadth-first census of the solved game tree of Connect 4
//!
//! This engine enumerates every position reachable from the empty 7x6 board
//! under the branching rules of a strong solution proof, one ply at a time.
//! Each position carries its optimal-play value and the set of proof roles
//! under which it appears, and the engine reports per depth how many
//! positions belong to the solution itself and how many only certify it.
//!
//! Exact per-move values come from an external oracle process that reads
//! precomputed solution tables; this crate owns the search, the frontier
//! storage and the oracle conversation.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_census::board::Board;
//!
//! # fn main() -> Result<(), connect4_census::CensusError> {
//! // stack three tiles in the center column
//! let board = Board::EMPTY
//!     .apply_move(3, 0)?
//!     .apply_move(3, 1)?
//!     .apply_move(3, 2)?;
//!
//! assert_eq!(board.column_height(3), 3);
//! assert_eq!(board.ply(), 3);
//! # Ok(())
//! # }
//! ```

use static_assertions::*;
use thiserror::Error;
pub use anyhow;

pub mod board;

pub mod census;

pub mod frontier_table;

pub mod node_kind;

pub mod oracle;


/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

/// The number of plies in a finished game
pub const MAX_PLY: usize = WIDTH * HEIGHT;

// each column code takes HEIGHT + 1 bits; together they must fill the 49-bit key
const_assert!(WIDTH * (HEIGHT + 1) == 49);

/// The fatal error conditions of a census run
///
/// Every variant aborts the run; report rows already written are kept but no
/// frontier state survives the process.
#[derive(Debug, Error)]
pub enum CensusError {
    /// A packed board carried a column code outside the valid range
    #[error("invalid position: column {column} has code {code:#x}")]
    InvalidPosition { column: usize, code: u64 },

    /// A move was applied to a full column
    #[error("illegal move: column {0} is full")]
    IllegalMove(usize),

    /// A frontier key does not fit in 49 bits
    #[error("position key {0:#x} does not fit in 49 bits")]
    KeyOutOfRange(u64),

    /// A frontier insertion probed every slot without landing
    #[error("frontier table full at capacity {0}")]
    TableFull(u64),

    /// An oracle closed its response stream before answering
    #[error("oracle exited unexpectedly; stderr:\n{stderr}")]
    OracleExited { stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
