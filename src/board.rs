//! A compact 49-bit packed representation of a Connect 4 position

use crate::{CensusError, HEIGHT, WIDTH};

/// The number of bits in one column's lane
pub const COLUMN_BITS: u32 = (HEIGHT + 1) as u32;

/// The largest valid column code: a full column of second-player tiles
pub const COLUMN_CODE_MAX: u64 = 126;

const COLUMN_MASK: u64 = (1 << COLUMN_BITS) - 1;

/// A Connect 4 position packed into 49 bits
///
/// # Notes
/// Each column is stored as a 7-bit *column code*, with column `c` occupying
/// bits `[7c, 7c + 7)` of the packed integer:
///
/// ```comment
/// bit: 48        42 41        35  ...  13         7 6          0
///      [  column 6 ][  column 5 ]      [  column 1 ][  column 0 ]
/// ```
///
/// A column holding `h` tiles with tile pattern `p` has code `(2^h - 1) + p`,
/// where bit `j` of `p` describes the tile `j` squares above the floor:
/// 0 for the first player, 1 for the second. Codes for height `h` fill
/// `[2^h - 1, 2^(h+1) - 1)`, so the height is recovered as
/// `floor(log2(code + 1))` and a full column never exceeds code 126. The
/// empty board is 0.
///
/// # Keys
/// The packed integer is itself the key indexing the [frontier table]; two
/// positions are equal exactly when their packed forms are equal.
///
/// [frontier table]: ../frontier_table/struct.FrontierTable.html
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Board(u64);

impl Board {
    /// The empty board
    pub const EMPTY: Self = Self(0);

    /// Reconstructs a board from its packed form, validating every column code
    pub fn from_raw(raw: u64) -> Result<Self, CensusError> {
        for column in 0..WIDTH {
            let code = (raw >> (COLUMN_BITS * column as u32)) & COLUMN_MASK;
            if code > COLUMN_CODE_MAX {
                return Err(CensusError::InvalidPosition { column, code });
            }
        }
        Ok(Self(raw))
    }

    /// Accesses the packed 49-bit form
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Returns the 7-bit code of a column
    pub fn column_code(self, column: usize) -> u64 {
        (self.0 >> (COLUMN_BITS * column as u32)) & COLUMN_MASK
    }

    /// Returns the number of tiles in a column
    pub fn column_height(self, column: usize) -> usize {
        (self.column_code(column) + 1).ilog2() as usize
    }

    /// Returns the total number of tiles on the board
    pub fn ply(self) -> usize {
        (0..WIDTH).map(|column| self.column_height(column)).sum()
    }

    /// Drops the next tile into a column, returning the new position
    ///
    /// `ply` must be the true number of tiles already on the board: its
    /// parity selects the player, with odd plies placing a second-player
    /// tile. The caller is responsible for passing the correct value.
    ///
    /// Returns `Err` if the column's code is corrupt or the column is full
    pub fn apply_move(self, column: usize, ply: usize) -> Result<Self, CensusError> {
        debug_assert!(column < WIDTH);

        let code = self.column_code(column);
        if code > COLUMN_CODE_MAX {
            return Err(CensusError::InvalidPosition { column, code });
        }

        let height = (code + 1).ilog2();
        if height as usize >= HEIGHT {
            return Err(CensusError::IllegalMove(column));
        }

        let mut pattern = code - ((1 << height) - 1);
        if ply % 2 == 1 {
            pattern |= 1 << height;
        }
        let new_code = ((1 << (height + 1)) - 1) + pattern;

        let lane = COLUMN_BITS * column as u32;
        Ok(Self((self.0 & !(COLUMN_MASK << lane)) | (new_code << lane)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::EMPTY
    }
}
