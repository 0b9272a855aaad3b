//! Client for the external solved-game oracle process
//!
//! The oracle is a separate program that reads the precomputed solution
//! tables for the 7x6 board and answers position queries over its standard
//! streams. One client owns one oracle process; the engine gives every
//! worker thread a client of its own, so requests and responses never
//! interleave and no framing is needed on the pipes.
//!
//! # Protocol
//! A request is one line `B <ply> <pos>\n` with both numbers in decimal.
//! The answer is one *compact line* `<terminal> <v0> <v1> ... <v6>`, where
//! `terminal` is `0` or `1` and each value is `-1`, `0` or `1` for a legal
//! move or `.` for a full column. The oracle may emit progress or warning
//! lines at any point; anything that does not parse as a compact line is
//! skipped. A response stream that closes mid-query is fatal.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::trace;

use crate::board::Board;
use crate::{CensusError, WIDTH};

/// Default path of the oracle binary
pub const ORACLE_BIN: &str = "./wdl.out";

/// Default path of the oracle's solution-table directory
pub const SOLUTION_DIR: &str = "solution_w7_h6";

/// The per-move value sentinel marking an illegal move
pub const ILLEGAL: i8 = 2;

/// One parsed oracle answer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Reply {
    /// Whether the queried position is terminal
    pub terminal: bool,
    /// Per-column side-to-move values, with [`ILLEGAL`] for full columns
    pub values: [i8; WIDTH],
}

/// A handle on one oracle process
pub struct Oracle {
    child: Child,
    // taken on shutdown; closing it is the oracle's signal to stop reading
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl Oracle {
    /// Spawns an oracle over a solution-table directory
    ///
    /// `in_memory` asks the oracle to load its tables up front rather than
    /// mapping them on demand.
    pub fn start(bin: &Path, solution_dir: &Path, in_memory: bool) -> Result<Self, CensusError> {
        let mut command = Command::new(bin);
        command.arg(solution_dir).arg("--server").arg("--compact");
        if in_memory {
            command.arg("-Xmmap");
        }
        Self::from_command(command)
    }

    // separated from `start` so tests can point the client at a stub process
    pub(crate) fn from_command(mut command: Command) -> Result<Self, CensusError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().expect("child stdin is piped");
        let stdout = child.stdout.take().expect("child stdout is piped");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    /// Asks for the per-move values of a position at a given ply
    ///
    /// Blocks until a compact line arrives, skipping any interleaved
    /// chatter. Returns `Err` if the oracle's response stream closes first,
    /// with whatever the process left on stderr folded into the error.
    pub fn query(&mut self, board: Board, ply: usize) -> Result<Reply, CensusError> {
        let stdin = self.stdin.as_mut().expect("oracle stdin open until drop");
        writeln!(stdin, "B {} {}", ply, board.raw())?;
        stdin.flush()?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(CensusError::OracleExited {
                    stderr: self.drain_stderr(),
                });
            }
            if let Some(reply) = parse_compact_line(line.trim()) {
                return Ok(reply);
            }
            trace!(line = line.trim(), "skipping oracle chatter");
        }
    }

    // collect whatever the dying process left on stderr for the error message
    fn drain_stderr(&mut self) -> String {
        let mut message = String::new();
        if let Some(stderr) = self.child.stderr.take() {
            let _ = BufReader::new(stderr).read_to_string(&mut message);
        }
        message
    }
}

impl Drop for Oracle {
    // close the request stream, then terminate and reap the process
    fn drop(&mut self) {
        self.stdin.take();
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parses one compact response line
///
/// Any line that fails the grammar is oracle chatter, not an error.
pub(crate) fn parse_compact_line(line: &str) -> Option<Reply> {
    let mut fields = line.split_ascii_whitespace();

    let terminal = match fields.next()? {
        "0" => false,
        "1" => true,
        _ => return None,
    };

    let mut values = [ILLEGAL; WIDTH];
    for value in &mut values {
        *value = match fields.next()? {
            "." => ILLEGAL,
            "-1" => -1,
            "0" => 0,
            "1" => 1,
            _ => return None,
        };
    }

    fields.next().is_none().then_some(Reply { terminal, values })
}
