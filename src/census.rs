//! The breadth-first census over the solved game tree
//!
//! # Notes
//! The census walks the reachable tree one ply at a time. Two frontier
//! tables alternate roles across the run: the table holding ply `d` is
//! scanned in parallel chunks, every occupied slot is expanded through an
//! oracle query, and the children that survive the proof-role pruning are
//! merged into the table for ply `d + 1`. A linear scan then tallies
//! solution artifacts against proof certificates and one report row is
//! emitted.
//!
//! # Parallelism
//! Within one depth, worker threads claim contiguous slot chunks from a
//! shared cursor. Each worker owns its oracle and buffers every child it
//! produces; only after its whole scan does it take the merge lock, once,
//! and drain the buffer into the next frontier. Depths are strictly
//! sequential: no expansion for ply `d + 1` starts before every worker has
//! merged its children for ply `d`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use tracing::info;

use crate::board::Board;
use crate::frontier_table::FrontierTable;
use crate::node_kind::{KindMask, NodeKind, NodeMeta};
use crate::oracle::{self, Oracle, Reply, ILLEGAL};
use crate::{CensusError, MAX_PLY, WIDTH};

/// Returns the columns ordered from the middle outwards, stepping left
/// before right at each distance: `[3, 2, 4, 1, 5, 0, 6]`
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) - (i % 2) * (i / 2 + 1) + (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}

const CSV_HEADER: &str = "Depth,SolutionArtifactCount,ProofCertificateCount,NodeCount";

/// Run parameters for a census
///
/// The production run takes no command-line flags; [`CensusConfig::default`]
/// carries the values it uses. Tests and library callers construct smaller
/// configurations directly.
#[derive(Clone, Debug)]
pub struct CensusConfig {
    /// Path of the oracle binary
    pub oracle_bin: PathBuf,

    /// Path of the oracle's solution-table directory
    pub solution_dir: PathBuf,

    /// Ask each oracle to hold its tables in memory instead of mapping them
    /// on demand
    pub oracle_in_memory: bool,

    /// Slot count of each of the two frontier tables
    pub table_capacity: u64,

    /// Slots per work unit of the parallel frontier scan
    pub chunk_size: u64,

    /// Worker thread count; `None` uses the available hardware parallelism
    pub workers: Option<usize>,

    /// Path of the CSV report
    pub output_path: PathBuf,

    /// Number of plies to expand
    pub max_depth: usize,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            oracle_bin: PathBuf::from(oracle::ORACLE_BIN),
            solution_dir: PathBuf::from(oracle::SOLUTION_DIR),
            oracle_in_memory: false,
            table_capacity: 3 * (1u64 << 31),
            chunk_size: 1 << 20,
            workers: None,
            output_path: PathBuf::from("output.csv"),
            max_depth: MAX_PLY,
        }
    }
}

/// Census totals for one depth
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct DepthCounts {
    /// Positions whose role set touches the solution side
    pub solution: u64,
    /// Positions whose role set lies entirely on the certificate side
    pub certificate: u64,
}

impl DepthCounts {
    pub fn total(self) -> u64 {
        self.solution + self.certificate
    }
}

/// Tallies one frontier by role class
///
/// The two classes partition the stored positions, so their sum equals the
/// table's size.
pub fn count_frontier(frontier: &FrontierTable) -> DepthCounts {
    let mut counts = DepthCounts::default();
    for (_, meta) in frontier.iter() {
        if meta.kinds().is_solution_artifact() {
            counts.solution += 1;
        } else {
            counts.certificate += 1;
        }
    }
    counts
}

/// A child record buffered by a worker ahead of the merge phase
#[derive(Copy, Clone, Debug)]
pub(crate) struct Child {
    pub board: Board,
    pub meta: NodeMeta,
}

/// The node value (best value over legal moves) and the first move in
/// center-out order achieving it
///
/// Returns `None` when no move is legal, in which case the node is terminal.
pub(crate) fn evaluate(values: &[i8; WIDTH]) -> Option<(i8, usize)> {
    let value = values.iter().filter(|&&v| v != ILLEGAL).copied().max()?;
    // the illegal sentinel never equals a value in {-1, 0, 1}
    let best = move_order().into_iter().find(|&m| values[m] == value)?;
    Some((value, best))
}

// roles for which the proof only needs the best reply witnessed once the
// position is already won for the side to move
const WITNESS_ONLY: KindMask = KindMask::from_bits(
    NodeKind::Alternative as u8 | NodeKind::CertLine as u8 | NodeKind::CertBranch as u8,
);

/// Expands one frontier position into the children the proof keeps
///
/// Surviving children are appended to `out`. Terminal positions produce
/// nothing. Each legal move's child inherits its role set from the parent's
/// roles and whether the move is the parent's best; two pruning rules then
/// drop children that certify nothing new:
///
/// - a parent that is purely a certificate main line keeps only the best
///   reply;
/// - a parent whose roles all lie in [`WITNESS_ONLY`] keeps only the best
///   reply when the position is already won for the side to move.
pub(crate) fn expand_into(
    board: Board,
    ply: usize,
    kinds: KindMask,
    reply: &Reply,
    out: &mut Vec<Child>,
) -> Result<(), CensusError> {
    if reply.terminal {
        return Ok(());
    }
    let Some((value, best)) = evaluate(&reply.values) else {
        return Ok(());
    };

    for column in 0..WIDTH {
        if reply.values[column] == ILLEGAL {
            continue;
        }
        let most_promising = column == best;
        let child_kinds = kinds.child_mask(most_promising);

        if !most_promising {
            // a pure certificate main line keeps only the refuting best reply
            if kinds == NodeKind::CertLine.mask() {
                continue;
            }
            // an already-won witness branch gains nothing from other replies
            if kinds.is_subset(WITNESS_ONLY) && value == 1 {
                continue;
            }
        }

        let child = board.apply_move(column, ply)?;
        // the side to move flips, and the value flips with it
        out.push(Child {
            board: child,
            meta: NodeMeta::new(-reply.values[column], child_kinds),
        });
    }
    Ok(())
}

/// The census engine: an oracle pool driving two alternating frontiers
pub struct Census {
    config: CensusConfig,
    oracles: Vec<Oracle>,
}

impl Census {
    /// Spawns one oracle per worker and warms each one up
    pub fn new(config: CensusConfig) -> Result<Self, CensusError> {
        let workers = config.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });

        info!(workers, "starting oracle pool");
        let mut oracles = Vec::with_capacity(workers);
        for _ in 0..workers {
            oracles.push(Oracle::start(
                &config.oracle_bin,
                &config.solution_dir,
                config.oracle_in_memory,
            )?);
        }

        // first contact makes the backend load its solution tables
        for oracle in &mut oracles {
            oracle.query(Board::EMPTY, 0)?;
        }
        info!("oracle pool ready");

        Ok(Self { config, oracles })
    }

    /// Runs the full census, emitting one report row per depth
    ///
    /// Rows go to standard output and to the CSV file named by the
    /// configuration; the CSV is flushed after every depth so an interrupted
    /// run keeps the rows it finished.
    pub fn run(&mut self) -> Result<(), CensusError> {
        let mut tables = [
            FrontierTable::with_capacity(self.config.table_capacity),
            FrontierTable::with_capacity(self.config.table_capacity),
        ];

        let mut csv = BufWriter::new(File::create(&self.config.output_path)?);
        writeln!(io::stdout().lock(), "{CSV_HEADER}")?;
        writeln!(csv, "{CSV_HEADER}")?;

        // seed ply 0: the empty board opens the principal variation
        let reply = self.oracles[0].query(Board::EMPTY, 0)?;
        let root_value = evaluate(&reply.values).map(|(value, _)| value).unwrap_or(-1);
        tables[0].set_merge(
            Board::EMPTY.raw(),
            NodeMeta::new(root_value, NodeKind::Principal.mask()),
        )?;
        emit_row(&mut csv, 0, count_frontier(&tables[0]))?;

        info!(depths = self.config.max_depth, "starting census");
        for depth in 0..self.config.max_depth {
            let started = Instant::now();

            let (current, next) = split_pair(&mut tables, depth % 2);
            next.clear();
            expand_frontier(current, next, depth, &mut self.oracles, self.config.chunk_size)?;

            let counts = count_frontier(next);
            info!(
                depth = depth + 1,
                nodes = counts.total(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "depth complete"
            );
            emit_row(&mut csv, depth + 1, counts)?;
        }

        csv.flush()?;
        info!("census finished");
        Ok(())
    }
}

// the scan table and the merge table alternate by depth parity
fn split_pair(tables: &mut [FrontierTable; 2], current: usize) -> (&FrontierTable, &mut FrontierTable) {
    let (first, second) = tables.split_at_mut(1);
    if current == 0 {
        (&first[0], &mut second[0])
    } else {
        (&second[0], &mut first[0])
    }
}

/// Expands every position of `current` into `next`, one worker per oracle
fn expand_frontier(
    current: &FrontierTable,
    next: &mut FrontierTable,
    depth: usize,
    oracles: &mut [Oracle],
    chunk_size: u64,
) -> Result<(), CensusError> {
    let chunks = current.capacity().div_ceil(chunk_size);
    let cursor = AtomicU64::new(0);
    let sink = Mutex::new(next);

    let mut outcome = Ok(());
    thread::scope(|scope| {
        let sink = &sink;
        let cursor = &cursor;
        let handles: Vec<_> = oracles
            .iter_mut()
            .map(|oracle| {
                scope.spawn(move || worker(current, sink, cursor, chunks, chunk_size, depth, oracle))
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    if outcome.is_ok() {
                        outcome = Err(error);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });
    outcome
}

// one worker: scan claimed chunks, expand, then merge the whole buffer under
// a single lock acquisition
fn worker(
    current: &FrontierTable,
    sink: &Mutex<&mut FrontierTable>,
    cursor: &AtomicU64,
    chunks: u64,
    chunk_size: u64,
    depth: usize,
    oracle: &mut Oracle,
) -> Result<(), CensusError> {
    let mut buffer = Vec::new();

    loop {
        let chunk = cursor.fetch_add(1, Ordering::Relaxed);
        if chunk >= chunks {
            break;
        }
        let start = chunk * chunk_size;
        let end = (start + chunk_size).min(current.capacity());

        for index in start..end {
            let Some((key, meta)) = current.entry_at(index) else {
                continue;
            };
            let board = Board::from_raw(key)?;
            let reply = oracle.query(board, depth)?;
            expand_into(board, depth, meta.kinds(), &reply, &mut buffer)?;
        }
    }

    let mut next = sink.lock().expect("another worker panicked while merging");
    for child in buffer {
        next.set_merge(child.board.raw(), child.meta)?;
    }
    Ok(())
}

// one report row, mirrored to stdout and flushed through to the file
fn emit_row(csv: &mut BufWriter<File>, depth: usize, counts: DepthCounts) -> Result<(), CensusError> {
    writeln!(
        io::stdout().lock(),
        "{},{},{},{}",
        depth,
        counts.solution,
        counts.certificate,
        counts.total()
    )?;
    writeln!(
        csv,
        "{},{},{},{}",
        depth,
        counts.solution,
        counts.certificate,
        counts.total()
    )?;
    csv.flush()?;
    Ok(())
}
