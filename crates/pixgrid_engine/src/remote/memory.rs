use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Account, CommitErrorKind, CommitItem, CommitResult, LinkerRef, RemoteError, RemoteStore, TransactionId};
use crate::{BACKGROUND, CellPos, ColorIndex, CreditPlan, Multiplier};

/// Plans a fresh [`MemoryStore`] publishes.
pub fn default_plans() -> Vec<CreditPlan> {
    vec![
        CreditPlan {
            credits: 100,
            multiplier: Multiplier::whole(10),
        },
        CreditPlan {
            credits: 1_000,
            multiplier: Multiplier::whole(9),
        },
        CreditPlan {
            credits: 10_000,
            multiplier: Multiplier::whole(8),
        },
    ]
}

#[derive(Debug)]
struct StoreState {
    width: u32,
    height: u32,
    cells: Vec<ColorIndex>,
    plans: Vec<CreditPlan>,
    linker: LinkerRef,
    credits: HashMap<Account, u64>,
    last_tx: TransactionId,

    // Scripted failures
    failing_offsets: HashSet<usize>,
    cell_failures: HashMap<CellPos, CommitErrorKind>,
    commit_failure: Option<String>,
    dropped_results: usize,
    metadata_failure: Option<String>,
    credit_failure: Option<String>,

    read_delay: Option<Duration>,
    commit_delay: Option<Duration>,

    // Statistics
    read_counts: Vec<u32>,
    read_calls: usize,
    metadata_calls: usize,
    commit_calls: usize,
}

/// In-process canvas store.
///
/// Behaves like the remote store: linear-cursor reads, one credit consumed
/// per saved cell, per-item commit results. Failures and delays can be
/// scripted, and read statistics are recorded for inspection.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    reads_in_flight: AtomicUsize,
    peak_reads_in_flight: AtomicUsize,
}

struct ReadSlot<'a>(&'a AtomicUsize);

impl Drop for ReadSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            state: Mutex::new(StoreState {
                width,
                height,
                cells: vec![BACKGROUND; len],
                plans: default_plans(),
                linker: LinkerRef::new("memory-linker"),
                credits: HashMap::new(),
                last_tx: 0,
                failing_offsets: HashSet::new(),
                cell_failures: HashMap::new(),
                commit_failure: None,
                dropped_results: 0,
                metadata_failure: None,
                credit_failure: None,
                read_delay: None,
                commit_delay: None,
                read_counts: vec![0; len],
                read_calls: 0,
                metadata_calls: 0,
                commit_calls: 0,
            }),
            reads_in_flight: AtomicUsize::new(0),
            peak_reads_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn set_plans(&self, plans: Vec<CreditPlan>) {
        self.state.lock().plans = plans;
    }

    pub fn set_credits(&self, account: &Account, credits: u64) {
        self.state.lock().credits.insert(account.clone(), credits);
    }

    pub fn credits(&self, account: &Account) -> u64 {
        self.state.lock().credits.get(account).copied().unwrap_or(0)
    }

    /// Writes a cell directly, as another user's commit would.
    pub fn paint(&self, pos: CellPos, color: ColorIndex) {
        let mut state = self.state.lock();
        if pos.is_inside(state.width, state.height) {
            let offset = pos.to_offset(state.width);
            state.cells[offset] = color;
        }
    }

    pub fn cell(&self, pos: CellPos) -> Option<ColorIndex> {
        let state = self.state.lock();
        if !pos.is_inside(state.width, state.height) {
            return None;
        }
        state.cells.get(pos.to_offset(state.width)).copied()
    }

    pub fn cells(&self) -> Vec<ColorIndex> {
        self.state.lock().cells.clone()
    }

    /// Reads starting at this linear offset fail until cleared.
    pub fn fail_chunk_at(&self, offset: usize) {
        self.state.lock().failing_offsets.insert(offset);
    }

    pub fn clear_chunk_failures(&self) {
        self.state.lock().failing_offsets.clear();
    }

    /// Every commit of `pos` is refused with `kind` until cleared.
    pub fn fail_cell(&self, pos: CellPos, kind: CommitErrorKind) {
        self.state.lock().cell_failures.insert(pos, kind);
    }

    pub fn clear_cell_failures(&self) {
        self.state.lock().cell_failures.clear();
    }

    /// The next commit call fails as a whole.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        self.state.lock().commit_failure = Some(message.into());
    }

    /// The next commit call answers with `count` results fewer than items.
    pub fn drop_results_of_next_commit(&self, count: usize) {
        self.state.lock().dropped_results = count;
    }

    pub fn fail_metadata(&self, message: Option<String>) {
        self.state.lock().metadata_failure = message;
    }

    pub fn fail_credits(&self, message: Option<String>) {
        self.state.lock().credit_failure = message;
    }

    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.state.lock().read_delay = delay;
    }

    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        self.state.lock().commit_delay = delay;
    }

    /// How often each cell was served by `cells_from`.
    pub fn read_counts(&self) -> Vec<u32> {
        self.state.lock().read_counts.clone()
    }

    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    pub fn metadata_calls(&self) -> usize {
        self.state.lock().metadata_calls
    }

    pub fn commit_calls(&self) -> usize {
        self.state.lock().commit_calls
    }

    pub fn peak_reads_in_flight(&self) -> usize {
        self.peak_reads_in_flight.load(Ordering::SeqCst)
    }

    fn enter_read(&self) -> ReadSlot<'_> {
        let now = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_reads_in_flight.fetch_max(now, Ordering::SeqCst);
        ReadSlot(&self.reads_in_flight)
    }

    fn metadata_call(&self) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.metadata_calls += 1;
        match &state.metadata_failure {
            Some(message) => Err(RemoteError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

async fn pause(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => tokio::task::yield_now().await,
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn dimensions(&self) -> Result<(u32, u32), RemoteError> {
        self.metadata_call()?;
        let state = self.state.lock();
        Ok((state.width, state.height))
    }

    async fn credit_plans(&self) -> Result<Vec<CreditPlan>, RemoteError> {
        self.metadata_call()?;
        Ok(self.state.lock().plans.clone())
    }

    async fn payment_linker(&self) -> Result<LinkerRef, RemoteError> {
        self.metadata_call()?;
        Ok(self.state.lock().linker.clone())
    }

    async fn credits_of(&self, account: &Account) -> Result<u64, RemoteError> {
        let state = self.state.lock();
        if let Some(message) = &state.credit_failure {
            return Err(RemoteError::Transport(message.clone()));
        }
        Ok(state.credits.get(account).copied().unwrap_or(0))
    }

    async fn cells_from(&self, x: u32, y: u32, count: usize) -> Result<Vec<ColorIndex>, RemoteError> {
        let _slot = self.enter_read();
        let delay = self.state.lock().read_delay;
        pause(delay).await;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.read_calls += 1;
        if x >= state.width || y >= state.height {
            return Err(RemoteError::Rejected(format!("cursor ({x}, {y}) is outside the canvas")));
        }
        let offset = CellPos::new(x, y).to_offset(state.width);
        if state.failing_offsets.contains(&offset) {
            return Err(RemoteError::Transport(format!("read at offset {offset} timed out")));
        }
        let end = offset.saturating_add(count).min(state.cells.len());
        for served in &mut state.read_counts[offset..end] {
            *served += 1;
        }
        Ok(state.cells[offset..end].to_vec())
    }

    async fn commit_cells(&self, account: &Account, items: &[CommitItem]) -> Result<Vec<CommitResult>, RemoteError> {
        let delay = self.state.lock().commit_delay;
        pause(delay).await;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.commit_calls += 1;
        if let Some(message) = state.commit_failure.take() {
            return Err(RemoteError::Transport(message));
        }

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let pos = item.pos();
            let failure = state.cell_failures.get(&pos).cloned();
            let result = if let Some(kind) = failure {
                Err(kind)
            } else if !pos.is_inside(state.width, state.height) {
                Err(CommitErrorKind::GenericError {
                    message: format!("Pixel {pos} is outside the canvas"),
                })
            } else {
                let balance = state.credits.entry(account.clone()).or_insert(0);
                if *balance == 0 {
                    Err(CommitErrorKind::GenericError {
                        message: "Not enough credits".to_string(),
                    })
                } else {
                    *balance -= 1;
                    state.cells[pos.to_offset(state.width)] = item.color;
                    state.last_tx += 1;
                    Ok(state.last_tx)
                }
            };
            results.push(result);
        }

        let dropped = std::mem::take(&mut state.dropped_results);
        results.truncate(results.len().saturating_sub(dropped));
        Ok(results)
    }
}
