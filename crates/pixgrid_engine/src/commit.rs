use chrono::Utc;

use crate::{
    Account, CellPos, ColorIndex, CommitErrorKind, CommitItem, CommitResult, CreditGate, EngineError, PendingCell, RemoteStore, RestoreSummary,
    Result, ResyncReport,
};

/// A cell the store refused to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFailure {
    pub pos: CellPos,
    pub color: ColorIndex,
    pub kind: CommitErrorKind,
}

impl CommitFailure {
    pub fn pending(&self) -> PendingCell {
        PendingCell::new(self.pos, self.color)
    }
}

/// What the store answered to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Per-item results are known.
    Completed { saved: usize, failures: Vec<CommitFailure> },
    /// The call itself failed; carries [`EngineError::CommitTransport`].
    TransportFailed(EngineError),
}

impl CommitOutcome {
    pub fn saved(&self) -> usize {
        match self {
            CommitOutcome::Completed { saved, .. } => *saved,
            CommitOutcome::TransportFailed(_) => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            CommitOutcome::Completed { failures, .. } => failures.len(),
            CommitOutcome::TransportFailed(EngineError::CommitTransport { unsaved, .. }) => *unsaved,
            CommitOutcome::TransportFailed(_) => 0,
        }
    }

    /// Cells that have to go back into the overlay: every failed item, or the
    /// whole snapshot if nothing is known about individual items.
    pub fn unsaved_cells(&self, snapshot: &[PendingCell]) -> Vec<PendingCell> {
        match self {
            CommitOutcome::Completed { failures, .. } => failures.iter().map(CommitFailure::pending).collect(),
            CommitOutcome::TransportFailed(_) => snapshot.to_vec(),
        }
    }
}

/// Everything that happened during one commit.
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub submitted: usize,
    pub outcome: CommitOutcome,
    pub restore: RestoreSummary,
    /// The resync that always follows a commit.
    pub resync: Result<ResyncReport>,
}

/// Turns an overlay snapshot into a commit batch and its results back into
/// overlay changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitCoordinator {
    stamp_commits: bool,
}

impl CommitCoordinator {
    pub fn new(stamp_commits: bool) -> Self {
        Self { stamp_commits }
    }

    /// Advisory checks done before anything is sent.
    pub fn preflight(pending: usize, credits: u64) -> Result<()> {
        if pending == 0 {
            return Err(EngineError::NothingToCommit);
        }
        CreditGate::check(pending, credits)
    }

    pub fn build_items(&self, snapshot: &[PendingCell]) -> Vec<CommitItem> {
        let created_at = if self.stamp_commits {
            Utc::now().timestamp_nanos_opt().and_then(|nanos| u64::try_from(nanos).ok())
        } else {
            None
        };
        snapshot
            .iter()
            .map(|cell| CommitItem {
                x: cell.pos.x,
                y: cell.pos.y,
                color: cell.color,
                memo: None,
                created_at,
            })
            .collect()
    }

    /// Pairs results with the submitted cells by position. Items the store
    /// did not answer count as failed.
    pub fn partition(snapshot: &[PendingCell], results: Vec<CommitResult>) -> CommitOutcome {
        if results.len() > snapshot.len() {
            log::warn!("store answered {} results for {} items", results.len(), snapshot.len());
        }
        let mut saved = 0;
        let mut failures = Vec::new();
        let mut results = results.into_iter();
        for cell in snapshot {
            match results.next() {
                Some(Ok(_)) => saved += 1,
                Some(Err(kind)) => failures.push(CommitFailure {
                    pos: cell.pos,
                    color: cell.color,
                    kind,
                }),
                None => failures.push(CommitFailure {
                    pos: cell.pos,
                    color: cell.color,
                    kind: CommitErrorKind::GenericError {
                        message: "No result returned by the store".to_string(),
                    },
                }),
            }
        }
        CommitOutcome::Completed { saved, failures }
    }

    /// Sends `snapshot` as one batch. Never fails: transport errors become
    /// [`CommitOutcome::TransportFailed`].
    pub async fn submit(&self, store: &dyn RemoteStore, account: &Account, snapshot: &[PendingCell]) -> CommitOutcome {
        let items = self.build_items(snapshot);
        match store.commit_cells(account, &items).await {
            Ok(results) => Self::partition(snapshot, results),
            Err(err) => CommitOutcome::TransportFailed(EngineError::CommitTransport {
                message: err.to_string(),
                unsaved: snapshot.len(),
            }),
        }
    }
}
