//! Composition root: owns every component and wires them to one remote store.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard, broadcast};

use crate::{
    Account, CellPos, ChunkedFetcher, ColorIndex, CommitCoordinator, CommitOutcome, CommitReport, CreditGate, CreditPlan, EditState, EngineConfig,
    EngineError, EngineEvent, EventBus, LinkerRef, PendingCell, PixelGrid, RemoteStore, Result, SingleFlight, UndoState, Viewport,
};

/// Session-wide facts read once from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasMetadata {
    pub width: u32,
    pub height: u32,
    pub plans: Vec<CreditPlan>,
    pub linker: LinkerRef,
}

/// Result of a full resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncReport {
    /// `None` while nobody is signed in.
    pub credits: Option<Result<u64>>,
    /// New grid version, or why the buffer is (partially) stale.
    pub grid: Result<u64>,
}

impl ResyncReport {
    pub fn is_complete(&self) -> bool {
        self.grid.is_ok() && !matches!(self.credits, Some(Err(_)))
    }
}

/// Client-side canvas engine.
///
/// A cheap handle: clones share the same session state. All methods take
/// `&self`. Locks are never held across a remote call, so drawing continues
/// while a commit or resync is in flight.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn RemoteStore>,
    fetcher: ChunkedFetcher,
    committer: CommitCoordinator,

    metadata: Arc<OnceCell<CanvasMetadata>>,
    grid: Arc<RwLock<PixelGrid>>,
    edits: Arc<RwLock<EditState>>,
    viewport: Arc<RwLock<Viewport>>,
    account: Arc<RwLock<Option<Account>>>,
    credits: Arc<RwLock<u64>>,

    fetch_flight: Arc<SingleFlight<Result<u64>>>,
    commit_gate: Arc<Mutex<()>>,
    events: EventBus,
}

impl Engine {
    pub fn new(store: Arc<dyn RemoteStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetcher: ChunkedFetcher::new(config.max_take, config.parallel_chunks),
            committer: CommitCoordinator::new(config.stamp_commits),
            metadata: Arc::new(OnceCell::new()),
            grid: Arc::new(RwLock::new(PixelGrid::new())),
            edits: Arc::new(RwLock::new(EditState::new(config.max_batch))),
            viewport: Arc::new(RwLock::new(Viewport::new(config.min_zoom, config.max_zoom, config.initial_zoom))),
            account: Arc::new(RwLock::new(None)),
            credits: Arc::new(RwLock::new(0)),
            fetch_flight: Arc::new(SingleFlight::new()),
            commit_gate: Arc::new(Mutex::new(())),
            events: EventBus::new(config.event_capacity),
            store,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Metadata
    // ═══════════════════════════════════════════════════════════════════════

    /// Dimensions, plans and linker reference. Fetched once per session;
    /// concurrent callers share the request and a failure is not cached.
    pub async fn load_metadata(&self) -> Result<&CanvasMetadata> {
        self.metadata.get_or_try_init(|| self.fetch_metadata()).await
    }

    pub fn metadata(&self) -> Option<&CanvasMetadata> {
        self.metadata.get()
    }

    async fn fetch_metadata(&self) -> Result<CanvasMetadata> {
        let store = self.store.as_ref();
        let ((width, height), plans, linker) =
            futures_util::try_join!(store.dimensions(), store.credit_plans(), store.payment_linker()).map_err(|err| {
                log::error!("canvas metadata failed: {err}");
                EngineError::metadata(err)
            })?;

        self.grid.write().initialize(width, height).map_err(|err| {
            log::error!("store reported an unusable canvas: {err}");
            EngineError::metadata(err)
        })?;
        self.viewport.write().set_grid_size(width, height);
        log::info!("canvas is {width}x{height}, {} credit plans", plans.len());
        self.events.emit(EngineEvent::MetadataLoaded { width, height });

        Ok(CanvasMetadata { width, height, plans, linker })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Account & credits
    // ═══════════════════════════════════════════════════════════════════════

    pub fn account(&self) -> Option<Account> {
        self.account.read().clone()
    }

    /// Last known balance; 0 until fetched.
    pub fn credits(&self) -> u64 {
        *self.credits.read()
    }

    pub async fn sign_in(&self, account: Account) -> Result<u64> {
        log::info!("signed in as {account}");
        *self.account.write() = Some(account);
        self.refresh_credits().await.map(Option::unwrap_or_default)
    }

    pub fn sign_out(&self) {
        *self.account.write() = None;
        *self.credits.write() = 0;
        self.events.emit(EngineEvent::CreditsUpdated { credits: 0 });
    }

    /// Refetches the balance of the signed-in account. On failure the old
    /// balance stays in place.
    pub async fn refresh_credits(&self) -> Result<Option<u64>> {
        let account = self.account.read().clone();
        let Some(account) = account else {
            return Ok(None);
        };
        let credits = self.store.credits_of(&account).await.map_err(|err| {
            log::warn!("credit balance of {account} failed: {err}");
            EngineError::credits(err)
        })?;

        if self.account.read().as_ref() != Some(&account) {
            log::debug!("account changed while fetching credits, dropping balance of {account}");
            return Ok(None);
        }
        *self.credits.write() = credits;
        self.events.emit(EngineEvent::CreditsUpdated { credits });
        Ok(Some(credits))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Committed grid
    // ═══════════════════════════════════════════════════════════════════════

    /// Re-reads the whole canvas. Overlapping calls are coalesced.
    pub async fn refresh_grid(&self) -> Result<u64> {
        self.fetch_flight
            .run(|| async {
                let outcome = self.fetcher.fetch(self.store.as_ref(), &self.grid).await;
                match &outcome {
                    Ok(version) => {
                        log::info!("canvas refreshed, version {version}");
                        self.events.emit(EngineEvent::GridRefreshed { version: *version });
                    }
                    Err(err) => log::warn!("canvas refresh failed, buffer may be partially stale: {err}"),
                }
                outcome
            })
            .await
    }

    /// Metadata (once), credits and the full canvas.
    ///
    /// Only a metadata failure is returned as an error; credit and buffer
    /// failures are reported inside the [`ResyncReport`].
    pub async fn resync(&self) -> Result<ResyncReport> {
        self.load_metadata().await?;
        let credits = self.refresh_credits().await.transpose();
        let grid = self.refresh_grid().await;
        Ok(ResyncReport { credits, grid })
    }

    pub fn grid_version(&self) -> u64 {
        self.grid.read().version()
    }

    pub fn grid_size(&self) -> Option<(u32, u32)> {
        self.grid.read().size()
    }

    pub fn committed_color(&self, pos: CellPos) -> Option<ColorIndex> {
        self.grid.read().get(pos)
    }

    /// Color a renderer should show: the pending edit if any, else the committed cell.
    pub fn visible_color(&self, pos: CellPos) -> Option<ColorIndex> {
        self.pending_color(pos).or_else(|| self.committed_color(pos))
    }

    /// Read access to the committed grid for bulk rendering.
    pub fn with_grid<R>(&self, f: impl FnOnce(&PixelGrid) -> R) -> R {
        f(&self.grid.read())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Editing
    // ═══════════════════════════════════════════════════════════════════════

    /// Stages `color` at `pos`. `Ok(false)` if the cell already had that color.
    pub fn set_pixel(&self, pos: CellPos, color: ColorIndex) -> Result<bool> {
        self.grid.read().check_bounds(pos)?;
        let changed = self.edits.write().set_pixel(pos, color)?;
        if changed {
            self.events.emit(EngineEvent::CellChanged(pos));
        }
        Ok(changed)
    }

    /// Draws at a screen point of the drawing surface. Points off the
    /// canvas are ignored.
    pub fn paint_at(&self, screen_x: f64, screen_y: f64, color: ColorIndex) -> Result<bool> {
        match self.screen_to_cell(screen_x, screen_y) {
            Some(pos) => self.set_pixel(pos, color),
            None => Ok(false),
        }
    }

    pub fn undo(&self) -> Result<Option<CellPos>> {
        let pos = self.edits.write().undo()?;
        if let Some(pos) = pos {
            self.events.emit(EngineEvent::CellChanged(pos));
        }
        Ok(pos)
    }

    pub fn redo(&self) -> Result<Option<CellPos>> {
        let pos = self.edits.write().redo()?;
        if let Some(pos) = pos {
            self.events.emit(EngineEvent::CellChanged(pos));
        }
        Ok(pos)
    }

    pub fn can_undo(&self) -> bool {
        self.edits.read().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.edits.read().can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.edits.read().undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.edits.read().redo_description()
    }

    /// Drops all pending edits and both history stacks in one step.
    pub fn clear_edits(&self) {
        self.edits.write().clear();
        self.events.emit(EngineEvent::OverlayCleared);
    }

    pub fn pending_count(&self) -> usize {
        self.edits.read().overlay().len()
    }

    pub fn pending_color(&self, pos: CellPos) -> Option<ColorIndex> {
        self.edits.read().overlay().get(pos)
    }

    pub fn pending_cells(&self) -> Vec<PendingCell> {
        self.edits.read().overlay().snapshot()
    }

    pub fn with_edits<R>(&self, f: impl FnOnce(&EditState) -> R) -> R {
        f(&self.edits.read())
    }

    /// The checks `commit` would do first, without sending anything.
    pub fn check_commit(&self) -> Result<()> {
        if self.account.read().is_none() {
            return Err(EngineError::NotSignedIn);
        }
        CommitCoordinator::preflight(self.pending_count(), self.credits())
    }

    /// Credits left once every pending edit is saved, `None` if they do not suffice.
    pub fn balance_after_commit(&self) -> Option<u64> {
        CreditGate::balance_after(self.pending_count(), self.credits())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Viewport
    // ═══════════════════════════════════════════════════════════════════════

    pub fn viewport(&self) -> Viewport {
        self.viewport.read().clone()
    }

    pub fn set_zoom(&self, zoom: u32, focal: Option<(f64, f64)>) -> bool {
        let changed = self.viewport.write().set_zoom(zoom, focal);
        self.viewport_changed(changed)
    }

    pub fn zoom_in(&self, focal: Option<(f64, f64)>) -> bool {
        let changed = self.viewport.write().zoom_in(focal);
        self.viewport_changed(changed)
    }

    pub fn zoom_out(&self, focal: Option<(f64, f64)>) -> bool {
        let changed = self.viewport.write().zoom_out(focal);
        self.viewport_changed(changed)
    }

    pub fn pan_by(&self, dx: f64, dy: f64) {
        self.viewport.write().pan_by(dx, dy);
        self.viewport_changed(true);
    }

    /// Remembers the scroll position reported by the drawing surface so it
    /// can be restored when the surface is recreated.
    pub fn record_scroll(&self, x: f64, y: f64) {
        self.viewport.write().scroll_to(x, y);
    }

    pub fn set_view_size(&self, width: f64, height: f64) {
        self.viewport.write().set_view_size(width, height);
    }

    pub fn screen_to_cell(&self, screen_x: f64, screen_y: f64) -> Option<CellPos> {
        self.viewport.read().screen_to_cell(screen_x, screen_y)
    }

    fn viewport_changed(&self, changed: bool) -> bool {
        if changed {
            self.events.emit(EngineEvent::ViewportChanged);
        }
        changed
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Commit
    // ═══════════════════════════════════════════════════════════════════════

    /// Saves every pending edit.
    ///
    /// The overlay is cleared optimistically before the batch is sent, so
    /// drawing can continue meanwhile. Cells that failed go back into the
    /// overlay unless they were drawn over again in between. A full resync
    /// follows regardless of the outcome. Commits queue behind each other.
    ///
    /// Once the overlay has been taken the save runs on its own task, so
    /// dropping the returned future does not lose the edits: the batch is
    /// still sent, failures restored and the canvas resynced.
    pub async fn commit(&self) -> Result<CommitReport> {
        let turn = Arc::clone(&self.commit_gate).lock_owned().await;

        let account = self.account.read().clone().ok_or(EngineError::NotSignedIn)?;
        let credits = self.credits();
        let snapshot = {
            let mut edits = self.edits.write();
            CommitCoordinator::preflight(edits.overlay().len(), credits)?;
            edits.take_snapshot()
        };
        self.events.emit(EngineEvent::OverlayCleared);
        log::info!("saving {} pixels for {account}", snapshot.len());

        let engine = self.clone();
        let task = tokio::spawn(async move { engine.finish_commit(turn, account, snapshot).await });
        match task.await {
            Ok(report) => Ok(report),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(EngineError::CommitAborted { message: err.to_string() }),
        }
    }

    async fn finish_commit(&self, _turn: OwnedMutexGuard<()>, account: Account, snapshot: Vec<PendingCell>) -> CommitReport {
        let outcome = self.committer.submit(self.store.as_ref(), &account, &snapshot).await;

        let restore = self.edits.write().restore(outcome.unsaved_cells(&snapshot));
        for pos in &restore.restored {
            self.events.emit(EngineEvent::CellChanged(*pos));
        }
        if !restore.dropped.is_empty() {
            log::warn!("{} unsaved pixels could not be restored, the overlay is full", restore.dropped.len());
        }

        match &outcome {
            CommitOutcome::Completed { saved, failures } => {
                log::info!("{saved} pixels saved, {} failed", failures.len());
                for failure in failures {
                    log::warn!("pixel {} not saved: {}", failure.pos, failure.kind);
                }
            }
            CommitOutcome::TransportFailed(err) => log::warn!("{err}"),
        }
        self.events.emit(EngineEvent::CommitFinished {
            saved: outcome.saved(),
            failed: outcome.failed(),
        });

        let resync = self.resync().await;
        CommitReport {
            submitted: snapshot.len(),
            outcome,
            restore,
            resync,
        }
    }
}
