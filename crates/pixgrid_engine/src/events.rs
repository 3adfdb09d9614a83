use tokio::sync::broadcast;

use crate::CellPos;

/// Change notifications for the presentation layer.
///
/// The engine never calls into rendering; consumers subscribe and repaint
/// what an event names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Canvas dimensions are known and the grid is allocated.
    MetadataLoaded { width: u32, height: u32 },
    /// A full resync completed; repaint everything older than `version`.
    GridRefreshed { version: u64 },
    CreditsUpdated { credits: u64 },
    /// The visible color of a single cell changed.
    CellChanged(CellPos),
    /// Every pending edit was dropped at once.
    OverlayCleared,
    ViewportChanged,
    CommitFinished { saved: usize, failed: usize },
}

/// Broadcast sender that tolerates having no subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        // An error only means nobody is listening.
        let _ = self.sender.send(event);
    }
}
