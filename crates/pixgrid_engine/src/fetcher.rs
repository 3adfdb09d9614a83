use futures_util::{StreamExt, stream};
use parking_lot::RwLock;

use crate::{EngineError, PixelGrid, RemoteStore, Result};

/// Largest number of cells requested by one read.
pub const MAX_TAKE: usize = 10_000;

/// Number of reads in flight at once.
pub const PARALLEL_CHUNKS: usize = 5;

/// One bounded read of the linear cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub offset: usize,
    pub x: u32,
    pub y: u32,
    pub take: usize,
}

/// Splits a `width x height` canvas into reads of at most `max_take` cells.
///
/// Chunk `i` starts at the flat offset `i * max_take`; the cursor is that
/// offset expressed as `(offset mod width, offset div width)`.
pub fn plan_chunks(width: u32, height: u32, max_take: usize) -> Vec<ChunkRequest> {
    let total = width as usize * height as usize;
    if total == 0 || max_take == 0 {
        return Vec::new();
    }
    let width = width as usize;
    (0..total)
        .step_by(max_take)
        .map(|offset| ChunkRequest {
            offset,
            x: (offset % width) as u32,
            y: (offset / width) as u32,
            take: max_take.min(total - offset),
        })
        .collect()
}

/// Populates a [`PixelGrid`] from the remote store.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedFetcher {
    max_take: usize,
    parallel: usize,
}

impl Default for ChunkedFetcher {
    fn default() -> Self {
        Self::new(MAX_TAKE, PARALLEL_CHUNKS)
    }
}

impl ChunkedFetcher {
    pub fn new(max_take: usize, parallel: usize) -> Self {
        Self {
            max_take: max_take.max(1),
            parallel: parallel.max(1),
        }
    }

    pub fn max_take(&self) -> usize {
        self.max_take
    }

    pub fn parallel(&self) -> usize {
        self.parallel
    }

    /// Reads the whole canvas into `grid` and bumps its version once.
    ///
    /// Chunk writes are disjoint, so they land in whatever order the reads
    /// complete. The first failing chunk aborts the round: cells it did not
    /// reach keep their old values and the version stays unchanged.
    pub async fn fetch(&self, store: &dyn RemoteStore, grid: &RwLock<PixelGrid>) -> Result<u64> {
        let size = grid.read().size();
        let (width, height) = size.ok_or(EngineError::NotInitialized)?;
        let chunks = plan_chunks(width, height, self.max_take);
        log::debug!("fetching {}x{} canvas in {} chunks", width, height, chunks.len());

        let mut reads = stream::iter(chunks)
            .map(|chunk| async move { (chunk, store.cells_from(chunk.x, chunk.y, chunk.take).await) })
            .buffer_unordered(self.parallel);

        while let Some((chunk, result)) = reads.next().await {
            let cells = result.map_err(|err| EngineError::BufferFetch {
                offset: chunk.offset,
                message: err.to_string(),
            })?;
            if cells.len() != chunk.take {
                return Err(EngineError::BufferFetch {
                    offset: chunk.offset,
                    message: format!("expected {} cells, got {}", chunk.take, cells.len()),
                });
            }
            grid.write().write_range(chunk.offset, &cells)?;
            log::debug!("chunk at offset {} ({} cells) written", chunk.offset, chunk.take);
        }

        let version = grid.write().bump_version();
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_covers_canvas_once() {
        let chunks = plan_chunks(1000, 1000, MAX_TAKE);
        assert_eq!(chunks.len(), 100);
        assert_eq!(chunks[1], ChunkRequest { offset: 10_000, x: 0, y: 10, take: 10_000 });
        assert_eq!(chunks.iter().map(|c| c.take).sum::<usize>(), 1_000_000);
    }

    #[test]
    fn plan_uses_linear_cursor_across_rows() {
        let chunks = plan_chunks(7, 5, 10);
        assert_eq!(
            chunks,
            vec![
                ChunkRequest { offset: 0, x: 0, y: 0, take: 10 },
                ChunkRequest { offset: 10, x: 3, y: 1, take: 10 },
                ChunkRequest { offset: 20, x: 6, y: 2, take: 10 },
                ChunkRequest { offset: 30, x: 2, y: 4, take: 5 },
            ]
        );
    }

    #[test]
    fn plan_of_empty_canvas_is_empty() {
        assert!(plan_chunks(0, 10, MAX_TAKE).is_empty());
    }
}
