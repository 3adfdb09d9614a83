use serde::{Deserialize, Serialize};

use crate::CellPos;

pub const MIN_ZOOM: u32 = 1;
pub const MAX_ZOOM: u32 = 40;
pub const DEFAULT_ZOOM: u32 = 10;

/// Zoom increment for the band `zoom` falls into. Coarser at high zoom so
/// every step feels about the same.
pub fn zoom_step(zoom: u32) -> u32 {
    if zoom < 5 {
        1
    } else if zoom < 15 {
        2
    } else {
        4
    }
}

/// Canvas area currently on screen, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Zoom and scroll state of the drawing surface.
///
/// Scroll offsets are in screen pixels of the zoomed content, like the
/// scroll position of a scrolled container. The content is the canvas
/// scaled by `zoom` with nearest-neighbor scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    zoom: u32,
    min_zoom: u32,
    max_zoom: u32,

    scroll_x: f64,
    scroll_y: f64,

    view_width: f64,
    view_height: f64,

    grid_width: u32,
    grid_height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            scroll_x: 0.0,
            scroll_y: 0.0,
            view_width: 800.0,
            view_height: 600.0,
            grid_width: 0,
            grid_height: 0,
        }
    }
}

impl Viewport {
    pub fn new(min_zoom: u32, max_zoom: u32, zoom: u32) -> Self {
        let min_zoom = min_zoom.max(1);
        let max_zoom = max_zoom.max(min_zoom);
        Self {
            zoom: zoom.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            ..Default::default()
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn zoom_range(&self) -> (u32, u32) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn scroll_x(&self) -> f64 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn view_size(&self) -> (f64, f64) {
        (self.view_width, self.view_height)
    }

    pub fn grid_size(&self) -> (u32, u32) {
        (self.grid_width, self.grid_height)
    }

    pub fn content_width(&self) -> f64 {
        self.grid_width as f64 * self.zoom as f64
    }

    pub fn content_height(&self) -> f64 {
        self.grid_height as f64 * self.zoom as f64
    }

    pub fn max_scroll_x(&self) -> f64 {
        (self.content_width() - self.view_width).max(0.0)
    }

    pub fn max_scroll_y(&self) -> f64 {
        (self.content_height() - self.view_height).max(0.0)
    }

    pub fn clamp_scroll(&mut self) {
        self.scroll_x = self.scroll_x.clamp(0.0, self.max_scroll_x());
        self.scroll_y = self.scroll_y.clamp(0.0, self.max_scroll_y());
    }

    pub fn set_grid_size(&mut self, width: u32, height: u32) {
        self.grid_width = width;
        self.grid_height = height;
        self.clamp_scroll();
    }

    pub fn set_view_size(&mut self, width: f64, height: f64) {
        self.view_width = width.max(0.0);
        self.view_height = height.max(0.0);
        self.clamp_scroll();
    }

    /// Sets the zoom while keeping the canvas point under `focal` (screen
    /// pixels relative to the view, default: view center) in place.
    ///
    /// Returns false if the clamped zoom equals the current one.
    pub fn set_zoom(&mut self, zoom: u32, focal: Option<(f64, f64)>) -> bool {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if zoom == self.zoom {
            return false;
        }
        let (focal_x, focal_y) = focal.unwrap_or((self.view_width / 2.0, self.view_height / 2.0));

        // Canvas point under the focal point before the change.
        let grid_x = (self.scroll_x + focal_x) / self.zoom as f64;
        let grid_y = (self.scroll_y + focal_y) / self.zoom as f64;

        self.zoom = zoom;
        self.scroll_x = grid_x * zoom as f64 - focal_x;
        self.scroll_y = grid_y * zoom as f64 - focal_y;
        self.clamp_scroll();
        true
    }

    pub fn zoom_in(&mut self, focal: Option<(f64, f64)>) -> bool {
        self.set_zoom(self.zoom.saturating_add(zoom_step(self.zoom)), focal)
    }

    /// Steps out using the band just below the current zoom, so leaving a
    /// band boundary mirrors the step that entered it.
    pub fn zoom_out(&mut self, focal: Option<(f64, f64)>) -> bool {
        let step = zoom_step(self.zoom.saturating_sub(1));
        self.set_zoom(self.zoom.saturating_sub(step), focal)
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll_x = x;
        self.scroll_y = y;
        self.clamp_scroll();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.scroll_to(self.scroll_x + dx, self.scroll_y + dy);
    }

    /// Cell under a screen point, `None` if the point is off the canvas.
    pub fn screen_to_cell(&self, screen_x: f64, screen_y: f64) -> Option<CellPos> {
        let x = ((screen_x + self.scroll_x) / self.zoom as f64).floor();
        let y = ((screen_y + self.scroll_y) / self.zoom as f64).floor();
        if x < 0.0 || y < 0.0 || x >= self.grid_width as f64 || y >= self.grid_height as f64 {
            return None;
        }
        Some(CellPos::new(x as u32, y as u32))
    }

    /// Top-left screen position of a cell.
    pub fn cell_to_screen(&self, pos: CellPos) -> (f64, f64) {
        (
            pos.x as f64 * self.zoom as f64 - self.scroll_x,
            pos.y as f64 * self.zoom as f64 - self.scroll_y,
        )
    }

    pub fn visible_region(&self) -> VisibleRegion {
        let zoom = self.zoom as f64;
        let x = (self.scroll_x / zoom).floor() as u32;
        let y = (self.scroll_y / zoom).floor() as u32;
        let right = (((self.scroll_x + self.view_width) / zoom).ceil() as u32).min(self.grid_width);
        let bottom = (((self.scroll_y + self.view_height) / zoom).ceil() as u32).min(self.grid_height);
        VisibleRegion {
            x: x.min(right),
            y: y.min(bottom),
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }
}
