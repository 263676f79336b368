/// Scroll step per row used when the row height cannot be measured.
pub const DEFAULT_ROW_HEIGHT_FALLBACK_PX: f64 = 80.0;

const DEFAULT_MAX_STALL_RETRIES: u32 = 3;

/// Layout figures read from the page, all in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySnapshot {
    pub row_height: f64,
    pub viewport_height: f64,
    pub document_height: f64,
    pub scroll_offset: f64,
}

impl GeometrySnapshot {
    /// Loop guard: true while the viewport has not reached the end of the scroll track.
    pub fn has_more(&self) -> bool {
        self.scroll_offset + self.viewport_height < self.document_height
    }

    pub fn shrank_since(&self, previous: &GeometrySnapshot) -> bool {
        self.document_height < previous.document_height
    }
}

/// Tunables of the scroll loop that the pure state machine needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarvestPolicy {
    pub row_height_fallback_px: f64,
    /// Consecutive growth-wait timeouts tolerated before the list is treated as exhausted.
    pub max_stall_retries: u32,
}

impl Default for HarvestPolicy {
    fn default() -> Self {
        Self {
            row_height_fallback_px: DEFAULT_ROW_HEIGHT_FALLBACK_PX,
            max_stall_retries: DEFAULT_MAX_STALL_RETRIES,
        }
    }
}

impl HarvestPolicy {
    /// Measured height wins; the fallback covers missing or degenerate measurements.
    pub fn row_height_estimate(&self, measured: f64) -> f64 {
        if measured.is_finite() && measured > 0.0 {
            measured
        } else {
            self.row_height_fallback_px
        }
    }

    /// Distance to scroll after a batch; an empty batch still advances by one row.
    pub fn scroll_step(&self, measured_row_height: f64, rows_in_batch: usize) -> f64 {
        self.row_height_estimate(measured_row_height) * rows_in_batch.max(1) as f64
    }
}
