//! Virtualized message list state
//!
//! Tracks the scroll offset over a long sequence of variable-height rows and
//! computes which rows need to be materialized for the current viewport.
//! Offsets and sizes share one unit (pixels for a graphical frontend, lines
//! for a terminal one).

use serde::Serialize;

use crate::config::ViewSettings;

/// Default rows rendered beyond each viewport edge
pub const DEFAULT_OVERSCAN: usize = 5;

/// Default estimated row size
pub const DEFAULT_ITEM_ESTIMATE: u32 = 80;

/// Default space kept below the last row
pub const DEFAULT_SCROLL_PADDING_END: u32 = 80;

/// How row sizes are determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeEstimate {
    /// Every row has the same size
    Fixed(u32),
    /// Rows start at `estimate` and take their measured size once reported
    Measured { estimate: u32 },
}

impl SizeEstimate {
    fn estimate(&self) -> u32 {
        match self {
            SizeEstimate::Fixed(size) => *size,
            SizeEstimate::Measured { estimate } => *estimate,
        }
    }
}

/// A row to materialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VirtualItem {
    pub index: usize,
    pub start: u64,
    pub size: u32,
}

/// Scroll state for the active tab's message list
#[derive(Debug, Clone)]
pub struct VirtualWindow {
    /// Current offset of the viewport top
    offset: u64,
    /// Visible extent
    viewport: u32,
    overscan: usize,
    padding_end: u32,
    estimate: SizeEstimate,
    /// Current size of each row
    sizes: Vec<u32>,
    /// `starts[i]` is the offset of row `i`; one extra entry holds the total
    starts: Vec<u64>,
}

impl Default for VirtualWindow {
    fn default() -> Self {
        Self::new(SizeEstimate::Fixed(DEFAULT_ITEM_ESTIMATE), 0)
    }
}

impl VirtualWindow {
    pub fn new(estimate: SizeEstimate, viewport: u32) -> Self {
        Self {
            offset: 0,
            viewport,
            overscan: DEFAULT_OVERSCAN,
            padding_end: DEFAULT_SCROLL_PADDING_END,
            estimate,
            sizes: Vec::new(),
            starts: vec![0],
        }
    }

    pub fn from_settings(settings: &ViewSettings) -> Self {
        let estimate = if settings.measure_items {
            SizeEstimate::Measured {
                estimate: settings.item_estimate,
            }
        } else {
            SizeEstimate::Fixed(settings.item_estimate)
        };
        Self::new(estimate, settings.viewport)
            .with_overscan(settings.overscan)
            .with_padding_end(settings.scroll_padding_end)
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_padding_end(mut self, padding: u32) -> Self {
        self.padding_end = padding;
        self
    }

    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn viewport(&self) -> u32 {
        self.viewport
    }

    /// Update the row count.
    ///
    /// Any change scrolls to the last row, regardless of where the user was.
    /// Returns `true` if the count changed.
    pub fn set_count(&mut self, count: usize) -> bool {
        let old = self.sizes.len();
        if count == old {
            return false;
        }

        let estimate = self.estimate.estimate();
        self.sizes.resize(count, estimate);
        self.starts.truncate(old.min(count) + 1);
        self.extend_starts();

        if count == 0 {
            self.offset = 0;
        } else {
            self.scroll_to_index(count - 1);
        }
        true
    }

    /// Drop all rows and scroll back to the top
    pub fn reset(&mut self) {
        self.sizes.clear();
        self.starts = vec![0];
        self.offset = 0;
    }

    pub fn set_viewport(&mut self, viewport: u32) {
        self.viewport = viewport;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Record a rendered row's real size.
    ///
    /// Ignored for fixed-size windows and out-of-range indices. Returns `true`
    /// if the layout changed.
    pub fn measure_item(&mut self, index: usize, size: u32) -> bool {
        if matches!(self.estimate, SizeEstimate::Fixed(_)) {
            return false;
        }
        match self.sizes.get_mut(index) {
            Some(current) if *current != size => {
                *current = size;
                // Only offsets after the measured row move
                self.starts.truncate(index + 1);
                self.extend_starts();
                self.offset = self.offset.min(self.max_offset());
                true
            }
            _ => false,
        }
    }

    /// Scroll to an absolute offset, clamped to the scrollable range
    pub fn scroll_to(&mut self, offset: u64) {
        self.offset = offset.min(self.max_offset());
    }

    /// Scroll so that row `index` ends at the bottom of the viewport
    pub fn scroll_to_index(&mut self, index: usize) {
        let Some(end) = self.starts.get(index + 1).copied() else {
            return;
        };
        let target = (end + self.padding_end as u64).saturating_sub(self.viewport as u64);
        self.scroll_to(target);
    }

    /// Total size of all rows (without end padding)
    pub fn total_size(&self) -> u64 {
        self.starts.last().copied().unwrap_or(0)
    }

    pub fn item_start(&self, index: usize) -> Option<u64> {
        if index < self.sizes.len() {
            self.starts.get(index).copied()
        } else {
            None
        }
    }

    pub fn item_size(&self, index: usize) -> Option<u32> {
        self.sizes.get(index).copied()
    }

    /// Inclusive `(lo, hi)` row range to render, overscan included.
    ///
    /// `None` for an empty list.
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        let count = self.sizes.len();
        if count == 0 {
            return None;
        }

        let top = self.offset;
        let bottom = self.offset + self.viewport as u64;

        // First row whose end lies below the viewport top
        let first = self.starts[1..]
            .partition_point(|&end| end <= top)
            .min(count - 1);
        // Last row starting above the viewport bottom
        let last = self.starts[..count]
            .partition_point(|&start| start < bottom)
            .saturating_sub(1)
            .max(first);

        let lo = first.saturating_sub(self.overscan);
        let hi = (last + self.overscan).min(count - 1);
        Some((lo, hi))
    }

    /// Rows to render with their positions
    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        match self.visible_range() {
            Some((lo, hi)) => (lo..=hi)
                .map(|index| VirtualItem {
                    index,
                    start: self.starts[index],
                    size: self.sizes[index],
                })
                .collect(),
            None => Vec::new(),
        }
    }

    fn max_offset(&self) -> u64 {
        (self.total_size() + self.padding_end as u64).saturating_sub(self.viewport as u64)
    }

    /// Recompute `starts` for rows past the end of the current prefix
    fn extend_starts(&mut self) {
        let mut next = self.starts.last().copied().unwrap_or(0);
        for &size in &self.sizes[self.starts.len() - 1..] {
            next += size as u64;
            self.starts.push(next);
        }
    }
}

/// Estimate a wrapped text row's height from its length.
///
/// `base + ceil(len / (width / avg_char_width)) * line_height`
pub fn estimate_text_height(
    width: u32,
    content_len: usize,
    base: u32,
    line_height: u32,
    avg_char_width: u32,
) -> u32 {
    let chars_per_line = (width / avg_char_width.max(1)).max(1) as usize;
    let lines = content_len.div_ceil(chars_per_line) as u32;
    base + lines * line_height
}
