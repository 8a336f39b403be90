//! Spread index arithmetic.
//!
//! Spread 0 is a synthetic title leaf. Spread `k > 0` covers pages
//! `2k-1` and `2k` (1-based), dropping the second page when it would
//! exceed the page count. A magazine with no pages still has the title
//! spread, so the spread count is never zero.

/// Immutable spread geometry for one magazine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadLayout {
    total_pages: u32,
}

impl SpreadLayout {
    /// Layout for a magazine with the given page count.
    pub fn new(total_pages: u32) -> Self {
        Self { total_pages }
    }

    /// Total PDF page count.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Number of spreads, title leaf included.
    pub fn spread_count(&self) -> u32 {
        self.total_pages.div_ceil(2) + 1
    }

    /// Last valid spread index.
    pub fn last_spread(&self) -> u32 {
        self.spread_count() - 1
    }

    /// Clamp an arbitrary target to the valid spread range.
    pub fn clamp(&self, target: i64) -> u32 {
        target.clamp(0, i64::from(self.last_spread())) as u32
    }

    /// Pages covered by a spread, or `None` for the title leaf and
    /// out-of-range indexes.
    pub fn pages_for(&self, spread: u32) -> Option<(u32, Option<u32>)> {
        if spread == 0 || spread > self.last_spread() {
            return None;
        }
        let first = 2 * spread - 1;
        if first > self.total_pages {
            return None;
        }
        let second = 2 * spread;
        Some((
            first,
            if second <= self.total_pages {
                Some(second)
            } else {
                None
            },
        ))
    }

    /// Spread containing an absolute page number (1-based), clamped.
    pub fn spread_for_page(&self, page_number: u32) -> u32 {
        self.clamp(i64::from(page_number.div_ceil(2)))
    }

    /// First page shown on a spread; the title leaf reads as page 1.
    pub fn first_page(&self, spread: u32) -> u32 {
        match self.pages_for(spread) {
            Some((first, _)) => first,
            None => 1,
        }
    }

    /// Display label for a spread.
    pub fn label(&self, spread: u32) -> String {
        match self.pages_for(spread) {
            None => "Title Page".to_string(),
            Some((first, second)) => {
                let last = second.unwrap_or(first);
                format!("Pages {}-{} of {}", first, last, self.total_pages)
            }
        }
    }

    /// Reading percentage for a page, clamped to `[0, 100]`.
    pub fn percentage(&self, page_number: u32) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (f64::from(page_number) / f64::from(self.total_pages) * 100.0).clamp(0.0, 100.0)
    }
}
