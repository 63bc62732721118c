//! Page arithmetic for grouped historical results.
//!
//! Results are grouped into independent per-device or per-sensor series
//! of varying length, so the page count divides total matching rows by
//! the distinct sensor count to estimate "virtual rows" per series. The
//! count is an approximation, not an exact guarantee; it avoids
//! materializing every group just to count it.

/// Hard ceiling on caller-supplied page sizes.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Applied when the caller omits the page size or supplies zero.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Normalize a raw caller page size: default when absent or zero,
/// clamped to [`MAX_PAGE_SIZE`] otherwise.
pub fn clamp_page_size(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => DEFAULT_PAGE_SIZE,
        Some(size) => size.min(MAX_PAGE_SIZE),
    }
}

/// Normalize a raw caller page index: pages are 1-based, absent or zero
/// means the first page.
pub fn normalize_page(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => 1,
        Some(page) => page,
    }
}

/// Approximate page count for `total_rows` rows spread over
/// `distinct_sensors` series.
pub fn page_count(total_rows: usize, distinct_sensors: usize, page_size: u32) -> u32 {
    let virtual_rows = (total_rows / distinct_sensors.max(1)).max(1);
    virtual_rows.div_ceil(page_size as usize) as u32
}

/// Relative navigation links for one result page.
///
/// The canonical first-page URL carries no page parameter, so the
/// previous link is omitted entirely when it would point at page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl PageLinks {
    pub fn build(page: u32, pages: u32) -> Self {
        let next = (page < pages).then(|| format!("?page={}", page + 1));
        let previous = (page > 2).then(|| format!("?page={}", page - 1));
        Self { next, previous }
    }
}

/// Half-open row range covered by `page`, for slicing one series.
pub fn page_window(page: u32, page_size: u32) -> (usize, usize) {
    let start = (page as usize - 1) * page_size as usize;
    (start, start + page_size as usize)
}
