pub mod engine;
pub mod paginate;
pub mod query;

pub use engine::{HistoryEngine, HistoryGroups, HistoryPage, Point};
pub use paginate::{clamp_page_size, normalize_page, PageLinks, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use query::{GroupBy, HistoryQuery};
