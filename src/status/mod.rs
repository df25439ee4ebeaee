pub mod cache;
pub mod entry;
pub mod manager;
pub mod parse;

pub use cache::StatusCache;
pub use entry::{FileStatusEntry, StatusCode};
pub use manager::{GitStatusSummary, StatusEvent, StatusManager};
pub use parse::{PorcelainItem, expand_directories, parse_porcelain};
