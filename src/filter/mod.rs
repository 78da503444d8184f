pub mod keyword;
pub mod page;

pub use keyword::{contains_keyword, like_pattern, normalize_keyword};
pub use page::{limits, Page, PageLimits, PageRequest};
