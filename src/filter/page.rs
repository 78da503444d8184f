use serde::Serialize;

/// Default and ceiling page sizes for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl PageLimits {
    pub const fn new(default_size: u32, max_size: u32) -> Self {
        Self {
            default_size,
            max_size,
        }
    }
}

pub mod limits {
    use super::PageLimits;

    pub const PARENT_APPOINTMENTS: PageLimits = PageLimits::new(20, 100);
    pub const ADMIN_APPOINTMENTS: PageLimits = PageLimits::new(10, 100);
    pub const TRAININGS: PageLimits = PageLimits::new(10, 50);
    pub const BOOKINGS: PageLimits = PageLimits::new(10, 50);
    pub const CASES: PageLimits = PageLimits::new(10, 50);
    pub const FORUM_POSTS: PageLimits = PageLimits::new(10, 50);
    pub const FORUM_REPLIES: PageLimits = PageLimits::new(20, 100);
    pub const DOCTORS: PageLimits = PageLimits::new(10, 50);
    pub const HEALTH_RECORDS: PageLimits = PageLimits::new(20, 100);
    pub const VIDEOS: PageLimits = PageLimits::new(20, 100);
}

/// A resolved, 1-based page with a clamped size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn resolve(page: Option<u32>, page_size: Option<u32>, limits: PageLimits) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(limits.default_size)
            .clamp(1, limits.max_size);
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    /// Cut one page out of an already ordered, fully materialised list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect()
    }
}

/// Paginated list envelope: `{items, total, page, pageSize}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
