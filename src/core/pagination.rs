use crate::utils::error::{ClientError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page requested from a listing endpoint (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(ClientError::validation("page size must be at least 1"));
        }
        Ok(Self {
            page: page.max(1),
            page_size,
        })
    }

    pub fn first(page_size: usize) -> Result<Self> {
        Self::new(1, page_size)
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ]
    }
}

/// Pagination summary for a result set of `total_count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total_count: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

impl Pagination {
    /// `total_pages = ceil(total_count / page_size)`; the requested page is
    /// clamped to `[1, max(1, total_pages)]`.
    pub fn new(total_count: usize, page_size: usize, requested_page: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(ClientError::validation("page size must be at least 1"));
        }

        let total_pages = total_count.div_ceil(page_size);
        let current_page = requested_page.clamp(1, total_pages.max(1));

        Ok(Self {
            total_count,
            page_size,
            total_pages,
            current_page,
        })
    }

    pub fn offset(&self) -> usize {
        (self.current_page - 1) * self.page_size
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Index range (1-based, inclusive) of the items shown on this page.
    pub fn item_range(&self) -> Option<(usize, usize)> {
        if self.total_count == 0 {
            return None;
        }
        let first = self.offset() + 1;
        let last = (self.offset() + self.page_size).min(self.total_count);
        Some((first, last))
    }
}

/// Slices a local array to one page.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Result<&[T]> {
    let pagination = Pagination::new(items.len(), page_size, page)?;
    let start = pagination.offset().min(items.len());
    let end = (start + page_size).min(items.len());
    Ok(&items[start..end])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageItem {
    Page(usize),
    Gap,
}

/// Page numbers for a pagination control: always the first and last page,
/// `width` pages on each side of `current`, and gaps in between.
pub fn page_window(current: usize, total: usize, width: usize) -> Vec<PageItem> {
    if total == 0 {
        return Vec::new();
    }

    let current = current.clamp(1, total);
    let low = current.saturating_sub(width).max(1);
    let high = (current + width).min(total);

    let mut items = Vec::new();
    if low > 1 {
        items.push(PageItem::Page(1));
        if low > 2 {
            items.push(PageItem::Gap);
        }
    }
    items.extend((low..=high).map(PageItem::Page));
    if high < total {
        if high < total - 1 {
            items.push(PageItem::Gap);
        }
        items.push(PageItem::Page(total));
    }
    items
}
