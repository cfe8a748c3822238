//! Pagination helper types for song queries

use serde::{Deserialize, Serialize};

/// Pagination request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Current page number (0-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl PageRequest {
    /// Create a new page request
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::PageRequest;
    ///
    /// let request = PageRequest::new(2, 20);
    /// assert_eq!(request.offset(), 40);
    /// assert_eq!(request.limit(), 20);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Number of items to skip
    pub fn offset(&self) -> usize {
        self.page as usize * self.page_size as usize
    }

    /// Get the limit value (same as page_size)
    pub fn limit(&self) -> usize {
        self.page_size as usize
    }

    /// The page containing item `offset` for a window of `limit` items.
    pub fn from_window(offset: usize, limit: usize) -> Self {
        let page = if limit == 0 { 0 } else { offset / limit };
        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            page_size: u32::try_from(limit).unwrap_or(u32::MAX),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 50,
        }
    }
}

/// Paginated response containing items and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Position of the first item within all `total` items
    pub offset: u64,
    /// Current page number
    pub page: u32,
    /// Total number of pages
    pub total_pages: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Create a new paginated response
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::{Page, PageRequest};
    ///
    /// let page = Page::new(vec![1, 2, 3], 25, PageRequest::new(0, 10));
    /// assert_eq!(page.total_pages, 3);
    /// assert!(page.has_next());
    /// ```
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            total.div_ceil(request.page_size as u64) as u32
        };

        Self {
            items,
            total,
            offset: request.offset() as u64,
            page: request.page,
            total_pages,
            page_size: request.page_size,
        }
    }

    /// Page for an arbitrary `offset`/`limit` window.
    ///
    /// `page` names the page holding `offset`; the bounds checks use the
    /// window itself, so they stay exact when `offset` is not page-aligned.
    pub fn window(items: Vec<T>, total: u64, offset: usize, limit: usize) -> Self {
        Self {
            offset: offset as u64,
            ..Self::new(items, total, PageRequest::from_window(offset, limit))
        }
    }

    /// Check if items follow this window
    pub fn has_next(&self) -> bool {
        self.offset + (self.items.len() as u64) < self.total
    }

    /// Check if items precede this window
    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}
