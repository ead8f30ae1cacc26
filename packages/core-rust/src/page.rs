//! Pagination state and materialized result pages.

use thiserror::Error;

/// Rejected page navigation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("page {requested} is out of range (1..={total_pages})")]
pub struct PageError {
    pub requested: u32,
    pub total_pages: u32,
}

/// Page position of one view.
///
/// `page_size` is fixed when the view is created. `page` is 1-based and is
/// kept within `1..=total_pages()` whenever `total` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page: u32,
    page_size: u32,
    total: u64,
}

impl PageState {
    /// A fresh state on page 1 with nothing loaded yet.
    ///
    /// A zero `page_size` is raised to 1.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total: 0,
        }
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of pages for the current total; never less than 1.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.page_size)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Moves to page 1.
    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Moves to page `n` if it exists.
    ///
    /// # Errors
    ///
    /// Returns `PageError` when `n` is 0 or past the last page. The state is
    /// left unchanged.
    pub fn goto(&mut self, n: u32) -> Result<(), PageError> {
        let total_pages = self.total_pages();
        if n == 0 || n > total_pages {
            return Err(PageError {
                requested: n,
                total_pages,
            });
        }
        self.page = n;
        Ok(())
    }

    /// Records a new total and clamps the page into range.
    ///
    /// Returns `true` when the page index had to move.
    pub fn set_total(&mut self, total: u64) -> bool {
        self.total = total;
        let last = self.total_pages();
        if self.page > last {
            self.page = last;
            true
        } else {
            false
        }
    }

    /// Zero-based offset of the first item on the current page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// The currently displayed page of items.
///
/// Replaced wholesale on every applied fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> ResultSet<T> {
    /// An empty result for a view that has not loaded yet.
    #[must_use]
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.page_size.max(1));
        u32::try_from(self.total.div_ceil(size).max(1)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
