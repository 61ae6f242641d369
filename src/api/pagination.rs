// Page arithmetic and page-button rendering for list endpoints.

use serde::Serialize;

/// Rows per page.
pub const PER_PAGE: i64 = 10;

/// Page buttons shown at once.
pub const PAGE_WINDOW: i64 = 10;

/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / PER_PAGE;

/// One entry of the `pagination` array returned alongside a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageButton {
    pub num: i64,
    pub text: String,
    pub current: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    current_page: i64,
    total_rows: i64,
}

impl Pagination {
    /// `current_page` is 1-based and assumed to be at least 1.
    pub fn new(current_page: i64, total_rows: i64) -> Self {
        Self {
            current_page: current_page.max(1),
            total_rows: total_rows.max(0),
        }
    }

    pub fn limit(&self) -> i64 {
        PER_PAGE
    }

    pub fn offset(&self) -> i64 {
        (self.current_page - 1).saturating_mul(PER_PAGE)
    }

    pub fn total_pages(&self) -> i64 {
        self.total_rows / PER_PAGE + i64::from(self.total_rows % PER_PAGE != 0)
    }

    /// Buttons for the window containing the current page, with `«` and `»`
    /// jumping to the neighbouring windows when they exist.
    pub fn buttons(&self) -> Vec<PageButton> {
        let total_pages = self.total_pages();
        let window_start = (self.current_page - 1) / PAGE_WINDOW * PAGE_WINDOW + 1;
        let window_end = window_start.saturating_add(PAGE_WINDOW - 1).min(total_pages);

        let mut buttons = Vec::new();

        if window_start > 1 {
            buttons.push(PageButton {
                num: window_start - 1,
                text: "«".to_string(),
                current: false,
            });
        }

        for num in window_start..=window_end {
            buttons.push(PageButton {
                num,
                text: num.to_string(),
                current: num == self.current_page,
            });
        }

        if window_end < total_pages {
            buttons.push(PageButton {
                num: window_end + 1,
                text: "»".to_string(),
                current: false,
            });
        }

        buttons
    }
}
