//! Page-number pagination shared by the listing and search flows.

use thiserror::Error;

const DEFAULT_PAGE_TOKEN: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("invalid requested page `{0}`")]
    InvalidPage(String),
    #[error("page size must be greater than zero")]
    InvalidSize,
}

/// Requested page resolved against the number of items actually available.
///
/// Built from an unvalidated page token, then fed the real item count exactly
/// once after the store query returns. Until then `pages_count` is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    requested_page: u64,
    real_page: u64,
    size: u32,
    pages_count: u64,
}

impl Paginator {
    /// Parse `raw_page` (empty means the first page) for pages of `size` items.
    pub fn new(raw_page: &str, size: u32) -> Result<Self, PaginationError> {
        if size < 1 {
            return Err(PaginationError::InvalidSize);
        }

        let token = if raw_page.is_empty() {
            DEFAULT_PAGE_TOKEN
        } else {
            raw_page
        };
        let requested_page = match token.parse::<u64>() {
            Ok(page) if page >= 1 => page,
            _ => return Err(PaginationError::InvalidPage(raw_page.to_string())),
        };

        Ok(Self {
            requested_page,
            real_page: requested_page,
            size,
            pages_count: 0,
        })
    }

    /// Clamp the effective page into `[1, pages_count]` for `total` items.
    ///
    /// An empty result set still reports page 1 of 1.
    pub fn apply_total_count(&mut self, total: u64) {
        if total == 0 {
            self.pages_count = 1;
            self.real_page = 1;
            return;
        }

        self.pages_count = total.div_ceil(u64::from(self.size));

        if self.real_page > self.pages_count {
            self.real_page = self.pages_count;
        }
        if self.real_page < 1 {
            self.real_page = 1;
        }
    }

    pub fn needs_redirect(&self) -> bool {
        self.requested_page != self.real_page
    }

    pub fn page(&self) -> u64 {
        self.real_page
    }

    pub fn pages_count(&self) -> u64 {
        self.pages_count
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of items preceding the effective page.
    pub fn offset(&self) -> u64 {
        (self.real_page - 1).saturating_mul(u64::from(self.size))
    }

    pub fn previous_page(&self) -> Option<u64> {
        (self.real_page > 1).then(|| self.real_page - 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        (self.real_page < self.pages_count).then(|| self.real_page + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_paginator_keeps_requested_page() {
        let paginator = Paginator::new("2", 10).expect("valid paginator");
        assert_eq!(paginator.page(), 2);
        assert_eq!(paginator.size(), 10);
        assert_eq!(paginator.pages_count(), 0);
        assert!(!paginator.needs_redirect());
    }

    #[test]
    fn empty_token_defaults_to_first_page() {
        let paginator = Paginator::new("", 5).expect("valid paginator");
        assert_eq!(paginator.page(), 1);
    }

    #[test]
    fn rejects_invalid_page_tokens() {
        for token in ["0", "-1", "x", "first", "1.5", " 2"] {
            let err = Paginator::new(token, 5).expect_err("invalid token");
            assert_eq!(err, PaginationError::InvalidPage(token.to_string()));
        }
    }

    #[test]
    fn accepts_pages_beyond_u32_and_clamps_them() {
        let mut paginator = Paginator::new("4294967296", 4).expect("valid paginator");
        assert_eq!(paginator.page(), 4_294_967_296);

        paginator.apply_total_count(9);
        assert_eq!(paginator.page(), 3);
        assert!(paginator.needs_redirect());
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let paginator = Paginator::new(&u64::MAX.to_string(), 4).expect("valid paginator");
        assert_eq!(paginator.offset(), u64::MAX);

        let err = Paginator::new("18446744073709551616", 4).expect_err("beyond u64");
        assert!(matches!(err, PaginationError::InvalidPage(_)));
    }

    #[test]
    fn rejects_zero_size() {
        let err = Paginator::new("1", 0).expect_err("invalid size");
        assert_eq!(err, PaginationError::InvalidSize);
    }

    #[test]
    fn clamps_page_beyond_last() {
        let mut paginator = Paginator::new("5", 3).expect("valid paginator");
        paginator.apply_total_count(10);
        assert_eq!(paginator.pages_count(), 4);
        assert_eq!(paginator.page(), 4);
        assert!(paginator.needs_redirect());
    }

    #[test]
    fn zero_items_report_single_page() {
        let mut paginator = Paginator::new("5", 10).expect("valid paginator");
        paginator.apply_total_count(0);
        assert_eq!(paginator.page(), 1);
        assert_eq!(paginator.pages_count(), 1);
        assert!(paginator.needs_redirect());
    }

    #[test]
    fn page_within_range_is_kept() {
        let mut paginator = Paginator::new("2", 5).expect("valid paginator");
        paginator.apply_total_count(20);
        assert_eq!(paginator.pages_count(), 4);
        assert_eq!(paginator.page(), 2);
        assert!(!paginator.needs_redirect());
        assert_eq!(paginator.offset(), 5);
        assert_eq!(paginator.previous_page(), Some(1));
        assert_eq!(paginator.next_page(), Some(3));
    }

    #[test]
    fn first_page_of_sixteen_items() {
        let mut paginator = Paginator::new("1", 5).expect("valid paginator");
        paginator.apply_total_count(16);
        assert_eq!(paginator.pages_count(), 4);
        assert_eq!(paginator.page(), 1);
        assert!(!paginator.needs_redirect());
        assert_eq!(paginator.offset(), 0);
        assert_eq!(paginator.previous_page(), None);
    }

    #[test]
    fn applying_the_same_total_twice_is_stable() {
        let mut paginator = Paginator::new("9", 4).expect("valid paginator");
        paginator.apply_total_count(10);
        let first = paginator.clone();
        paginator.apply_total_count(10);
        assert_eq!(paginator, first);
    }

    #[test]
    fn pages_count_and_clamp_hold_across_sizes_and_totals() {
        for size in 1..=7u32 {
            for total in 0..=50u64 {
                for requested in 1..=12u64 {
                    let mut paginator =
                        Paginator::new(&requested.to_string(), size).expect("valid paginator");
                    paginator.apply_total_count(total);

                    let expected_pages = total.div_ceil(u64::from(size)).max(1);
                    assert_eq!(paginator.pages_count(), expected_pages);
                    assert!(paginator.page() >= 1);
                    assert!(paginator.page() <= paginator.pages_count());

                    if requested > expected_pages {
                        assert!(paginator.needs_redirect());
                        assert_eq!(paginator.page(), expected_pages);
                    } else {
                        assert!(!paginator.needs_redirect());
                        assert_eq!(paginator.page(), requested);
                    }
                }
            }
        }
    }
}
