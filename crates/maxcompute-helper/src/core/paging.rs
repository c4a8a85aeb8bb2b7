//! Sequential traversal of remote listings that are served one page at a time.
//!
//! A page fetcher is called with a 1-based page number and the clamped page
//! size and answers with the items of that page plus the total item count.
//! Pages are requested strictly in order, one at a time; any fetch error
//! aborts the traversal and is returned as is.

use crate::core::limits::{clamp_page_size, page_count};
use crate::error::{AppError, AppResult};

/// One page returned by a page fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

/// Fetches every page and hands each non-empty one to `on_page`, in page order.
///
/// The page count is derived from the total reported by page 1. An error from
/// either `fetch` or `on_page` stops the traversal.
pub fn for_each_page<T, F, C>(page_size: Option<i64>, mut fetch: F, mut on_page: C) -> AppResult<()>
where
    F: FnMut(u32, u32) -> AppResult<Page<T>>,
    C: FnMut(Vec<T>) -> AppResult<()>,
{
    let size = clamp_page_size(page_size);
    let first = fetch(1, size)?;
    let pages = last_page(first.total, size)?;
    tracing::debug!(page = 1, size, total = first.total, pages, "fetched page");

    if !first.items.is_empty() {
        on_page(first.items)?;
    }
    if pages <= 1 {
        return Ok(());
    }

    for page in 2..=pages {
        let next = fetch(page, size)?;
        tracing::debug!(page, size, items = next.items.len(), "fetched page");
        if !next.items.is_empty() {
            on_page(next.items)?;
        }
    }
    Ok(())
}

/// Number of the last page, which must be addressable by the fetcher.
fn last_page(total: u64, size: u32) -> AppResult<u32> {
    let pages = page_count(total, size);
    u32::try_from(pages).map_err(|_| {
        AppError::Internal(format!("listing reports {total} items, {pages} pages of {size}"))
    })
}

/// Same traversal as [`for_each_page`], accumulated into one list.
pub fn collect_pages<T, F>(page_size: Option<i64>, mut fetch: F) -> AppResult<Vec<T>>
where
    F: FnMut(u32, u32) -> AppResult<Page<T>>,
{
    let size = clamp_page_size(page_size);
    let Page { mut items, total } = fetch(1, size)?;
    let pages = last_page(total, size)?;
    tracing::debug!(page = 1, size, total, pages, "fetched page");
    if pages <= 1 {
        return Ok(items);
    }

    for page in 2..=pages {
        let next = fetch(page, size)?;
        tracing::debug!(page, size, items = next.items.len(), "fetched page");
        items.extend(next.items);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    /// Serves `0..n` in pages and records which pages were requested.
    struct Listing {
        items: Vec<u32>,
        requested: Vec<(u32, u32)>,
    }

    impl Listing {
        fn new(n: u32) -> Self {
            Self {
                items: (0..n).collect(),
                requested: Vec::new(),
            }
        }

        fn fetch(&mut self, page: u32, size: u32) -> AppResult<Page<u32>> {
            self.requested.push((page, size));
            let start = ((page - 1) * size) as usize;
            let items = self
                .items
                .iter()
                .skip(start)
                .take(size as usize)
                .copied()
                .collect();
            Ok(Page::new(items, self.items.len() as u64))
        }
    }

    #[test]
    fn callback_runs_once_per_page_in_order() {
        for (n, size) in [(0u32, 10i64), (1, 10), (10, 10), (25, 10), (7, 3), (100, 1), (250, 100)] {
            let mut listing = Listing::new(n);
            let mut calls = 0;
            let mut seen = Vec::new();
            for_each_page(
                Some(size),
                |p, s| listing.fetch(p, s),
                |items| {
                    calls += 1;
                    seen.extend(items);
                    Ok(())
                },
            )
            .unwrap();

            let expected_calls = (n as u64).div_ceil(size as u64);
            assert_eq!(calls as u64, expected_calls, "n={n} size={size}");
            assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn pages_are_requested_sequentially_with_clamped_size() {
        let mut listing = Listing::new(250);
        for_each_page(Some(500), |p, s| listing.fetch(p, s), |_| Ok(())).unwrap();
        assert_eq!(listing.requested, vec![(1, 100), (2, 100), (3, 100)]);
    }

    #[test]
    fn empty_later_page_is_skipped() {
        let mut calls = Vec::new();
        for_each_page(
            Some(2),
            |page, _| {
                // Total claims 6 items but page 2 comes back empty.
                let items = if page == 2 { vec![] } else { vec![page, page] };
                Ok(Page::new(items, 6))
            },
            |items| {
                calls.push(items);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(calls, vec![vec![1, 1], vec![3, 3]]);
    }

    #[test]
    fn fetch_error_aborts_without_further_requests() {
        let mut requested = Vec::new();
        let mut delivered = 0;
        let err = for_each_page(
            Some(1),
            |page, _| {
                requested.push(page);
                if page == 2 {
                    Err(AppError::SqlExec("boom".into()))
                } else {
                    Ok(Page::new(vec![page], 5))
                }
            },
            |_| {
                delivered += 1;
                Ok(())
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "MAX_COMPUTE_SQL_EXEC_ERR");
        assert_eq!(requested, vec![1, 2]);
        assert_eq!(delivered, 1);
    }

    #[test]
    fn consumer_error_stops_traversal() {
        let mut requested = 0;
        let err = for_each_page(
            Some(1),
            |page, _| {
                requested += 1;
                Ok(Page::new(vec![page], 3))
            },
            |_| Err(AppError::Internal("stop".into())),
        )
        .unwrap_err();
        assert_eq!(err.code(), "SYSTEM_INNER_ERR");
        assert_eq!(requested, 1);
    }

    #[test]
    fn oversized_total_is_rejected_before_delivery() {
        let mut requested = 0;
        let mut calls = 0;
        let err = for_each_page(
            Some(1),
            |_, _| {
                requested += 1;
                Ok(Page::new(vec![1u8], u64::MAX))
            },
            |_| {
                calls += 1;
                Ok(())
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "SYSTEM_INNER_ERR");
        assert_eq!((requested, calls), (1, 0));

        let mut requested = 0;
        let err = collect_pages(Some(1), |_, _| {
            requested += 1;
            Ok(Page::new(vec![1u8], u64::from(u32::MAX) + 1))
        })
        .unwrap_err();
        assert_eq!(err.code(), "SYSTEM_INNER_ERR");
        assert_eq!(requested, 1);
    }

    #[test]
    fn collect_concatenates_all_pages() {
        let mut listing = Listing::new(23);
        let all = collect_pages(Some(5), |p, s| listing.fetch(p, s)).unwrap();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
        assert_eq!(listing.requested.len(), 5);
    }

    #[test]
    fn collect_respects_clamped_page_size() {
        let mut listing = Listing::new(4);
        let all = collect_pages(None, |p, s| listing.fetch(p, s)).unwrap();
        // A missing hint clamps to one item per page.
        assert_eq!(all, vec![0, 1, 2, 3]);
        assert_eq!(listing.requested.len(), 4);

        let mut listing = Listing::new(4);
        let all = collect_pages(Some(100), |p, s| listing.fetch(p, s)).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(listing.requested, vec![(1, 100)]);
    }
}
