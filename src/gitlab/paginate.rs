//! Cursor-pagination aggregator.
//!
//! Drives an injected single-page fetch capability until the service reports
//! no further pages or the page cap is reached, concatenating node lists in
//! fetch order. Pages are fetched strictly one at a time since each page's
//! cursor comes from the previous result.

use std::future::Future;

use tracing::warn;

use super::error::FetchError;
use super::queries::PageInfo;

/// Default page cap per aggregation.
pub const DEFAULT_MAX_PAGES: u32 = 4;

/// Result shapes the aggregator can drive.
pub trait Paged {
    /// Cursor info for the page, if the payload carries a connection.
    fn page_info(&self) -> Option<&PageInfo>;

    /// Append `next`'s nodes onto this payload and adopt its cursor info.
    /// A side with no connection is treated as empty.
    fn merge(&mut self, next: Self);
}

/// Fetch up to `max_pages` pages and merge them into one result.
///
/// `fetch_page` is invoked with the cursor for each page: `initial_cursor`
/// first, then each page's `end_cursor`. A page without cursor info ends the
/// loop, as does a page claiming a next page without an `end_cursor` (such a
/// cursor cannot advance). The first fetch failure propagates unchanged and
/// no partial result is returned. `Ok(None)` only occurs when `max_pages`
/// is zero.
pub async fn fetch_paginated<D, F, Fut>(
    initial_cursor: Option<String>,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<Option<D>, FetchError>
where
    D: Paged,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<D, FetchError>>,
{
    let mut cursor = initial_cursor;
    let mut has_next_page = true;
    let mut accumulated: Option<D> = None;
    let mut page: u32 = 1;

    while has_next_page && page <= max_pages {
        let page_result = fetch_page(cursor.clone()).await?;

        (has_next_page, cursor) = match page_result.page_info() {
            Some(info) => (info.has_next_page, info.end_cursor.clone()),
            None => (false, None),
        };
        if has_next_page && cursor.is_none() {
            warn!(page, "Page reported a next page without an end cursor, stopping");
            has_next_page = false;
        }

        accumulated = match accumulated {
            None => Some(page_result),
            Some(mut merged) => {
                merged.merge(page_result);
                Some(merged)
            }
        };

        page += 1;
    }

    Ok(accumulated)
}

// ============================================================================
// Tests
// ============================================================================
