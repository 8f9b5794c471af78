//! Pagination presentation model.

use crate::config::QueryConfig;

/// One slot in the rendered pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// A clickable page number.
    Page(u32),
    /// A non-interactive gap marker.
    Ellipsis,
}

/// Number of pages needed for `total_items` at `per_page`.
pub fn total_pages(total_items: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    total_items.div_ceil(per_page as u64) as u32
}

/// Build the page list for the pagination control.
///
/// First and last pages are always shown, with a contiguous window of
/// `QueryConfig::PAGE_WINDOW` pages on each side of the current page; any
/// gap collapses into a single ellipsis. With one page or fewer there is
/// nothing to paginate and the list is empty.
pub fn page_items(current: u32, total: u32) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }

    let window = QueryConfig::PAGE_WINDOW;
    let low = current.saturating_sub(window).max(1);
    let high = current.saturating_add(window).min(total);

    let mut items = Vec::new();

    if low > 1 {
        items.push(PageItem::Page(1));
        if low > 2 {
            items.push(PageItem::Ellipsis);
        }
    }

    for page in low..=high {
        items.push(PageItem::Page(page));
    }

    if high < total {
        if high < total - 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(total));
    }

    items
}
