//! Page-number pagination.

/// One page of results.
///
/// Out-of-range page numbers are clamped to the last page and anything
/// unparseable reads as page 1.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Paginated<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        Self {
            items,
            page,
            per_page,
            total,
        }
    }

    #[must_use]
    pub const fn num_pages(&self) -> i64 {
        num_pages(self.total, self.per_page)
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.num_pages()
    }

    #[must_use]
    pub const fn previous_page(&self) -> i64 {
        if self.page > 1 { self.page - 1 } else { 1 }
    }

    #[must_use]
    pub const fn next_page(&self) -> i64 {
        if self.has_next() { self.page + 1 } else { self.page }
    }

    /// Page numbers for the pager links.
    #[must_use]
    pub fn page_range(&self) -> Vec<i64> {
        (1..=self.num_pages()).collect()
    }
}

/// One link in a pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub number: i64,
    pub url: String,
    pub current: bool,
}

/// Pager links for a paginated list.
///
/// `base` is the URL up to the query string separator, e.g. `/news?` or
/// `/news?tag=rice&`; the page number is appended to it.
#[derive(Debug, Clone, Default)]
pub struct PagerView {
    pub links: Vec<PageLink>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl PagerView {
    #[must_use]
    pub fn new<T>(page: &Paginated<T>, base: &str) -> Self {
        let url = |n: i64| format!("{base}page={n}");
        let links = if page.num_pages() > 1 {
            page.page_range()
                .into_iter()
                .map(|number| PageLink {
                    number,
                    url: url(number),
                    current: number == page.page,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            links,
            previous: page.has_previous().then(|| url(page.previous_page())),
            next: page.has_next().then(|| url(page.next_page())),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Number of pages, never less than one.
#[must_use]
pub const fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 1;
    }
    (total + per_page - 1) / per_page
}

/// Resolve a raw `?page=` value against the result count.
#[must_use]
pub fn resolve_page(raw: Option<&str>, total: i64, per_page: i64) -> i64 {
    let requested = raw.and_then(|p| p.trim().parse::<i64>().ok()).unwrap_or(1);
    requested.clamp(1, num_pages(total, per_page))
}

/// SQL `OFFSET` for a page.
#[must_use]
pub const fn offset(page: i64, per_page: i64) -> i64 {
    (page - 1) * per_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_pages() {
        assert_eq!(num_pages(0, 6), 1);
        assert_eq!(num_pages(6, 6), 1);
        assert_eq!(num_pages(7, 6), 2);
    }

    #[test]
    fn test_resolve_page_clamps() {
        assert_eq!(resolve_page(None, 30, 10), 1);
        assert_eq!(resolve_page(Some("2"), 30, 10), 2);
        assert_eq!(resolve_page(Some("99"), 30, 10), 3);
        assert_eq!(resolve_page(Some("-1"), 30, 10), 1);
        assert_eq!(resolve_page(Some("abc"), 30, 10), 1);
    }

    #[test]
    fn test_navigation() {
        let page: Paginated<u8> = Paginated::new(vec![], 2, 10, 25);
        assert_eq!(page.num_pages(), 3);
        assert!(page.has_previous());
        assert!(page.has_next());
        assert_eq!(page.previous_page(), 1);
        assert_eq!(page.next_page(), 3);
        assert_eq!(page.page_range(), vec![1, 2, 3]);
        assert_eq!(offset(2, 10), 10);
    }

    #[test]
    fn test_pager_view_links() {
        let page: Paginated<u8> = Paginated::new(vec![], 2, 6, 13);
        let pager = PagerView::new(&page, "/news?tag=rice&");
        assert_eq!(pager.links.len(), 3);
        assert!(pager.links.get(1).is_some_and(|l| l.current));
        assert_eq!(pager.previous.as_deref(), Some("/news?tag=rice&page=1"));
        assert_eq!(pager.next.as_deref(), Some("/news?tag=rice&page=3"));
    }

    #[test]
    fn test_pager_view_single_page_is_empty() {
        let page: Paginated<u8> = Paginated::new(vec![], 1, 6, 4);
        let pager = PagerView::new(&page, "/news?");
        assert!(pager.is_empty());
        assert!(pager.previous.is_none());
        assert!(pager.next.is_none());
    }
}
