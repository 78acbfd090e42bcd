//! Windowed page links for result-set navigation.

use serde::Serialize;

use crate::error::{Error, Result};

/// Role of a page link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Shortcut to page 1, shown when the window starts after it.
    First,
    /// A page inside the window.
    Page,
    /// Shortcut to the last page, shown when the window ends before it.
    Last,
}

/// One navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    /// Text shown for the link.
    pub label: String,
    /// Target URL.
    pub url: String,
    /// Page the link points at.
    pub page: usize,
    /// Role of the link.
    pub kind: LinkKind,
}

/// A window of page links around the current page.
///
/// When all pages fit in the window every page is listed. Otherwise the
/// window starts `window / 2` pages before the current page, clamped to the
/// first page, and ends `window - 1` pages later, clamped to the last page.
/// A leading shortcut to page 1 is added when the current page is past the
/// first, and a trailing shortcut to the last page when the current page is
/// before the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    current: usize,
    total: usize,
    base_url: String,
    param: String,
    window: usize,
}

impl PageLinks {
    /// Validate a link request.
    pub fn new(
        current: usize,
        total: usize,
        base_url: impl Into<String>,
        param: impl Into<String>,
        window: usize,
    ) -> Result<Self> {
        let param = param.into();
        if window == 0 {
            return Err(Error::InvalidArgument("link window must be positive".into()));
        }
        if current == 0 {
            return Err(Error::InvalidArgument("current page must be positive".into()));
        }
        if total > 0 && current > total {
            return Err(Error::InvalidArgument(format!(
                "current page {current} is past the last page {total}"
            )));
        }
        if param.is_empty() {
            return Err(Error::InvalidArgument("page parameter name is empty".into()));
        }
        Ok(Self {
            current,
            total,
            base_url: base_url.into(),
            param,
            window,
        })
    }

    /// First and last page inside the window, or `None` when there are no
    /// pages.
    pub fn window_bounds(&self) -> Option<(usize, usize)> {
        if self.total == 0 {
            return None;
        }
        if self.total <= self.window {
            return Some((1, self.total));
        }
        let start = self.current.saturating_sub(self.window / 2).max(1);
        let end = (start + self.window - 1).min(self.total);
        Some((start, end))
    }

    /// URL of a page.
    pub fn url_for(&self, page: usize) -> String {
        let separator = if !self.base_url.contains('?') {
            "?"
        } else if self.base_url.ends_with('?') || self.base_url.ends_with('&') {
            ""
        } else {
            "&"
        };
        format!("{}{}{}={}", self.base_url, separator, self.param, page)
    }

    /// Render the links in display order.
    pub fn links(&self) -> Vec<PageLink> {
        let Some((start, end)) = self.window_bounds() else {
            return Vec::new();
        };

        let mut links = Vec::with_capacity(end - start + 3);
        if self.current > 1 {
            links.push(self.link("First".into(), 1, LinkKind::First));
        }
        for page in start..=end {
            links.push(self.link(page.to_string(), page, LinkKind::Page));
        }
        if self.current < self.total {
            links.push(self.link("Last".into(), self.total, LinkKind::Last));
        }
        links
    }

    fn link(&self, label: String, page: usize, kind: LinkKind) -> PageLink {
        PageLink {
            label,
            url: self.url_for(page),
            page,
            kind,
        }
    }
}

/// Build page links in one call.
pub fn page_links(
    current: usize,
    total: usize,
    base_url: &str,
    param: &str,
    window: usize,
) -> Result<Vec<PageLink>> {
    Ok(PageLinks::new(current, total, base_url, param, window)?.links())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(links: &[PageLink]) -> Vec<usize> {
        links
            .iter()
            .filter(|l| l.kind == LinkKind::Page)
            .map(|l| l.page)
            .collect()
    }

    #[test]
    fn test_all_pages_fit() {
        let links = page_links(2, 3, "/people", "page", 10).unwrap();
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].kind, LinkKind::First);
        assert_eq!(pages(&links), vec![1, 2, 3]);
        assert_eq!(links[4].kind, LinkKind::Last);
        assert_eq!(links[4].page, 3);
    }

    #[test]
    fn test_window_clamped_at_start() {
        let links = page_links(1, 30, "/people", "page", 6).unwrap();
        assert_eq!(links.len(), 7);
        assert_eq!(pages(&links), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(links.last().unwrap().kind, LinkKind::Last);
    }

    #[test]
    fn test_window_clamped_at_end() {
        let links = page_links(30, 30, "/people", "page", 6).unwrap();
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].kind, LinkKind::First);
        assert_eq!(pages(&links), vec![27, 28, 29, 30]);
    }

    #[test]
    fn test_window_in_middle() {
        let links = page_links(2, 30, "/people", "page", 10).unwrap();
        assert_eq!(links.len(), 12);
        assert_eq!(pages(&links), (1..=10).collect::<Vec<_>>());

        let links = page_links(2, 30, "/people", "page", 6).unwrap();
        assert_eq!(links.len(), 8);

        let links = page_links(15, 30, "/people", "page", 6).unwrap();
        assert_eq!(pages(&links), vec![12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn test_single_page() {
        let links = page_links(1, 1, "/people", "page", 10).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "1");
        assert_eq!(links[0].url, "/people?page=1");
    }

    #[test]
    fn test_no_pages() {
        assert!(page_links(1, 0, "/people", "page", 10).unwrap().is_empty());
    }

    #[test]
    fn test_separator() {
        let links = PageLinks::new(1, 1, "/people?sort=name", "p", 10).unwrap();
        assert_eq!(links.url_for(2), "/people?sort=name&p=2");

        let links = PageLinks::new(1, 1, "/people?", "p", 10).unwrap();
        assert_eq!(links.url_for(2), "/people?p=2");
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(page_links(1, 3, "/", "page", 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(page_links(0, 3, "/", "page", 5), Err(Error::InvalidArgument(_))));
        assert!(matches!(page_links(4, 3, "/", "page", 5), Err(Error::InvalidArgument(_))));
        assert!(matches!(page_links(1, 3, "/", "", 5), Err(Error::InvalidArgument(_))));
    }
}
