//! Link navigation: URL classification, page-relative rewriting, and the
//! sink that actually moves the browser.

use std::cell::RefCell;

/// Where a resolved link goes.
pub trait Navigator {
    fn navigate(&self, url: &str, new_window: bool, target: Option<&str>);
}

impl<F> Navigator for F
where
    F: Fn(&str, bool, Option<&str>),
{
    fn navigate(&self, url: &str, new_window: bool, target: Option<&str>) {
        self(url, new_window, target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub url: String,
    pub new_window: bool,
    pub target: Option<String>,
}

/// Navigator that only remembers where it was asked to go.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: RefCell<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Navigation> {
        self.visits.borrow().clone()
    }

    pub fn take(&self) -> Vec<Navigation> {
        std::mem::take(&mut *self.visits.borrow_mut())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str, new_window: bool, target: Option<&str>) {
        self.visits.borrow_mut().push(Navigation {
            url: url.to_string(),
            new_window,
            target: target.map(str::to_string),
        });
    }
}

/// The page the dashboard is rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Application mount point, e.g. `/` or `/splunk`.
    pub url_root: String,
    pub locale: Option<String>,
    /// Current page location.
    pub location: String,
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            url_root: "/".to_string(),
            locale: Some("en-US".to_string()),
            location: String::new(),
        }
    }
}

impl PageContext {
    /// Build an application URL for a server-relative path:
    /// `<root>/<locale><path>`.
    pub fn make_url(&self, path: &str) -> String {
        let root = self.url_root.trim_end_matches('/');
        match &self.locale {
            Some(locale) if !locale.is_empty() => format!("{}/{}{}", root, locale, path),
            _ => format!("{}{}", root, path),
        }
    }

    /// Dashboards opened in the editor live one path segment deeper.
    pub fn is_edit_mode(&self) -> bool {
        self.location.ends_with("/edit")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// `/app/search`
    ServerRelative,
    /// `//cdn.example.com/x`
    ProtocolRelative,
    /// `http://...` or `https://...`
    Absolute,
    /// Anything else, e.g. `search?q=1`.
    Relative,
}

pub fn classify(url: &str) -> UrlKind {
    if url.starts_with("//") {
        UrlKind::ProtocolRelative
    } else if url.starts_with('/') {
        UrlKind::ServerRelative
    } else if url.starts_with("http://") || url.starts_with("https://") {
        UrlKind::Absolute
    } else {
        UrlKind::Relative
    }
}

/// Rewrite a resolved link for the current page. Server-relative links get
/// the application root; plain relative links gain a `../` in edit mode.
pub fn rewrite_link(url: &str, page: &PageContext) -> String {
    match classify(url) {
        UrlKind::ServerRelative => page.make_url(url),
        UrlKind::Relative if page.is_edit_mode() => format!("../{}", url),
        UrlKind::Relative | UrlKind::Absolute | UrlKind::ProtocolRelative => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(location: &str) -> PageContext {
        PageContext {
            url_root: "/splunk/".to_string(),
            locale: Some("en-US".to_string()),
            location: location.to_string(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("/app/search"), UrlKind::ServerRelative);
        assert_eq!(classify("//cdn.example.com/a"), UrlKind::ProtocolRelative);
        assert_eq!(classify("https://example.com"), UrlKind::Absolute);
        assert_eq!(classify("http://example.com"), UrlKind::Absolute);
        assert_eq!(classify("ftp://example.com"), UrlKind::Relative);
        assert_eq!(classify("search?q=1"), UrlKind::Relative);
    }

    #[test]
    fn test_rewrite_server_relative_uses_root_and_locale() {
        let p = page("/splunk/en-US/app/search/overview");
        assert_eq!(
            rewrite_link("/app/search/flashtimeline?q=x", &p),
            "/splunk/en-US/app/search/flashtimeline?q=x"
        );
        let bare = PageContext {
            url_root: "/".to_string(),
            locale: None,
            location: String::new(),
        };
        assert_eq!(rewrite_link("/app/x", &bare), "/app/x");
    }

    #[test]
    fn test_rewrite_relative_only_in_edit_mode() {
        assert_eq!(rewrite_link("details", &page("/app/search/overview")), "details");
        assert_eq!(
            rewrite_link("details", &page("/app/search/overview/edit")),
            "../details"
        );
        assert_eq!(
            rewrite_link("https://example.com", &page("/app/search/overview/edit")),
            "https://example.com"
        );
        assert_eq!(
            rewrite_link("//example.com/x", &page("/app/search/overview/edit")),
            "//example.com/x"
        );
    }

    #[test]
    fn test_closure_navigator() {
        let seen = RefCell::new(Vec::new());
        let nav = |url: &str, new_window: bool, _: Option<&str>| {
            seen.borrow_mut().push((url.to_string(), new_window))
        };
        nav.navigate("/x", true, None);
        assert_eq!(*seen.borrow(), vec![("/x".to_string(), true)]);
    }
}
