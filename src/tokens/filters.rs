//! Escapers and token filters applied to substituted template values.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Escaping applied to every substituted value of a template, chosen by the
/// context the resolved string ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escaper {
    #[default]
    None,
    Url,
    Html,
}

impl Escaper {
    pub fn escape(self, value: &str) -> String {
        match self {
            Escaper::None => value.to_string(),
            Escaper::Url => url_encode(value),
            Escaper::Html => html_escape(value),
        }
    }
}

/// Percent-encode everything except the characters `encodeURIComponent`
/// leaves alone.
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.as_bytes() {
        let keep = matches!(b,
            b'a'..=b'z'
                | b'A'..=b'Z'
                | b'0'..=b'9'
                | b'-'
                | b'_'
                | b'.'
                | b'!'
                | b'~'
                | b'*'
                | b'\''
                | b'('
                | b')'
        );
        if keep {
            out.push(*b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap in double quotes, escaping backslashes and quotes (the `|s` filter).
pub fn quote(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for c in input.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

type FilterFn = Rc<dyn Fn(&str) -> String>;

/// Named filters usable as `$token|name$`.
///
/// `s`, `h`, `u` and `n` are always available; hosts can register more.
#[derive(Clone, Default)]
pub struct TokenFilters {
    custom: HashMap<String, FilterFn>,
}

impl TokenFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&str) -> String + 'static,
    {
        self.custom.insert(name.into(), Rc::new(filter));
    }

    /// Apply the filter called `name`. `n` is a no-op marker and returns the
    /// value unchanged. Returns `None` for unknown filters.
    pub fn apply(&self, name: &str, value: &str) -> Option<String> {
        match name {
            "s" => Some(quote(value)),
            "h" => Some(html_escape(value)),
            "u" => Some(url_encode(value)),
            "n" => Some(value.to_string()),
            _ => self.custom.get(name).map(|f| f(value)),
        }
    }
}

impl fmt::Debug for TokenFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("TokenFilters").field("custom", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("a b&c=d/e"), "a%20b%26c%3Dd%2Fe");
        assert_eq!(url_encode("safe-_.!~*'()"), "safe-_.!~*'()");
        assert_eq!(url_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_html_escape_and_quote() {
        assert_eq!(html_escape("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
        assert_eq!(quote(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn test_custom_filter() {
        let mut filters = TokenFilters::new();
        filters.register("upper", |v| v.to_uppercase());
        assert_eq!(filters.apply("upper", "abc").as_deref(), Some("ABC"));
        assert_eq!(filters.apply("nope", "abc"), None);
        assert_eq!(filters.apply("n", "a b").as_deref(), Some("a b"));
    }
}
