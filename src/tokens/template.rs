//! `$token$` template resolution.
//!
//! Syntax:
//! - `$name$` is replaced by the value of `name`, or nothing when absent.
//! - `$name|f1|f2$` pipes the value through the named filters instead of the
//!   context escaper.
//! - `$$` is a literal `$`.
//! - A `$` without a closing `$`, or enclosing whitespace, is literal text.
//!
//! Only substituted values are ever escaped.

use super::filters::{Escaper, TokenFilters};
use super::source::ValueSource;

enum Segment<'a> {
    Literal(&'a str),
    Dollar,
    Token { name: &'a str, filters: Vec<&'a str> },
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('$') {
        if start > 0 {
            out.push(Segment::Literal(&rest[..start]));
        }
        let after = &rest[start + 1..];
        let Some(end) = after.find('$') else {
            out.push(Segment::Literal(&rest[start..]));
            return out;
        };
        let inner = &after[..end];
        if inner.is_empty() {
            out.push(Segment::Dollar);
            rest = &after[end + 1..];
        } else if inner.chars().any(char::is_whitespace) {
            // Not a placeholder; the closing `$` may still open one.
            out.push(Segment::Literal("$"));
            rest = after;
        } else {
            let mut parts = inner.split('|');
            let name = parts.next().unwrap_or_default();
            let filters = parts.filter(|p| !p.is_empty()).collect();
            out.push(Segment::Token { name, filters });
            rest = &after[end + 1..];
        }
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    out
}

/// Resolve `template` against `source` with the built-in filters only.
pub fn resolve(template: &str, source: &ValueSource, escaper: Escaper) -> String {
    resolve_with_filters(template, source, escaper, &TokenFilters::default())
}

/// Resolve `template` against `source`, escaping substituted values with
/// `escaper` unless a placeholder names its own filters.
pub fn resolve_with_filters(
    template: &str,
    source: &ValueSource,
    escaper: Escaper,
    filters: &TokenFilters,
) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Dollar => out.push('$'),
            Segment::Token {
                name,
                filters: names,
            } => {
                let value = source.render(name).unwrap_or_default();
                if names.is_empty() {
                    out.push_str(&escaper.escape(&value));
                    continue;
                }
                let mut value = value;
                for filter in names {
                    match filters.apply(filter, &value) {
                        Some(filtered) => value = filtered,
                        None => tracing::debug!(token = name, filter, "ignoring unknown token filter"),
                    }
                }
                out.push_str(&value);
            }
        }
    }
    out
}

/// Names of every token referenced by `template`, in order of appearance.
pub fn token_names(template: &str) -> Vec<&str> {
    segments(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Token { name, .. } => Some(name),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> ValueSource {
        let mut s = ValueSource::new();
        for (k, v) in pairs {
            s.insert(*k, *v);
        }
        s
    }

    #[test]
    fn test_simple_substitution() {
        let s = source(&[("x", "v")]);
        assert_eq!(resolve("$x$", &s, Escaper::None), "v");
        assert_eq!(resolve("a=$x$;b=$x$", &s, Escaper::None), "a=v;b=v");
    }

    #[test]
    fn test_missing_token_is_empty() {
        assert_eq!(resolve("$missing$", &ValueSource::new(), Escaper::None), "");
        assert_eq!(resolve("[$missing$]", &ValueSource::new(), Escaper::Url), "[]");
    }

    #[test]
    fn test_literal_text_never_escaped() {
        let s = source(&[("q", "a b&c")]);
        assert_eq!(
            resolve("/app/search?q=$q$&x=1 2", &s, Escaper::Url),
            "/app/search?q=a%20b%26c&x=1 2"
        );
        let s = source(&[("v", "<i>")]);
        assert_eq!(resolve("<b>$v$</b>", &s, Escaper::Html), "<b>&lt;i&gt;</b>");
    }

    #[test]
    fn test_dollar_escapes_and_unclosed() {
        let s = source(&[("x", "v")]);
        assert_eq!(resolve("cost: $$5", &s, Escaper::None), "cost: $5");
        assert_eq!(resolve("$x$ costs $", &s, Escaper::None), "v costs $");
        assert_eq!(resolve("$ not a token $x$", &s, Escaper::None), "$ not a token v");
    }

    #[test]
    fn test_explicit_filters_replace_context_escaper() {
        let s = source(&[("v", "a \"b\"")]);
        assert_eq!(resolve("q=$v|s$", &s, Escaper::None), r#"q="a \"b\"""#);
        assert_eq!(resolve("$v|n$", &s, Escaper::Url), "a \"b\"");
        assert_eq!(resolve("$v|s|u$", &s, Escaper::Url), "%22a%20%5C%22b%5C%22%22");
        assert_eq!(resolve("$v|bogus$", &s, Escaper::Url), "a \"b\"");
    }

    #[test]
    fn test_custom_filter_from_registry() {
        let mut filters = TokenFilters::new();
        filters.register("upper", |v| v.to_uppercase());
        let s = source(&[("v", "web")]);
        assert_eq!(
            resolve_with_filters("host=$v|upper$", &s, Escaper::None, &filters),
            "host=WEB"
        );
    }

    #[test]
    fn test_dotted_token_names() {
        let s = source(&[("click.value", "42"), ("row.host", "web01")]);
        assert_eq!(
            resolve("$row.host$:$click.value$", &s, Escaper::None),
            "web01:42"
        );
        assert_eq!(token_names("$row.host$ $$ $click.value|u$"), vec!["row.host", "click.value"]);
    }
}
