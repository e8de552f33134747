//! Token scopes.
//!
//! A dashboard keeps two overlapping token scopes: "default" holds every
//! value the page has seen, "submitted" holds the values searches run with.
//! Drilldown actions write to both unless told not to submit.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// One addressable name → string mapping.
///
/// Scopes are shared between every handler on a page, so writes go through
/// `&self`.
pub trait TokenScope {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: String);
    fn unset(&self, name: &str);
    /// Copy of every token currently in the scope.
    fn snapshot(&self) -> BTreeMap<String, String>;
}

/// In-memory token scope.
#[derive(Debug, Default)]
pub struct TokenModel {
    values: RefCell<BTreeMap<String, String>>,
}

impl TokenModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RefCell::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl TokenScope for TokenModel {
    fn get(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    fn set(&self, name: &str, value: String) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    fn unset(&self, name: &str) {
        self.values.borrow_mut().remove(name);
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.borrow().clone()
    }
}

/// The two scopes a handler writes to. A page may run without a submitted
/// scope, in which case only the default scope is touched.
#[derive(Clone)]
pub struct TokenScopes {
    pub default: Rc<dyn TokenScope>,
    pub submitted: Option<Rc<dyn TokenScope>>,
}

impl TokenScopes {
    pub fn new(default: Rc<dyn TokenScope>, submitted: Option<Rc<dyn TokenScope>>) -> Self {
        Self { default, submitted }
    }

    /// Fresh in-memory default and submitted scopes.
    pub fn in_memory() -> Self {
        Self {
            default: Rc::new(TokenModel::new()),
            submitted: Some(Rc::new(TokenModel::new())),
        }
    }

    /// Write `value` to the default scope, and to the submitted scope when
    /// `submit` is true.
    pub fn apply(&self, name: &str, value: String, submit: bool) {
        if submit {
            if let Some(submitted) = &self.submitted {
                submitted.set(name, value.clone());
            }
        }
        self.default.set(name, value);
    }

    /// Remove `name` from the default scope, and from the submitted scope when
    /// `submit` is true.
    pub fn remove(&self, name: &str, submit: bool) {
        self.default.unset(name);
        if submit {
            if let Some(submitted) = &self.submitted {
                submitted.unset(name);
            }
        }
    }

    /// Submitted tokens, the base every value source starts from.
    pub fn submitted_snapshot(&self) -> BTreeMap<String, String> {
        self.submitted
            .as_ref()
            .map(|s| s.snapshot())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for TokenScopes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenScopes")
            .field("default", &self.default.snapshot())
            .field("submitted", &self.submitted.as_ref().map(|s| s.snapshot()))
            .finish()
    }
}
