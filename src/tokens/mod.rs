//! Tokens: the two token scopes, value sources, and `$token$` templates.

pub mod filters;
pub mod source;
pub mod store;
pub mod template;

pub use filters::{Escaper, TokenFilters};
pub use source::{render_value, Fields, ValueSource};
pub use store::{TokenModel, TokenScope, TokenScopes};
pub use template::{resolve, resolve_with_filters};
