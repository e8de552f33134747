/// A drilldown action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Resolve `value` as a template and store it in `token`.
    Set {
        token: String,
        value: String,
        delimiter: Option<String>,
        prefix: Option<String>,
        suffix: Option<String>,
        submit: bool,
    },
    Unset { token: String, submit: bool },
    /// Resolve `value` as a URL template and navigate to it.
    Link { value: String, target: Option<String> },
    /// Evaluate `value` as an expression and store the result in `token`.
    Eval { token: String, value: String, submit: bool },
}

impl Action {
    pub fn set(token: impl Into<String>, value: impl Into<String>) -> Self {
        Action::Set {
            token: token.into(),
            value: value.into(),
            delimiter: None,
            prefix: None,
            suffix: None,
            submit: true,
        }
    }

    pub fn unset(token: impl Into<String>) -> Self {
        Action::Unset {
            token: token.into(),
            submit: true,
        }
    }

    pub fn link(value: impl Into<String>) -> Self {
        Action::Link {
            value: value.into(),
            target: None,
        }
    }

    pub fn eval(token: impl Into<String>, expr: impl Into<String>) -> Self {
        Action::Eval {
            token: token.into(),
            value: expr.into(),
            submit: true,
        }
    }

    /// Join per-row results with `delim` for multi-row payloads. Only
    /// meaningful on `set`.
    pub fn with_delimiter(mut self, delim: impl Into<String>) -> Self {
        if let Action::Set { delimiter, .. } = &mut self {
            *delimiter = Some(delim.into());
        }
        self
    }

    pub fn with_affixes(mut self, before: Option<&str>, after: Option<&str>) -> Self {
        if let Action::Set { prefix, suffix, .. } = &mut self {
            *prefix = before.map(str::to_string);
            *suffix = after.map(str::to_string);
        }
        self
    }

    pub fn with_target(mut self, window: impl Into<String>) -> Self {
        if let Action::Link { target, .. } = &mut self {
            *target = Some(window.into());
        }
        self
    }

    /// Keep the write out of the submitted scope.
    pub fn without_submit(mut self) -> Self {
        match &mut self {
            Action::Set { submit, .. } | Action::Unset { submit, .. } | Action::Eval { submit, .. } => {
                *submit = false
            }
            Action::Link { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Set { .. } => "set",
            Action::Unset { .. } => "unset",
            Action::Link { .. } => "link",
            Action::Eval { .. } => "eval",
        }
    }
}

/// An action as declared in a handler definition. Definitions loaded from
/// data may name action types the engine does not know; those fail when
/// executed.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredAction {
    Known(Action),
    Unrecognized(String),
}

impl From<Action> for DeclaredAction {
    fn from(action: Action) -> Self {
        DeclaredAction::Known(action)
    }
}
