use super::event::DrilldownEvent;
use super::state::ReportSink;
use crate::binding::ComponentRegistry;
use crate::eval::ExpressionEvaluator;
use crate::navigation::{Navigator, PageContext};
use crate::tokens::{Fields, TokenFilters, TokenScopes, ValueSource};
use std::rc::Rc;

/// Collaborators a handler works against. Cloning shares them.
#[derive(Clone)]
pub struct Environment {
    pub registry: Rc<dyn ComponentRegistry>,
    pub tokens: TokenScopes,
    pub evaluator: Rc<dyn ExpressionEvaluator>,
    pub navigator: Rc<dyn Navigator>,
    pub page: PageContext,
    pub filters: TokenFilters,
    /// Where reports of bound events go. Without one they are discarded.
    pub reports: Option<Rc<dyn ReportSink>>,
}

impl Environment {
    pub fn new(
        registry: Rc<dyn ComponentRegistry>,
        tokens: TokenScopes,
        evaluator: Rc<dyn ExpressionEvaluator>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        Self {
            registry,
            tokens,
            evaluator,
            navigator,
            page: PageContext::default(),
            filters: TokenFilters::default(),
            reports: None,
        }
    }

    pub fn with_page(mut self, page: PageContext) -> Self {
        self.page = page;
        self
    }

    pub fn with_filters(mut self, filters: TokenFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_reports(mut self, sink: Rc<dyn ReportSink>) -> Self {
        self.reports = Some(sink);
        self
    }

    /// Submitted tokens, overlaid with the event's attributes, overlaid with
    /// `row`.
    pub fn value_source(&self, event: &DrilldownEvent, row: Option<&Fields>) -> ValueSource {
        let source =
            ValueSource::from_tokens(self.tokens.submitted_snapshot()).with_fields(&event.attributes);
        match row {
            Some(row) => source.with_fields(row),
            None => source,
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("tokens", &self.tokens)
            .field("page", &self.page)
            .field("filters", &self.filters)
            .field("reports", &self.reports.is_some())
            .finish_non_exhaustive()
    }
}
