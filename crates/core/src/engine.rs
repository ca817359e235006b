//! The dispatch engine: the recursive resolver that walks the object
//! graph under the control of the per-type dispatch tables.
//!
//! One invocation per request, one recursive step per intermediate node:
//!
//! 1. An absent node terminates as not-found.
//! 2. An ancestor entry is recorded with a snapshot of the token cursor.
//! 3. With no tokens left: redirect to `path/` when the original path
//!    lacked the trailing separator, otherwise run the index fallback
//!    (the type's default-action rule, then each facet's index view),
//!    else forbidden.
//! 4. Otherwise the node's table is fetched (or built and cached) and its
//!    rules are tried in order; the first match decides, usually by
//!    recursing into a child at a deeper cursor position.
//! 5. No match at all terminates as not-found.
//!
//! Everything request-scoped lives in the [`DispatchContext`] owned by
//! the task handling the request; the table cache is the only shared
//! state.

use std::sync::Arc;

use crate::ancestor::{Ancestor, AncestorChain};
use crate::binder::{NoSidecar, ParamBinder, QueryParamBinder, SidecarNames};
use crate::cache::TableCache;
use crate::error::DispatchError;
use crate::facet::Facet;
use crate::object::{Object, ObjectRef};
use crate::request::{Request, Response};
use crate::rules::RuleOutcome;
use crate::table::DispatchTable;
use crate::tokens::TokenList;
use crate::trace::EvaluationTrace;

/// Process-wide engine configuration, threaded through construction so
/// the core stays testable in isolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Rebuild dispatch tables on every lookup instead of caching them.
    /// A development convenience; trades latency for freshness.
    pub no_cache: bool,
    /// Record an evaluation trace per request and emit it as response
    /// headers plus a diagnostic page on not-found.
    pub trace: bool,
}

/// Terminal outcomes of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A matched handler claimed the request.
    Dispatched,
    /// A facet served an index view.
    IndexServed,
    /// The path lacked its trailing separator; redirected.
    Redirect(String),
    /// No rule matched at some node.
    NotFound,
    /// An index fallback was unavailable, or a matched rule required a
    /// role the caller lacks.
    Forbidden,
}

/// Request-scoped resolution state, owned by the task handling the
/// request. Never shared across requests.
pub struct DispatchContext<'a> {
    pub request: &'a dyn Request,
    pub response: &'a mut dyn Response,
    pub tokens: TokenList,
    pub ancestors: AncestorChain,
    pub trace: EvaluationTrace,
}

/// What the engine hands back to the transport layer after resolution.
#[derive(Debug)]
pub struct DispatchReport {
    pub outcome: Outcome,
    pub ancestors: AncestorChain,
    pub trace: EvaluationTrace,
}

/// The recursive resolver. Cheap to share behind an `Arc`; all mutable
/// state is either request-scoped or inside the table cache.
pub struct Engine {
    cache: TableCache,
    facets: Vec<Arc<dyn Facet>>,
    binder: Arc<dyn ParamBinder>,
    sidecar: Arc<dyn SidecarNames>,
    trace_enabled: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            cache: TableCache::new(config.no_cache),
            facets: Vec::new(),
            binder: Arc::new(QueryParamBinder),
            sidecar: Arc::new(NoSidecar),
            trace_enabled: config.trace,
        }
    }

    /// Register a facet. Registration order is contribution order.
    pub fn add_facet(&mut self, facet: Arc<dyn Facet>) {
        self.facets.push(facet);
    }

    pub fn set_binder(&mut self, binder: Arc<dyn ParamBinder>) {
        self.binder = binder;
    }

    pub fn set_sidecar(&mut self, sidecar: Arc<dyn SidecarNames>) {
        self.sidecar = sidecar;
    }

    pub(crate) fn binder(&self) -> &dyn ParamBinder {
        &*self.binder
    }

    pub(crate) fn sidecar(&self) -> &dyn SidecarNames {
        &*self.sidecar
    }

    /// Resolve one request against the graph rooted at `root`.
    ///
    /// Terminal outcomes drive the response (redirect, error status); the
    /// returned report carries the outcome, the ancestor chain, and the
    /// trace for the transport layer or diagnostics. Handler failures are
    /// re-raised as [`DispatchError::TargetInvocation`], never swallowed.
    pub fn dispatch(
        &self,
        root: ObjectRef,
        request: &dyn Request,
        response: &mut dyn Response,
    ) -> Result<DispatchReport, DispatchError> {
        let tokens = TokenList::new(request.path());
        tracing::debug!(
            path = request.path(),
            segments = tokens.remaining_count(),
            "dispatch begin"
        );

        let mut ctx = DispatchContext {
            request,
            response: &mut *response,
            tokens,
            ancestors: AncestorChain::new(),
            trace: EvaluationTrace::new(self.trace_enabled),
        };
        let outcome = self.traverse(&mut ctx, Some(root))?;
        let DispatchContext {
            ancestors, trace, ..
        } = ctx;

        if trace.enabled() {
            for (i, line) in trace.lines().iter().enumerate() {
                response.add_header(&format!("Dispatch-Trace-{i:03}"), line);
            }
            if outcome == Outcome::NotFound {
                response.write(&trace.not_found_page(request.path()));
            }
        }
        tracing::debug!(?outcome, depth = ancestors.len(), "dispatch end");

        Ok(DispatchReport {
            outcome,
            ancestors,
            trace,
        })
    }

    /// One resolution step; rule actions recurse back into this.
    pub(crate) fn traverse(
        &self,
        ctx: &mut DispatchContext<'_>,
        node: Option<ObjectRef>,
    ) -> Result<Outcome, DispatchError> {
        let Some(node) = node else {
            ctx.trace.record("<- absent node, not found");
            ctx.response.send_error(404, "not found");
            return Ok(Outcome::NotFound);
        };

        ctx.ancestors.push(Ancestor {
            node: node.clone(),
            consumed: ctx.tokens.consumed_count(),
            remainder: ctx.tokens.remainder_as_path(),
        });
        ctx.trace.record_with(|| {
            format!(
                "-> evaluate(<{}>, \"{}\")",
                node.type_name(),
                ctx.tokens.remainder_as_path()
            )
        });
        tracing::trace!(node = node.type_name(), rest = %ctx.tokens.remainder_as_path(), "evaluate");

        if !ctx.tokens.has_more() {
            if !ctx.tokens.has_trailing_slash() {
                let location = format!("{}/", ctx.request.path());
                ctx.trace
                    .record_with(|| format!("<- redirect to \"{location}\""));
                ctx.response.redirect(&location);
                return Ok(Outcome::Redirect(location));
            }
            return self.index_fallback(ctx, &node);
        }

        let table = self.table_for(&*node);
        for rule in table.rules() {
            ctx.trace.record_with(|| format!("   try {}", rule.name()));
            match rule.run(self, ctx, &*node)? {
                RuleOutcome::NoMatch => continue,
                RuleOutcome::Done(outcome) => return Ok(outcome),
            }
        }

        ctx.trace.record("<- no rule matched, not found");
        ctx.response.send_error(404, "not found");
        Ok(Outcome::NotFound)
    }

    /// The empty-token path: the type's default-action rule first, then
    /// each facet's index view for the node's type chain, else forbidden.
    fn index_fallback(
        &self,
        ctx: &mut DispatchContext<'_>,
        node: &ObjectRef,
    ) -> Result<Outcome, DispatchError> {
        let table = self.table_for(&**node);
        if let Some(rule) = table.index_rule() {
            ctx.trace.record_with(|| format!("   try {}", rule.name()));
            if let RuleOutcome::Done(outcome) = rule.run(self, ctx, &**node)? {
                return Ok(outcome);
            }
        }
        for facet in &self.facets {
            if facet.serve_index(ctx, &**node)? {
                ctx.trace.record("<- index view served");
                return Ok(Outcome::IndexServed);
            }
        }
        ctx.trace.record("<- no index handler or view, forbidden");
        ctx.response.send_error(403, "access requires permission");
        Ok(Outcome::Forbidden)
    }

    fn table_for(&self, node: &dyn Object) -> Arc<DispatchTable> {
        let key = node.as_any().type_id();
        self.cache
            .get_or_build(key, || DispatchTable::build(node, &self.facets))
    }
}
