//! Dispatch rules: named (match, action) pairs tried in table order.
//!
//! The matching contract is strict and two-step: an applicability check
//! must be side-effect-free when it reports a non-match; only a true match
//! may consume tokens or invoke handlers. Rules that speculatively consume
//! must restore the cursor with `push_back` before declining. Numeric
//! parse failures and missing-key lookups are non-matches, not errors, so
//! the engine can continue to the next rule.

use std::sync::Arc;

use crate::descriptor::{BoundValue, CallResult, Member};
use crate::engine::{DispatchContext, Engine, Outcome};
use crate::error::{DispatchError, InvokeError};
use crate::object::Object;

/// A rule's answer for the current node and remaining tokens.
pub enum RuleOutcome {
    /// Declined, with no side effects.
    NoMatch,
    /// Claimed the request; the terminal outcome of the subtree.
    Done(Outcome),
}

type RuleFn = Box<
    dyn Fn(&Engine, &mut DispatchContext<'_>, &dyn Object) -> Result<RuleOutcome, DispatchError>
        + Send
        + Sync,
>;

/// One precedence-ordered dispatch rule. Immutable once its table is
/// built.
pub struct Rule {
    name: String,
    run: RuleFn,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&Engine, &mut DispatchContext<'_>, &dyn Object) -> Result<RuleOutcome, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        Rule {
            name: name.into(),
            run: Box::new(run),
        }
    }

    /// Diagnostic name, for tracing.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(
        &self,
        engine: &Engine,
        ctx: &mut DispatchContext<'_>,
        node: &dyn Object,
    ) -> Result<RuleOutcome, DispatchError> {
        (self.run)(engine, ctx, node)
    }
}

/// Wrap a rule body in the name-token protocol: match only when the next
/// token equals `token` and enough tokens remain for the declared
/// argument count, consume the name token, and restore it if the body
/// still declines.
pub(crate) fn name_rule<F>(token: String, arg_count: usize, label: String, body: F) -> Rule
where
    F: Fn(&Engine, &mut DispatchContext<'_>, &dyn Object) -> Result<RuleOutcome, DispatchError>
        + Send
        + Sync
        + 'static,
{
    Rule::new(label, move |engine, ctx, node| {
        if ctx.tokens.peek() != Some(token.as_str()) {
            return Ok(RuleOutcome::NoMatch);
        }
        if ctx.tokens.remaining_count() <= arg_count {
            return Ok(RuleOutcome::NoMatch);
        }
        let _ = ctx.tokens.next();
        match body(engine, ctx, node)? {
            RuleOutcome::NoMatch => {
                ctx.tokens.push_back();
                Ok(RuleOutcome::NoMatch)
            }
            done => Ok(done),
        }
    })
}

/// Bind, invoke, and convert a member's result into a rule outcome:
/// a returned child continues traversal, a completed write is terminal,
/// and an authorization failure is terminal `Forbidden` at this node.
pub(crate) fn dispatch_member(
    engine: &Engine,
    ctx: &mut DispatchContext<'_>,
    node: &dyn Object,
    member: &Arc<Member>,
    lead: Vec<BoundValue>,
) -> Result<RuleOutcome, DispatchError> {
    ctx.trace
        .record_with(|| format!("   invoke `{}` on <{}>", member.name(), node.type_name()));

    let result = member.bind_and_invoke(
        node,
        ctx.request,
        &mut *ctx.response,
        &ctx.ancestors,
        lead,
        engine.binder(),
        engine.sidecar(),
    );
    match complete(ctx, member.name(), result)? {
        None => Ok(RuleOutcome::Done(Outcome::Forbidden)),
        Some(CallResult::Done) => Ok(RuleOutcome::Done(Outcome::Dispatched)),
        Some(CallResult::Child(child)) => Ok(RuleOutcome::Done(engine.traverse(ctx, child)?)),
    }
}

/// Surface an invocation result. `AccessDenied` becomes `None` after
/// marking the response forbidden; any other failure is wrapped as a
/// target-invocation error for the transport layer. The response body
/// must not reveal which member required permission.
pub(crate) fn complete(
    ctx: &mut DispatchContext<'_>,
    member: &str,
    result: Result<CallResult, InvokeError>,
) -> Result<Option<CallResult>, DispatchError> {
    match result {
        Ok(r) => Ok(Some(r)),
        Err(InvokeError::AccessDenied { role }) => {
            ctx.trace
                .record_with(|| format!("<- `{member}` denied, needs role `{role}`"));
            ctx.response.send_error(403, "access requires permission");
            Ok(None)
        }
        Err(source) => Err(DispatchError::TargetInvocation {
            member: member.to_owned(),
            source,
        }),
    }
}
