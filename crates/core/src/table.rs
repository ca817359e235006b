//! Per-type dispatch table construction.
//!
//! This is the meat of path dispatching: given one node type, enumerate
//! its member descriptors and structural capabilities and lay down the
//! rule list in a fixed precedence order. The order is a design
//! invariant, not an implementation detail; earlier rules win at request
//! time:
//!
//! 1. action rules (`do_` members)
//! 2. facet-contributed rules
//! 3. the no-argument default-action rule (`do_index`, held in a
//!    dedicated slot the engine consults only when no tokens remain)
//! 4. property rules (unprefixed members)
//! 5. selector rules (`get_` members), four signature variants in
//!    sub-order: `()`, `(request)`, `(str)`, `(int)`
//! 6. structural indexing (sequence, then keyed)
//! 7. the dynamic-action catch-all
//! 8. the dynamic-selector catch-all
//!
//! Tables are built once per type, cached by type identity, and immutable
//! afterwards.

use std::sync::Arc;

use crate::descriptor::{BoundValue, CallResult, Member, Param, ParamType};
use crate::engine::{DispatchContext, Outcome};
use crate::error::{DispatchError, InvokeError};
use crate::facet::{Facet, TypeProfile};
use crate::object::Object;
use crate::rules::{complete, dispatch_member, name_rule, Rule, RuleOutcome};

/// Member-name prefix marking callable actions.
pub const ACTION_PREFIX: &str = "do_";
/// Member-name prefix marking child selectors.
pub const SELECTOR_PREFIX: &str = "get_";
/// The default-action member consulted when no tokens remain.
pub const INDEX_MEMBER: &str = "do_index";

/// The ordered rule list for one runtime type.
pub struct DispatchTable {
    type_name: &'static str,
    rules: Vec<Rule>,
    index_rule: Option<Rule>,
}

impl DispatchTable {
    pub(crate) fn empty(type_name: &'static str) -> Self {
        DispatchTable {
            type_name,
            rules: Vec::new(),
            index_rule: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The default-action rule, if the type declared one.
    pub fn index_rule(&self) -> Option<&Rule> {
        self.index_rule.as_ref()
    }

    /// Diagnostic listing of rule names, in table order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Build the table for `node`'s type.
    pub fn build(node: &dyn Object, facets: &[Arc<dyn Facet>]) -> Self {
        let type_name = node.type_name();
        tracing::debug!(type_name, "building dispatch table");

        let members: Vec<Arc<Member>> = node
            .members()
            .into_iter()
            .map(|m| Arc::new(m.attach_owner(type_name)))
            .collect();

        let mut rules = Vec::new();

        // 1. action rules
        for m in &members {
            let Some(tokens) = m.route_tokens(ACTION_PREFIX) else {
                continue;
            };
            for token in tokens {
                let label = format!("action `{}` -> `{}`", m.name(), token);
                rules.push(member_rule(token, m.clone(), label));
            }
        }

        // 2. facet-contributed rules, in registration order
        let profile = TypeProfile {
            type_name,
            ancestry: node.view_ancestry(),
        };
        for f in facets {
            f.contribute_rules(&profile, &mut rules);
        }

        // 3. default-action rule, held aside for the empty-token state
        let index_rule = members
            .iter()
            .find(|m| m.name() == INDEX_MEMBER && m.lead_arg_count() == 0)
            .map(|m| index_member_rule(m.clone()));

        // 4. property rules
        for m in &members {
            if m.route_tokens(ACTION_PREFIX).is_some() || m.route_tokens(SELECTOR_PREFIX).is_some()
            {
                continue;
            }
            let token = m.name().to_owned();
            let label = format!("property `{}`", m.name());
            rules.push(member_rule(token, m.clone(), label));
        }

        // 5. selector rules, four signature variants in sub-order
        for variant in [
            SelectorVariant::Plain,
            SelectorVariant::RequestInjected,
            SelectorVariant::StrArg,
            SelectorVariant::IntArg,
        ] {
            for m in &members {
                let Some(tokens) = m.route_tokens(SELECTOR_PREFIX) else {
                    continue;
                };
                if selector_variant(m.params()) != Some(variant) {
                    continue;
                }
                for token in tokens {
                    let label = format!(
                        "selector `{}`{} -> `{}`",
                        m.name(),
                        variant.suffix(),
                        token
                    );
                    rules.push(member_rule(token, m.clone(), label));
                }
            }
        }

        // 6. structural indexing
        if node.as_sequence().is_some() {
            rules.push(sequence_rule());
        }
        if node.as_keyed().is_some() {
            rules.push(keyed_rule());
        }

        // 7. dynamic-action catch-all
        if node.as_dynamic_action().is_some() {
            rules.push(dynamic_action_rule());
        }

        // 8. dynamic-selector catch-all
        if node.as_dynamic_selector().is_some() {
            rules.push(dynamic_selector_rule());
        }

        DispatchTable {
            type_name,
            rules,
            index_rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectorVariant {
    Plain,
    RequestInjected,
    StrArg,
    IntArg,
}

impl SelectorVariant {
    fn suffix(self) -> &'static str {
        match self {
            SelectorVariant::Plain => "()",
            SelectorVariant::RequestInjected => "(request)",
            SelectorVariant::StrArg => "(str)",
            SelectorVariant::IntArg => "(int)",
        }
    }
}

/// Classify a selector by its exact visible parameter shape. Selectors
/// with any other shape are not dispatch-eligible.
fn selector_variant(params: &[Param]) -> Option<SelectorVariant> {
    match params {
        [] => Some(SelectorVariant::Plain),
        [p] if p.ty == ParamType::Request => Some(SelectorVariant::RequestInjected),
        [p] if p.ty == ParamType::Str => Some(SelectorVariant::StrArg),
        [p] if p.ty == ParamType::Int => Some(SelectorVariant::IntArg),
        _ => None,
    }
}

/// The shared shape of every member-backed rule: name-token protocol,
/// then lead-argument consumption, then bind-and-invoke.
fn member_rule(token: String, member: Arc<Member>, label: String) -> Rule {
    let arg_count = member.lead_arg_count();
    name_rule(token, arg_count, label, move |engine, ctx, node| {
        let Some(lead) = consume_lead(ctx, &member) else {
            return Ok(RuleOutcome::NoMatch);
        };
        dispatch_member(engine, ctx, node, &member, lead)
    })
}

/// Consume one path token per `Str`/`Int` parameter, in declared order.
/// A numeric parse failure restores everything consumed here and reports
/// `None` so the rule can decline; the name-token wrapper restores the
/// name token itself.
fn consume_lead(ctx: &mut DispatchContext<'_>, member: &Member) -> Option<Vec<BoundValue>> {
    let mut lead = Vec::new();
    let mut consumed = 0usize;
    for p in member.params() {
        match p.ty {
            ParamType::Str => match ctx.tokens.next() {
                Ok(t) => {
                    consumed += 1;
                    lead.push(BoundValue::Str(t));
                }
                Err(_) => {
                    rewind(ctx, consumed);
                    return None;
                }
            },
            ParamType::Int => match ctx.tokens.next_as_int() {
                Ok(n) => {
                    consumed += 1;
                    lead.push(BoundValue::Int(n));
                }
                Err(_) => {
                    rewind(ctx, consumed);
                    return None;
                }
            },
            _ => {}
        }
    }
    Some(lead)
}

fn rewind(ctx: &mut DispatchContext<'_>, consumed: usize) {
    for _ in 0..consumed {
        ctx.tokens.push_back();
    }
}

fn index_member_rule(member: Arc<Member>) -> Rule {
    let label = format!("index `{}`", member.name());
    Rule::new(label, move |engine, ctx, node| {
        if ctx.tokens.has_more() {
            return Ok(RuleOutcome::NoMatch);
        }
        dispatch_member(engine, ctx, node, &member, Vec::new())
    })
}

/// Positional indexing for sequence-capable nodes. A non-numeric token is
/// a non-match; a numeric token that misses the data is a hard
/// invocation failure (documented policy, see DESIGN.md).
fn sequence_rule() -> Rule {
    Rule::new("sequence [index]", |engine, ctx, node| {
        if !ctx.tokens.has_more() {
            return Ok(RuleOutcome::NoMatch);
        }
        let idx = match ctx.tokens.next_as_int() {
            Ok(i) => i,
            Err(_) => return Ok(RuleOutcome::NoMatch),
        };
        let Some(seq) = node.as_sequence() else {
            return Ok(RuleOutcome::NoMatch);
        };
        let len = seq.len();
        let child = usize::try_from(idx).ok().and_then(|i| seq.get(i));
        match child {
            Some(child) => {
                ctx.trace
                    .record_with(|| format!("   index [{idx}] on <{}>", node.type_name()));
                Ok(RuleOutcome::Done(engine.traverse(ctx, Some(child))?))
            }
            None => Err(DispatchError::TargetInvocation {
                member: format!("[{idx}]"),
                source: InvokeError::OutOfRange { index: idx, len },
            }),
        }
    })
}

/// Keyed lookup for map-capable nodes. A missing key does not consume the
/// token and does not terminate: it falls through so a later rule can
/// still claim the token.
fn keyed_rule() -> Rule {
    Rule::new("keyed [token]", |engine, ctx, node| {
        let Some(key) = ctx.tokens.peek().map(str::to_owned) else {
            return Ok(RuleOutcome::NoMatch);
        };
        let Some(keyed) = node.as_keyed() else {
            return Ok(RuleOutcome::NoMatch);
        };
        match keyed.get(&key) {
            Some(child) => {
                let _ = ctx.tokens.next();
                ctx.trace
                    .record_with(|| format!("   key `{key}` on <{}>", node.type_name()));
                Ok(RuleOutcome::Done(engine.traverse(ctx, Some(child))?))
            }
            None => {
                ctx.trace.record_with(|| {
                    format!("   key `{key}` missing on <{}>, falling through", node.type_name())
                });
                Ok(RuleOutcome::NoMatch)
            }
        }
    })
}

/// The last-resort catch-all: matches unconditionally and hands the whole
/// remaining path to the handler.
fn dynamic_action_rule() -> Rule {
    Rule::new("dynamic action", |_engine, ctx, node| {
        let Some(dy) = node.as_dynamic_action() else {
            return Ok(RuleOutcome::NoMatch);
        };
        ctx.trace
            .record_with(|| format!("   dynamic action on <{}>", node.type_name()));
        let result = dy
            .do_dynamic(ctx.request, &mut *ctx.response, &mut ctx.tokens)
            .map(|()| CallResult::Done);
        match complete(ctx, "dynamic action", result)? {
            None => Ok(RuleOutcome::Done(Outcome::Forbidden)),
            Some(_) => Ok(RuleOutcome::Done(Outcome::Dispatched)),
        }
    })
}

/// Offer the next token to the dynamic selector; an empty result pushes
/// the token back and declines.
fn dynamic_selector_rule() -> Rule {
    Rule::new("dynamic selector", |engine, ctx, node| {
        if !ctx.tokens.has_more() {
            return Ok(RuleOutcome::NoMatch);
        }
        let Some(ds) = node.as_dynamic_selector() else {
            return Ok(RuleOutcome::NoMatch);
        };
        let Ok(token) = ctx.tokens.next() else {
            return Ok(RuleOutcome::NoMatch);
        };
        let result = ds
            .get_dynamic(&token, ctx.request, &mut *ctx.response)
            .map(CallResult::Child);
        match complete(ctx, "dynamic selector", result)? {
            None => Ok(RuleOutcome::Done(Outcome::Forbidden)),
            Some(CallResult::Child(Some(child))) => {
                ctx.trace
                    .record_with(|| format!("   dynamic `{token}` on <{}>", node.type_name()));
                Ok(RuleOutcome::Done(engine.traverse(ctx, Some(child))?))
            }
            Some(_) => {
                ctx.tokens.push_back();
                ctx.trace
                    .record_with(|| format!("   dynamic `{token}` declined, falling through"));
                Ok(RuleOutcome::NoMatch)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MemberDef;
    use crate::object::{ObjectRef, SequenceNode};
    use std::any::Any;

    struct Fixture;

    impl Object for Fixture {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn type_name(&self) -> &'static str {
            "Fixture"
        }

        fn members(&self) -> Vec<Member> {
            vec![
                MemberDef::instance("do_build", vec![], |_, _| Ok(CallResult::Done)).into(),
                MemberDef::instance("do_index", vec![], |_, _| Ok(CallResult::Done)).into(),
                MemberDef::property("jobs", |_, _| Ok(CallResult::Child(None))).into(),
                MemberDef::instance("get_job", vec![Param::str()], |_, _| {
                    Ok(CallResult::Child(None))
                })
                .into(),
                MemberDef::instance("get_build", vec![Param::int()], |_, _| {
                    Ok(CallResult::Child(None))
                })
                .into(),
                MemberDef::instance("get_view", vec![], |_, _| Ok(CallResult::Child(None)))
                    .into(),
            ]
        }

        fn as_sequence(&self) -> Option<&dyn SequenceNode> {
            Some(self)
        }
    }

    impl SequenceNode for Fixture {
        fn len(&self) -> usize {
            0
        }

        fn get(&self, _index: usize) -> Option<ObjectRef> {
            None
        }
    }

    #[test]
    fn rules_follow_the_precedence_order() {
        let table = DispatchTable::build(&Fixture, &[]);
        let names = table.rule_names();
        assert_eq!(
            names,
            vec![
                "action `do_build` -> `build`",
                "action `do_index` -> `index`",
                "property `jobs`",
                "selector `get_view`() -> `view`",
                "selector `get_job`(str) -> `job`",
                "selector `get_build`(int) -> `build`",
                "sequence [index]",
            ]
        );
        assert!(table.index_rule().is_some());
    }

    #[test]
    fn two_builds_produce_identical_orderings() {
        let a = DispatchTable::build(&Fixture, &[]);
        let b = DispatchTable::build(&Fixture, &[]);
        let a_names: Vec<String> = a.rule_names().iter().map(|s| s.to_string()).collect();
        let b_names: Vec<String> = b.rule_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(a_names, b_names);
    }

    #[test]
    fn index_member_with_lead_args_is_not_an_index_rule() {
        struct Odd;
        impl Object for Odd {
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn type_name(&self) -> &'static str {
                "Odd"
            }
            fn members(&self) -> Vec<Member> {
                vec![MemberDef::instance("do_index", vec![Param::str()], |_, _| {
                    Ok(CallResult::Done)
                })
                .into()]
            }
        }
        let table = DispatchTable::build(&Odd, &[]);
        assert!(table.index_rule().is_none());
    }
}
