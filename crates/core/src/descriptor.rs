//! Member descriptors: the normalized view of one introspectable action,
//! selector, or property.
//!
//! A descriptor wraps the difference between instance-style callables
//! (receiver implicit) and extension-style callables (receiver is the
//! first declared parameter, stripped from the externally visible list)
//! behind one shape. Role guarding is aggregation by composition: a
//! guarded member wraps a plain one and adds an authorization check in
//! front of invocation.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::ancestor::AncestorChain;
use crate::binder::{ParamBinder, SidecarNames};
use crate::error::InvokeError;
use crate::object::Object;
use crate::request::{Request, Response};

/// Declared parameter types, the basis for auto-injection and binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Satisfied from the invocation context, not bound.
    Request,
    /// Satisfied from the invocation context, not bound.
    Response,
    /// Consumed from the path by the matching rule.
    Str,
    /// Consumed from the path by the matching rule; must parse numeric.
    Int,
    /// Produced by the external parameter-binding collaborator; the
    /// string names the declared type.
    Value(&'static str),
}

/// Per-parameter metadata handed to the binding collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMeta(pub BTreeMap<String, String>);

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub ty: ParamType,
    pub meta: ParamMeta,
}

impl Param {
    pub fn request() -> Self {
        Param {
            ty: ParamType::Request,
            meta: ParamMeta::default(),
        }
    }

    pub fn response() -> Self {
        Param {
            ty: ParamType::Response,
            meta: ParamMeta::default(),
        }
    }

    pub fn str() -> Self {
        Param {
            ty: ParamType::Str,
            meta: ParamMeta::default(),
        }
    }

    pub fn int() -> Self {
        Param {
            ty: ParamType::Int,
            meta: ParamMeta::default(),
        }
    }

    pub fn value(declared_type: &'static str) -> Self {
        Param {
            ty: ParamType::Value(declared_type),
            meta: ParamMeta::default(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.0.insert(key.into(), value.into());
        self
    }
}

/// A bound argument value, in declared-parameter order. Request and
/// response parameters are not materialized here; handlers read them from
/// the [`Invocation`] context.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Str(String),
    Int(i64),
    Value(serde_json::Value),
}

/// What a member invocation produced.
pub enum CallResult {
    /// The handler wrote to the response; dispatch is complete.
    Done,
    /// A child node to continue traversal into (`None` means the graph
    /// has no node there).
    Child(Option<crate::object::ObjectRef>),
}

/// Everything a handler can see while running.
pub struct Invocation<'c> {
    pub request: &'c dyn Request,
    pub response: &'c mut dyn Response,
    pub ancestors: &'c AncestorChain,
    pub args: Vec<BoundValue>,
}

impl Invocation<'_> {
    pub fn str_arg(&self, index: usize) -> Result<&str, InvokeError> {
        match self.args.get(index) {
            Some(BoundValue::Str(s)) => Ok(s),
            Some(_) => Err(InvokeError::ArgType {
                index,
                expected: "string",
            }),
            None => Err(InvokeError::MissingArg { index }),
        }
    }

    pub fn int_arg(&self, index: usize) -> Result<i64, InvokeError> {
        match self.args.get(index) {
            Some(BoundValue::Int(n)) => Ok(*n),
            Some(_) => Err(InvokeError::ArgType {
                index,
                expected: "integer",
            }),
            None => Err(InvokeError::MissingArg { index }),
        }
    }

    pub fn value_arg(&self, index: usize) -> Result<&serde_json::Value, InvokeError> {
        match self.args.get(index) {
            Some(BoundValue::Value(v)) => Ok(v),
            Some(_) => Err(InvokeError::ArgType {
                index,
                expected: "bound value",
            }),
            None => Err(InvokeError::MissingArg { index }),
        }
    }
}

type RawFn =
    Arc<dyn Fn(&dyn Object, &mut Invocation<'_>) -> Result<CallResult, InvokeError> + Send + Sync>;

/// The two invocation variants, behind one shape.
#[derive(Clone)]
pub enum Callable {
    /// The receiver is the node itself.
    Instance(RawFn),
    /// A free function whose first declared parameter was the receiver;
    /// that parameter is stripped from the externally visible list at
    /// construction.
    Extension(RawFn),
}

impl Callable {
    fn call(
        &self,
        receiver: &dyn Object,
        inv: &mut Invocation<'_>,
    ) -> Result<CallResult, InvokeError> {
        match self {
            Callable::Instance(f) | Callable::Extension(f) => f(receiver, inv),
        }
    }
}

/// A plain member descriptor. Immutable once the dispatch table holding
/// it is built.
pub struct MemberDef {
    name: String,
    explicit_tokens: Vec<String>,
    params: Vec<Param>,
    callable: Callable,
    owner: &'static str,
    param_names: OnceLock<Vec<String>>,
}

impl MemberDef {
    /// An instance-style member.
    pub fn instance<F>(name: impl Into<String>, params: Vec<Param>, f: F) -> Self
    where
        F: Fn(&dyn Object, &mut Invocation<'_>) -> Result<CallResult, InvokeError>
            + Send
            + Sync
            + 'static,
    {
        MemberDef {
            name: name.into(),
            explicit_tokens: Vec::new(),
            params,
            callable: Callable::Instance(Arc::new(f)),
            owner: "",
            param_names: OnceLock::new(),
        }
    }

    /// An extension-style member. `params` is the declared list including
    /// the leading receiver parameter, which is stripped here.
    pub fn extension<F>(name: impl Into<String>, mut params: Vec<Param>, f: F) -> Self
    where
        F: Fn(&dyn Object, &mut Invocation<'_>) -> Result<CallResult, InvokeError>
            + Send
            + Sync
            + 'static,
    {
        if !params.is_empty() {
            params.remove(0);
        }
        MemberDef {
            name: name.into(),
            explicit_tokens: Vec::new(),
            params,
            callable: Callable::Extension(Arc::new(f)),
            owner: "",
            param_names: OnceLock::new(),
        }
    }

    /// A zero-parameter exposed property.
    pub fn property<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Object, &mut Invocation<'_>) -> Result<CallResult, InvokeError>
            + Send
            + Sync
            + 'static,
    {
        Self::instance(name, Vec::new(), f)
    }

    /// Explicit token-name overrides, replacing the derived name.
    pub fn with_tokens(mut self, tokens: &[&str]) -> Self {
        self.explicit_tokens = tokens.iter().map(|t| (*t).to_owned()).collect();
        self
    }
}

/// A member: plain, or role-guarded by composition.
pub enum Member {
    Plain(MemberDef),
    Guarded { role: String, inner: Box<Member> },
}

impl From<MemberDef> for Member {
    fn from(def: MemberDef) -> Self {
        Member::Plain(def)
    }
}

impl Member {
    /// Wrap `inner` with a role requirement checked on every invocation.
    pub fn guarded(role: impl Into<String>, inner: impl Into<Member>) -> Self {
        Member::Guarded {
            role: role.into(),
            inner: Box::new(inner.into()),
        }
    }

    fn def(&self) -> &MemberDef {
        match self {
            Member::Plain(def) => def,
            Member::Guarded { inner, .. } => inner.def(),
        }
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    /// The externally visible parameter list.
    pub fn params(&self) -> &[Param] {
        &self.def().params
    }

    /// How many path tokens this member consumes beyond its name token.
    pub fn lead_arg_count(&self) -> usize {
        self.params()
            .iter()
            .filter(|p| matches!(p.ty, ParamType::Str | ParamType::Int))
            .count()
    }

    /// The tokens this member answers to under `prefix`: the explicit
    /// overrides if any were declared, otherwise the derived name.
    /// `None` when the member name does not carry the prefix.
    pub fn route_tokens(&self, prefix: &str) -> Option<Vec<String>> {
        let def = self.def();
        let derived = derived_token(&def.name, prefix)?;
        if def.explicit_tokens.is_empty() {
            Some(vec![derived])
        } else {
            Some(def.explicit_tokens.clone())
        }
    }

    /// Stamp the declaring type's name, used as the sidecar resource key.
    /// Called by the table builder before the member is frozen into a
    /// rule.
    pub(crate) fn attach_owner(self, owner: &'static str) -> Self {
        match self {
            Member::Plain(mut def) => {
                def.owner = owner;
                Member::Plain(def)
            }
            Member::Guarded { role, inner } => Member::Guarded {
                role,
                inner: Box::new(inner.attach_owner(owner)),
            },
        }
    }

    /// Invoke with pre-assembled arguments. A guarded member re-evaluates
    /// its role check on every call; failure is `AccessDenied`, a
    /// distinct externally visible outcome.
    pub fn invoke(
        &self,
        receiver: &dyn Object,
        inv: &mut Invocation<'_>,
    ) -> Result<CallResult, InvokeError> {
        match self {
            Member::Plain(def) => def.callable.call(receiver, inv),
            Member::Guarded { role, inner } => {
                if inv.request.user_in_role(role) {
                    inner.invoke(receiver, inv)
                } else {
                    Err(InvokeError::AccessDenied { role: role.clone() })
                }
            }
        }
    }

    /// Fill the parameter list, then invoke.
    ///
    /// Request- and response-typed parameters are satisfied from the
    /// invocation context. `Str`/`Int` parameters take the rule-supplied
    /// lead arguments in order. `Value` parameters ask the binding
    /// collaborator, passing declared type, metadata, and the parameter
    /// name from the sidecar resource (loaded lazily; absence means no
    /// names known, never a failure).
    #[allow(clippy::too_many_arguments)]
    pub fn bind_and_invoke(
        &self,
        receiver: &dyn Object,
        request: &dyn Request,
        response: &mut dyn Response,
        ancestors: &AncestorChain,
        lead: Vec<BoundValue>,
        binder: &dyn ParamBinder,
        sidecar: &dyn SidecarNames,
    ) -> Result<CallResult, InvokeError> {
        let def = self.def();
        let names = def
            .param_names
            .get_or_init(|| load_param_names(sidecar, def.owner, &def.name));

        let mut lead = lead.into_iter();
        let mut args = Vec::with_capacity(def.params.len());
        for (i, p) in def.params.iter().enumerate() {
            match p.ty {
                ParamType::Request | ParamType::Response => {}
                ParamType::Str | ParamType::Int => {
                    args.push(lead.next().ok_or(InvokeError::MissingArg { index: i })?);
                }
                ParamType::Value(declared) => {
                    let name = names.get(i).map(String::as_str);
                    args.push(binder.bind(request, declared, &p.meta, name)?);
                }
            }
        }

        let mut inv = Invocation {
            request,
            response,
            ancestors,
            args,
        };
        self.invoke(receiver, &mut inv)
    }
}

/// Load and split the comma-separated sidecar name list. Best effort: an
/// absent resource yields an empty list.
fn load_param_names(sidecar: &dyn SidecarNames, owner: &str, member: &str) -> Vec<String> {
    match sidecar.load(owner, member) {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Derive the route token for `name` under `prefix`: strip the prefix and
/// lower-case the first character. `None` if the prefix is absent or
/// nothing remains after it.
pub(crate) fn derived_token(name: &str, prefix: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(format!("{}{}", first.to_lowercase(), chars.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{NoSidecar, QueryParamBinder};
    use crate::object::receiver;
    use crate::request::{BufferedResponse, PlainRequest};
    use std::any::Any;

    struct Widget {
        label: String,
    }

    impl Object for Widget {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn type_name(&self) -> &'static str {
            "Widget"
        }
    }

    fn label_member() -> Member {
        MemberDef::property("label", |node, _inv| {
            let w = receiver::<Widget>(node)?;
            assert!(!w.label.is_empty());
            Ok(CallResult::Child(None))
        })
        .into()
    }

    #[test]
    fn derived_token_strips_prefix_and_lowercases() {
        assert_eq!(derived_token("do_Submit", "do_").as_deref(), Some("submit"));
        assert_eq!(derived_token("get_job", "get_").as_deref(), Some("job"));
        assert_eq!(derived_token("label", "do_"), None);
        assert_eq!(derived_token("do_", "do_"), None);
    }

    #[test]
    fn explicit_tokens_replace_derived_name() {
        let m: Member = MemberDef::instance("do_submit", vec![], |_, _| Ok(CallResult::Done))
            .with_tokens(&["send", "submit"])
            .into();
        assert_eq!(
            m.route_tokens("do_"),
            Some(vec!["send".to_owned(), "submit".to_owned()])
        );
    }

    #[test]
    fn guarded_member_denies_without_role() {
        let m = Member::guarded("admin", label_member());
        let req = PlainRequest::new("/");
        let mut rsp = BufferedResponse::new();
        let chain = AncestorChain::new();
        let node = Widget {
            label: "x".to_owned(),
        };
        let mut inv = Invocation {
            request: &req,
            response: &mut rsp,
            ancestors: &chain,
            args: Vec::new(),
        };
        match m.invoke(&node, &mut inv) {
            Err(InvokeError::AccessDenied { role }) => assert_eq!(role, "admin"),
            other => panic!("expected AccessDenied, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn guarded_member_invokes_with_role() {
        let m = Member::guarded("admin", label_member());
        let req = PlainRequest::new("/").with_role("admin");
        let mut rsp = BufferedResponse::new();
        let chain = AncestorChain::new();
        let node = Widget {
            label: "x".to_owned(),
        };
        let mut inv = Invocation {
            request: &req,
            response: &mut rsp,
            ancestors: &chain,
            args: Vec::new(),
        };
        assert!(m.invoke(&node, &mut inv).is_ok());
    }

    #[test]
    fn bind_and_invoke_passes_lead_args_in_order() {
        let m: Member = MemberDef::instance(
            "get_entry",
            vec![Param::str(), Param::int()],
            |_, inv| {
                assert_eq!(inv.str_arg(0)?, "alpha");
                assert_eq!(inv.int_arg(1)?, 7);
                Ok(CallResult::Child(None))
            },
        )
        .into();
        let req = PlainRequest::new("/");
        let mut rsp = BufferedResponse::new();
        let chain = AncestorChain::new();
        let node = Widget {
            label: "x".to_owned(),
        };
        let result = m.bind_and_invoke(
            &node,
            &req,
            &mut rsp,
            &chain,
            vec![BoundValue::Str("alpha".to_owned()), BoundValue::Int(7)],
            &QueryParamBinder,
            &NoSidecar,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn extension_member_strips_receiver_param() {
        let m: Member = MemberDef::extension(
            "get_owner",
            vec![Param::value("Widget"), Param::str()],
            |_, _| Ok(CallResult::Done),
        )
        .into();
        assert_eq!(m.params().len(), 1);
        assert!(matches!(m.params()[0].ty, ParamType::Str));
        assert_eq!(m.lead_arg_count(), 1);
    }
}
