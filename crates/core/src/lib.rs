//! tacker-core: convention-driven dispatch over an object graph.
//!
//! Resolves an incoming request path into a graph traversal without any
//! hand-written routing table. Each path segment is matched, in a fixed
//! precedence order, against the current node's declared members and
//! structural capabilities: callable actions, readable properties,
//! indexable collections, and catch-all fallbacks. The result is a
//! terminal handler invocation, a redirect, or a not-found/forbidden
//! outcome.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root:
//!
//! - [`Engine`], [`EngineConfig`] -- the recursive resolver and its
//!   process-wide configuration
//! - [`Object`] and the capability traits -- the introspection surface a
//!   node type implements
//! - [`Member`], [`MemberDef`], [`Param`] -- member descriptors
//! - [`Outcome`], [`DispatchReport`] -- what a dispatch terminates with
//! - [`Facet`] -- the view-technology extension point
//! - [`Request`], [`Response`] -- the transport-opaque surfaces

pub mod ancestor;
pub mod binder;
pub mod cache;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod facet;
pub mod object;
pub mod request;
pub mod rules;
pub mod table;
pub mod tokens;
pub mod trace;

pub use ancestor::{Ancestor, AncestorChain};
pub use binder::{FileSidecar, NoSidecar, ParamBinder, QueryParamBinder, SidecarNames};
pub use descriptor::{BoundValue, CallResult, Invocation, Member, MemberDef, Param, ParamType};
pub use engine::{DispatchContext, DispatchReport, Engine, EngineConfig, Outcome};
pub use error::{DispatchError, InvokeError, TokenError};
pub use facet::{Facet, TypeProfile};
pub use object::{
    receiver, DynamicAction, DynamicSelector, KeyedNode, Object, ObjectRef, SequenceNode,
};
pub use request::{BufferedResponse, PlainRequest, Request, Response};
pub use rules::{Rule, RuleOutcome};
pub use table::{DispatchTable, ACTION_PREFIX, INDEX_MEMBER, SELECTOR_PREFIX};
pub use tokens::TokenList;
pub use trace::EvaluationTrace;
