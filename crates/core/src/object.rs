//! The introspection surface node types expose to the dispatcher.
//!
//! Rust has no runtime reflection, so member discovery is an explicit
//! structural-capability query: a node type implements [`Object`] and
//! declares its members and capabilities there. The per-type dispatch
//! table is built from exactly this surface, once, and cached by the
//! type's `TypeId`.

use std::any::Any;
use std::sync::Arc;

use crate::descriptor::Member;
use crate::error::InvokeError;
use crate::request::{Request, Response};
use crate::tokens::TokenList;

/// Shared handle to a node in the object graph.
pub type ObjectRef = Arc<dyn Object>;

/// A node in the object graph.
///
/// `members()` and the capability accessors are type-level facts: every
/// instance of a type must answer them identically, because the dispatch
/// table built from the first instance encountered is reused for all of
/// them.
pub trait Object: Send + Sync + 'static {
    /// Downcast support; also the source of the `TypeId` cache key.
    fn as_any(&self) -> &dyn Any;

    /// Short type name used in traces, sidecar lookup, and view paths.
    fn type_name(&self) -> &'static str;

    /// The type's member descriptors: actions (`do_` prefix), selectors
    /// (`get_` prefix), and exposed properties (no prefix).
    fn members(&self) -> Vec<Member> {
        Vec::new()
    }

    /// Names used for view lookup, most-derived first. Types that wrap or
    /// extend another type list its name after their own so facets can
    /// fall back to the outer type's views.
    fn view_ancestry(&self) -> Vec<&'static str> {
        vec![self.type_name()]
    }

    /// Sequence capability: positional child lookup.
    fn as_sequence(&self) -> Option<&dyn SequenceNode> {
        None
    }

    /// Mapping capability: keyed child lookup.
    fn as_keyed(&self) -> Option<&dyn KeyedNode> {
        None
    }

    /// Catch-all action capability, tried after every other rule.
    fn as_dynamic_action(&self) -> Option<&dyn DynamicAction> {
        None
    }

    /// Catch-all selector capability, tried last.
    fn as_dynamic_selector(&self) -> Option<&dyn DynamicSelector> {
        None
    }
}

/// Positional child access for array-like and list-like nodes.
pub trait SequenceNode {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The child at `index`, or `None` when out of range.
    fn get(&self, index: usize) -> Option<ObjectRef>;
}

/// Keyed child access for map-like nodes.
pub trait KeyedNode {
    /// The child under `key`. A missing key is a non-match at dispatch
    /// time, not a failure.
    fn get(&self, key: &str) -> Option<ObjectRef>;
}

/// Last-resort catch-all: claims the entire remaining path and decides
/// itself what, if anything, to do with it.
pub trait DynamicAction {
    fn do_dynamic(
        &self,
        request: &dyn Request,
        response: &mut dyn Response,
        rest: &mut TokenList,
    ) -> Result<(), InvokeError>;
}

/// Catch-all selector: offered the next token, may resolve a child for
/// it. Returning `Ok(None)` declines; the token is pushed back and later
/// rules still see it.
pub trait DynamicSelector {
    fn get_dynamic(
        &self,
        token: &str,
        request: &dyn Request,
        response: &mut dyn Response,
    ) -> Result<Option<ObjectRef>, InvokeError>;
}

/// Downcast a receiver to its declaring type, for use inside member
/// closures.
pub fn receiver<T: Object>(node: &dyn Object) -> Result<&T, InvokeError> {
    node.as_any()
        .downcast_ref::<T>()
        .ok_or(InvokeError::Receiver {
            expected: std::any::type_name::<T>(),
        })
}
