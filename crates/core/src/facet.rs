//! The facet extension point.
//!
//! A facet is a pluggable capability provider for one view domain. The
//! engine calls it at exactly two points: during table construction, to
//! contribute dispatch rules for a type (after action rules, before
//! everything else), and on the empty-token path, to serve an index view
//! for a node's type chain. The engine knows nothing else about view
//! technologies.

use crate::engine::DispatchContext;
use crate::error::DispatchError;
use crate::object::Object;
use crate::rules::Rule;

/// What a facet gets to see about the type a table is being built for.
#[derive(Debug, Clone)]
pub struct TypeProfile {
    pub type_name: &'static str,
    /// View lookup names, most-derived first.
    pub ancestry: Vec<&'static str>,
}

/// A pluggable provider of view rules and index views.
pub trait Facet: Send + Sync {
    /// Append zero or more rules for this type. Facets are consulted in
    /// registration order.
    fn contribute_rules(&self, profile: &TypeProfile, rules: &mut Vec<Rule>);

    /// Serve the index view for `node`, if one exists. `Ok(true)` means
    /// a view was rendered and dispatch is complete.
    fn serve_index(
        &self,
        ctx: &mut DispatchContext<'_>,
        node: &dyn Object,
    ) -> Result<bool, DispatchError>;
}
