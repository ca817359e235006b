//! tacker-views: a filesystem-backed view facet.
//!
//! Contributes one dispatch rule per type: "does a sibling view file
//! exist for the next token". View files live under
//! `<root>/<type name>/<view name>.<extension>`, and lookup walks the
//! node's whole view ancestry, most-derived first, so a wrapping type
//! falls back to the views of the type it wraps. The same lookup serves
//! `index` views on the empty-token path.
//!
//! Rendering technology is out of scope for the dispatcher; the facet
//! delegates to a [`ViewRenderer`], and the default [`RawFileRenderer`]
//! just streams the file body to the response.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tacker_core::engine::DispatchContext;
use tacker_core::error::DispatchError;
use tacker_core::facet::{Facet, TypeProfile};
use tacker_core::object::Object;
use tacker_core::request::{Request, Response};
use tacker_core::rules::{Rule, RuleOutcome};
use tacker_core::Outcome;

/// Renders one located view file for one node.
pub trait ViewRenderer: Send + Sync {
    fn render(
        &self,
        view: &Path,
        node: &dyn Object,
        request: &dyn Request,
        response: &mut dyn Response,
    ) -> Result<(), DispatchError>;
}

/// Default renderer: the view file body is the response body.
pub struct RawFileRenderer;

impl ViewRenderer for RawFileRenderer {
    fn render(
        &self,
        view: &Path,
        _node: &dyn Object,
        _request: &dyn Request,
        response: &mut dyn Response,
    ) -> Result<(), DispatchError> {
        let body = fs::read_to_string(view).map_err(|e| DispatchError::View {
            view: view.display().to_string(),
            reason: e.to_string(),
        })?;
        response.write(&body);
        Ok(())
    }
}

/// Facet serving views from a directory tree keyed by type name.
pub struct FileViewFacet {
    root: PathBuf,
    extension: String,
    renderer: Arc<dyn ViewRenderer>,
}

impl FileViewFacet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileViewFacet {
            root: root.into(),
            extension: "html".to_owned(),
            renderer: Arc::new(RawFileRenderer),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

/// Walk the ancestry for `<root>/<type>/<name>.<ext>`; first hit wins.
fn locate(root: &Path, extension: &str, ancestry: &[&'static str], name: &str) -> Option<PathBuf> {
    for ty in ancestry {
        let candidate = root.join(ty).join(format!("{name}.{extension}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

impl Facet for FileViewFacet {
    fn contribute_rules(&self, profile: &TypeProfile, rules: &mut Vec<Rule>) {
        let root = self.root.clone();
        let extension = self.extension.clone();
        let ancestry = profile.ancestry.clone();
        let renderer = Arc::clone(&self.renderer);
        rules.push(Rule::new("sibling view", move |_engine, ctx, node| {
            let Some(next) = ctx.tokens.peek().map(str::to_owned) else {
                return Ok(RuleOutcome::NoMatch);
            };
            let Some(view) = locate(&root, &extension, &ancestry, &next) else {
                return Ok(RuleOutcome::NoMatch);
            };
            let _ = ctx.tokens.next();
            ctx.trace
                .record_with(|| format!("   view `{next}` on <{}>", node.type_name()));
            tracing::debug!(view = %view.display(), "rendering sibling view");
            renderer.render(&view, node, ctx.request, &mut *ctx.response)?;
            Ok(RuleOutcome::Done(Outcome::Dispatched))
        }));
    }

    fn serve_index(
        &self,
        ctx: &mut DispatchContext<'_>,
        node: &dyn Object,
    ) -> Result<bool, DispatchError> {
        let ancestry = node.view_ancestry();
        let Some(view) = locate(&self.root, &self.extension, &ancestry, "index") else {
            return Ok(false);
        };
        ctx.trace
            .record_with(|| format!("   index view on <{}>", node.type_name()));
        tracing::debug!(view = %view.display(), "rendering index view");
        self.renderer
            .render(&view, node, ctx.request, &mut *ctx.response)?;
        Ok(true)
    }
}
