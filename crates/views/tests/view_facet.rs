//! End-to-end behavior of the filesystem view facet: sibling view
//! lookup, index views, ancestry fallback, and facet precedence
//! relative to property rules.

use std::any::Any;
use std::fs;
use std::sync::Arc;

use tacker_core::{
    BufferedResponse, CallResult, DispatchReport, Engine, EngineConfig, Member, MemberDef, Object,
    ObjectRef, Outcome, PlainRequest, Response,
};
use tacker_views::FileViewFacet;
use tempfile::TempDir;

struct Dashboard;

impl Object for Dashboard {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Dashboard"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            // competes with the `summary` view file; the view must win
            // because facet rules precede property rules
            MemberDef::property("summary", |_, _| {
                Ok(CallResult::Child(Some(Arc::new(Dashboard) as ObjectRef)))
            })
            .into(),
        ]
    }
}

/// Wraps `Dashboard` and inherits its views through the ancestry.
struct Wallboard;

impl Object for Wallboard {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Wallboard"
    }

    fn view_ancestry(&self) -> Vec<&'static str> {
        vec!["Wallboard", "Dashboard"]
    }
}

fn view_root() -> TempDir {
    let dir = TempDir::new().expect("temp view root");
    let dash = dir.path().join("Dashboard");
    fs::create_dir_all(&dash).expect("view dir");
    fs::write(dash.join("summary.html"), "summary view").expect("view file");
    fs::write(dash.join("index.html"), "index view").expect("view file");
    dir
}

fn run(root: ObjectRef, views: &TempDir, path: &str) -> (DispatchReport, BufferedResponse) {
    let mut engine = Engine::new(EngineConfig {
        no_cache: true,
        trace: true,
    });
    engine.add_facet(Arc::new(FileViewFacet::new(views.path())));
    let req = PlainRequest::new(path);
    let mut rsp = BufferedResponse::new();
    let report = engine.dispatch(root, &req, &mut rsp).expect("dispatch");
    (report, rsp)
}

#[test]
fn sibling_view_serves_and_consumes_the_token() {
    let views = view_root();
    let (report, rsp) = run(Arc::new(Dashboard), &views, "/summary");
    assert_eq!(report.outcome, Outcome::Dispatched);
    assert_eq!(rsp.body(), "summary view");
}

#[test]
fn missing_view_falls_through_to_later_rules() {
    let views = view_root();
    // no `jobs` view exists and no member matches either
    let (report, rsp) = run(Arc::new(Dashboard), &views, "/jobs");
    assert_eq!(report.outcome, Outcome::NotFound);
    assert_eq!(rsp.status(), 404);
}

#[test]
fn index_view_serves_on_the_empty_token_path() {
    let views = view_root();
    let (report, rsp) = run(Arc::new(Dashboard), &views, "/");
    assert_eq!(report.outcome, Outcome::IndexServed);
    assert_eq!(rsp.body(), "index view");
}

#[test]
fn index_fallback_without_a_view_is_forbidden() {
    let views = TempDir::new().expect("empty view root");
    let (report, rsp) = run(Arc::new(Dashboard), &views, "/");
    assert_eq!(report.outcome, Outcome::Forbidden);
    assert_eq!(rsp.status(), 403);
}

#[test]
fn ancestry_fallback_finds_the_wrapped_types_views() {
    let views = view_root();
    let (report, rsp) = run(Arc::new(Wallboard), &views, "/summary");
    assert_eq!(report.outcome, Outcome::Dispatched);
    assert_eq!(rsp.body(), "summary view");

    let (report, rsp) = run(Arc::new(Wallboard), &views, "/");
    assert_eq!(report.outcome, Outcome::IndexServed);
    assert_eq!(rsp.body(), "index view");
}
