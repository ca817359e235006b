//! The built-in demo object graph: a small build hub.
//!
//! Exercises every rule kind the dispatcher knows: prefixed actions with
//! explicit token overrides, an index action, plain and guarded
//! properties, string- and integer-argument selectors, keyed and
//! sequence structural access.
//!
//! Paths worth trying against it:
//!
//! - `/`                      index action
//! - `/healthz`               action with an explicit token override
//! - `/alpha/`                keyed project lookup
//! - `/project/alpha/`        string-argument selector
//! - `/alpha/builds/0/`       sequence access on a project's builds
//! - `/alpha/build/11/`       integer-argument selector (build number)
//! - `/settings/`             role-guarded property (needs `admin`)

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use tacker_core::{
    receiver, CallResult, DynamicSelector, InvokeError, KeyedNode, Member, MemberDef, Object,
    ObjectRef, Param, Request, Response, SequenceNode,
};

/// Root of the demo graph.
pub fn demo_root() -> ObjectRef {
    let mut projects = BTreeMap::new();
    for (name, numbers) in [("alpha", vec![10, 11]), ("beta", vec![7])] {
        projects.insert(name.to_owned(), Project::node(name, numbers));
    }
    Arc::new(Hub { projects })
}

struct Hub {
    projects: BTreeMap<String, Arc<Project>>,
}

impl Object for Hub {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Hub"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            MemberDef::instance("do_index", vec![Param::response()], |node, inv| {
                let hub = receiver::<Hub>(node)?;
                let names: Vec<&str> = hub.projects.keys().map(String::as_str).collect();
                inv.response
                    .write(&format!("hub: projects = {}", names.join(", ")));
                Ok(CallResult::Done)
            })
            .into(),
            MemberDef::instance(
                "do_ping",
                vec![Param::request(), Param::response()],
                |_, inv| {
                    inv.response.write("pong");
                    Ok(CallResult::Done)
                },
            )
            .with_tokens(&["ping", "healthz"])
            .into(),
            MemberDef::instance("get_project", vec![Param::str()], |node, inv| {
                let hub = receiver::<Hub>(node)?;
                let name = inv.str_arg(0)?;
                Ok(CallResult::Child(
                    hub.projects.get(name).map(|p| Arc::clone(p) as ObjectRef),
                ))
            })
            .into(),
            Member::guarded(
                "admin",
                MemberDef::property("settings", |_, _| {
                    Ok(CallResult::Child(Some(Arc::new(Settings) as ObjectRef)))
                }),
            ),
        ]
    }

    fn as_keyed(&self) -> Option<&dyn KeyedNode> {
        Some(self)
    }
}

impl KeyedNode for Hub {
    fn get(&self, key: &str) -> Option<ObjectRef> {
        self.projects.get(key).map(|p| Arc::clone(p) as ObjectRef)
    }
}

struct Project {
    name: String,
    builds: Vec<Arc<Build>>,
}

impl Project {
    fn node(name: &str, numbers: Vec<i64>) -> Arc<Project> {
        let builds = numbers
            .into_iter()
            .map(|number| {
                Arc::new(Build {
                    project: name.to_owned(),
                    number,
                })
            })
            .collect();
        Arc::new(Project {
            name: name.to_owned(),
            builds,
        })
    }
}

impl Object for Project {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Project"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            MemberDef::instance("do_index", vec![Param::response()], |node, inv| {
                let project = receiver::<Project>(node)?;
                inv.response.write(&format!(
                    "project {} ({} builds)",
                    project.name,
                    project.builds.len()
                ));
                Ok(CallResult::Done)
            })
            .into(),
            MemberDef::property("builds", |node, _| {
                let project = receiver::<Project>(node)?;
                Ok(CallResult::Child(Some(Arc::new(BuildList {
                    builds: project.builds.clone(),
                }) as ObjectRef)))
            })
            .into(),
            // lookup by build number, not list position
            MemberDef::instance("get_build", vec![Param::int()], |node, inv| {
                let project = receiver::<Project>(node)?;
                let number = inv.int_arg(0)?;
                Ok(CallResult::Child(
                    project
                        .builds
                        .iter()
                        .find(|b| b.number == number)
                        .map(|b| Arc::clone(b) as ObjectRef),
                ))
            })
            .into(),
        ]
    }
}

struct BuildList {
    builds: Vec<Arc<Build>>,
}

impl Object for BuildList {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "BuildList"
    }

    fn as_sequence(&self) -> Option<&dyn SequenceNode> {
        Some(self)
    }

    fn as_dynamic_selector(&self) -> Option<&dyn DynamicSelector> {
        Some(self)
    }
}

impl SequenceNode for BuildList {
    fn len(&self) -> usize {
        self.builds.len()
    }

    fn get(&self, index: usize) -> Option<ObjectRef> {
        self.builds.get(index).map(|b| Arc::clone(b) as ObjectRef)
    }
}

impl DynamicSelector for BuildList {
    fn get_dynamic(
        &self,
        token: &str,
        _request: &dyn Request,
        _response: &mut dyn Response,
    ) -> Result<Option<ObjectRef>, InvokeError> {
        // `latest` as a convenience alias for the newest build
        if token == "latest" {
            return Ok(self.builds.last().map(|b| Arc::clone(b) as ObjectRef));
        }
        Ok(None)
    }
}

struct Build {
    project: String,
    number: i64,
}

impl Object for Build {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Build"
    }

    fn members(&self) -> Vec<Member> {
        vec![MemberDef::instance("do_index", vec![Param::response()], |node, inv| {
            let build = receiver::<Build>(node)?;
            inv.response.write(
                &serde_json::json!({
                    "project": build.project,
                    "number": build.number,
                })
                .to_string(),
            );
            Ok(CallResult::Done)
        })
        .into()]
    }
}

struct Settings;

impl Object for Settings {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Settings"
    }

    fn members(&self) -> Vec<Member> {
        vec![MemberDef::instance("do_index", vec![Param::response()], |_, inv| {
            inv.response.write("settings");
            Ok(CallResult::Done)
        })
        .into()]
    }
}
