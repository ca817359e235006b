//! External collaborator seams for parameter binding.
//!
//! The core never constructs handler parameter values itself. Unfilled
//! parameters are delegated to a [`ParamBinder`], and parameter names come
//! from a per-member sidecar resource through [`SidecarNames`]. Both are
//! pluggable; the defaults cover tests and simple deployments.

use std::fs;
use std::path::PathBuf;

use crate::descriptor::{BoundValue, ParamMeta};
use crate::error::InvokeError;
use crate::request::Request;

/// Produces a value for one declared parameter that neither auto-injection
/// nor the path supplied.
pub trait ParamBinder: Send + Sync {
    /// `declared_type` is the descriptor's declared type name, `meta` its
    /// per-parameter metadata, `name` the parameter name when the sidecar
    /// resource knew it.
    fn bind(
        &self,
        request: &dyn Request,
        declared_type: &str,
        meta: &ParamMeta,
        name: Option<&str>,
    ) -> Result<BoundValue, InvokeError>;
}

/// Default binder: resolves parameters from query parameters by name.
///
/// Integer-declared parameters are parsed; everything else is passed
/// through as a JSON string value.
pub struct QueryParamBinder;

impl ParamBinder for QueryParamBinder {
    fn bind(
        &self,
        request: &dyn Request,
        declared_type: &str,
        _meta: &ParamMeta,
        name: Option<&str>,
    ) -> Result<BoundValue, InvokeError> {
        let name = name.ok_or_else(|| InvokeError::Binding {
            param: format!("<{declared_type}>"),
            reason: "parameter name unknown".to_owned(),
        })?;
        let raw = request.query(name).ok_or_else(|| InvokeError::Binding {
            param: name.to_owned(),
            reason: "no such query parameter".to_owned(),
        })?;
        match declared_type {
            "i64" | "int" => {
                let n: i64 = raw.parse().map_err(|_| InvokeError::Binding {
                    param: name.to_owned(),
                    reason: format!("`{raw}` is not an integer"),
                })?;
                Ok(BoundValue::Int(n))
            }
            _ => Ok(BoundValue::Value(serde_json::Value::String(raw))),
        }
    }
}

/// Loads the auxiliary parameter-name resource for one member: a
/// comma-separated name list keyed by declaring-type path and member name.
/// Absence is never an error.
pub trait SidecarNames: Send + Sync {
    fn load(&self, owner: &str, member: &str) -> Option<String>;
}

/// No sidecar resources at all; every member reports no names known.
pub struct NoSidecar;

impl SidecarNames for NoSidecar {
    fn load(&self, _owner: &str, _member: &str) -> Option<String> {
        None
    }
}

/// Filesystem sidecar: `<root>/<owner>/<member>.params`, one file per
/// member. Read failures demote to "no names known".
pub struct FileSidecar {
    root: PathBuf,
}

impl FileSidecar {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSidecar { root: root.into() }
    }
}

impl SidecarNames for FileSidecar {
    fn load(&self, owner: &str, member: &str) -> Option<String> {
        let path = self.root.join(owner).join(format!("{member}.params"));
        fs::read_to_string(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PlainRequest;

    #[test]
    fn query_binder_reads_by_name() {
        let req = PlainRequest::new("/").with_query("job", "deploy");
        let bound = QueryParamBinder
            .bind(&req, "String", &ParamMeta::default(), Some("job"))
            .expect("bind");
        assert_eq!(
            bound,
            BoundValue::Value(serde_json::Value::String("deploy".to_owned()))
        );
    }

    #[test]
    fn query_binder_parses_declared_integers() {
        let req = PlainRequest::new("/").with_query("count", "12");
        let bound = QueryParamBinder
            .bind(&req, "i64", &ParamMeta::default(), Some("count"))
            .expect("bind");
        assert_eq!(bound, BoundValue::Int(12));
    }

    #[test]
    fn query_binder_fails_without_a_name() {
        let req = PlainRequest::new("/");
        let err = QueryParamBinder
            .bind(&req, "String", &ParamMeta::default(), None)
            .unwrap_err();
        assert!(matches!(err, InvokeError::Binding { .. }));
    }
}
