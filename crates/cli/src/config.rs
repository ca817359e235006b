//! `tacker.toml` configuration, threaded explicitly into engine
//! construction. Every section is optional; the defaults give a cached,
//! untraced engine with no view root and no sidecar resources.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tacker_core::EngineConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    pub views: Option<ViewsSection>,
    pub binding: Option<BindingSection>,
    #[serde(default)]
    pub serve: ServeSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct EngineSection {
    /// Rebuild dispatch tables on every lookup (live-reload development).
    #[serde(default)]
    pub no_cache: bool,
    /// Record per-request evaluation traces.
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Deserialize)]
pub struct ViewsSection {
    /// Directory holding `<type name>/<view>.<extension>` files.
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Deserialize)]
pub struct BindingSection {
    /// Directory holding `<type name>/<member>.params` name lists.
    pub params_root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeSection {
    fn default() -> Self {
        ServeSection {
            port: default_port(),
        }
    }
}

fn default_extension() -> String {
    "html".to_owned()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            no_cache: self.engine.no_cache,
            trace: self.engine.trace,
        }
    }
}

/// Load configuration. An explicit path must exist and parse; without
/// one, `tacker.toml` in the working directory is used when present,
/// otherwise the defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config, String> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let fallback = PathBuf::from("tacker.toml");
            if !fallback.is_file() {
                return Ok(Config::default());
            }
            fallback
        }
    };
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| format!("cannot parse {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_cached_and_untraced() {
        let config = Config::default();
        let ec = config.engine_config();
        assert!(!ec.no_cache);
        assert!(!ec.trace);
        assert_eq!(config.serve.port, 8080);
    }

    #[test]
    fn parses_every_section() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            no_cache = true
            trace = true

            [views]
            root = "views"
            extension = "tpl"

            [binding]
            params_root = "params"

            [serve]
            port = 9090
            "#,
        )
        .expect("parse");
        assert!(config.engine.no_cache);
        assert!(config.engine.trace);
        assert_eq!(config.views.expect("views").extension, "tpl");
        assert_eq!(config.serve.port, 9090);
    }
}
