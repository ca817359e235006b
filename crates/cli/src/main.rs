mod config;
mod demo;
mod resolve;
mod serve;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tacker_core::{Engine, EngineConfig, FileSidecar};
use tacker_views::FileViewFacet;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Convention-driven object-graph request dispatcher.
#[derive(Parser)]
#[command(
    name = "tacker",
    version,
    about = "Convention-driven object-graph request dispatcher"
)]
struct Cli {
    /// Path to a tacker.toml (defaults to ./tacker.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a path against the demo graph and print the outcome.
    ///
    /// Exit codes: 0 resolved, 3 forbidden, 4 not found, 1 dispatch
    /// failure, 2 usage error.
    Resolve {
        /// The request path, e.g. /alpha/builds/0/
        path: String,

        /// Role granted to the simulated caller (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Query parameter as name=value (repeatable)
        #[arg(long = "query")]
        query: Vec<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_enum)]
        output: OutputFormat,

        /// Force evaluation tracing on for this run
        #[arg(long)]
        trace: bool,
    },

    /// Serve the demo graph over HTTP
    Serve {
        /// Listen port (overrides the configured one)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    match cli.command {
        Commands::Resolve {
            path,
            roles,
            query,
            output,
            trace,
        } => {
            let mut engine_config = config.engine_config();
            if trace {
                engine_config.trace = true;
            }
            let engine = build_engine(engine_config, &config);

            let mut pairs = Vec::new();
            for raw in &query {
                match raw.split_once('=') {
                    Some((name, value)) => pairs.push((name.to_owned(), value.to_owned())),
                    None => {
                        eprintln!("--query expects name=value, got `{raw}`");
                        process::exit(2);
                    }
                }
            }

            let code = resolve::run(&engine, demo::demo_root(), &path, &roles, &pairs, output);
            process::exit(code);
        }

        Commands::Serve { port } => {
            let engine = build_engine(config.engine_config(), &config);
            let port = port.unwrap_or(config.serve.port);
            if let Err(e) = serve::run(engine, demo::demo_root(), port) {
                eprintln!("serve failed: {e}");
                process::exit(1);
            }
        }
    }
}

/// Assemble the engine from configuration: facets and sidecar resources
/// are optional, the core is not.
fn build_engine(engine_config: EngineConfig, config: &config::Config) -> Engine {
    let mut engine = Engine::new(engine_config);
    if let Some(views) = &config.views {
        engine.add_facet(Arc::new(
            FileViewFacet::new(&views.root).with_extension(views.extension.clone()),
        ));
    }
    if let Some(binding) = &config.binding {
        engine.set_sidecar(Arc::new(FileSidecar::new(&binding.params_root)));
    }
    engine
}
