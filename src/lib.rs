//! # vtmem
//!
//! Memory layout and atomic field access for value types.
//!
//! [`Runtime`] ties together a [`RuntimeConfig`], a [`TypeRegistry`], the
//! [`LayoutEngine`] that lays types out under that configuration, and a
//! [`Heap`] of live objects reachable through [`UnsafeAccess`].
//!
//! ## Configuration
//!
//! Options use the runtime's own spelling, e.g. `-Xcompressedrefs` or
//! `-XX:ValueTypeFlatteningThreshold=99999`, and can come from the command
//! line or from the `VTMEM_OPTIONS` environment variable.
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod fixtures;
pub mod report;

pub use error::CliError;
pub use fixtures::Fixtures;
pub use report::LayoutReport;
pub use vtmem_heap::{
    AccessError, CasOutcome, CasShape, FieldValue, Heap, ObjectRef, PrimitiveValue, UnsafeAccess,
};
pub use vtmem_layout::{
    AddressingMode, ConfigError, GcPolicy, LayoutEngine, LayoutError, RuntimeConfig,
};
pub use vtmem_types::{TypeDefinition, TypeDescriptor, TypeRegistry, TypeResolutionError};
pub use vtmem_utils::{ByteOffset, TypeId};

use vtmem_layout::config::OPTIONS_ENV_VAR;
use vtmem_utils::sync::Arc;

pub struct Runtime {
    engine: Arc<LayoutEngine>,
    heap: Heap,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_registry(config, Arc::new(TypeRegistry::new()))
    }

    pub fn with_registry(config: RuntimeConfig, registry: Arc<TypeRegistry>) -> Self {
        let engine = Arc::new(LayoutEngine::new(config, registry));
        Self {
            heap: Heap::new(Arc::clone(&engine)),
            engine,
        }
    }

    /// A runtime with the [`Fixtures`] types already defined.
    pub fn with_fixtures(config: RuntimeConfig) -> Result<(Self, Fixtures), TypeResolutionError> {
        let runtime = Self::new(config);
        let fixtures = Fixtures::define(runtime.registry())?;
        Ok((runtime, fixtures))
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.engine.config()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        self.engine.registry()
    }

    pub fn engine(&self) -> &Arc<LayoutEngine> {
        &self.engine
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn unsafe_access(&self) -> UnsafeAccess<'_> {
        UnsafeAccess::new(&self.heap)
    }

    pub fn layout_report(&self, ty: &TypeDescriptor) -> Result<LayoutReport, LayoutError> {
        LayoutReport::new(&self.engine, ty)
    }
}

/// Options from `VTMEM_OPTIONS` followed by `options`; later options win.
pub fn resolve_config(options: &[String]) -> Result<RuntimeConfig, ConfigError> {
    let env = match std::env::var(OPTIONS_ENV_VAR) {
        Ok(env) => env,
        Err(std::env::VarError::NotPresent) => String::new(),
        Err(e) => {
            return Err(ConfigError::Environment {
                name: OPTIONS_ENV_VAR.to_string(),
                reason: e.to_string(),
            })
        }
    };
    RuntimeConfig::from_args(
        env.split_whitespace()
            .chain(options.iter().map(String::as_str)),
    )
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, `warn` by default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Inspect value-type layouts under different runtime configurations"
)]
pub struct Args {
    /// Runtime option, e.g. -Xcompressedrefs. May be repeated.
    #[arg(
        short = 'O',
        long = "option",
        value_name = "OPTION",
        allow_hyphen_values = true,
        global = true
    )]
    pub options: Vec<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the layout of a fixture type, e.g. ValueTypePoint2D or ValueInt![]
    Layout {
        #[arg(value_name = "TYPE")]
        type_name: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved runtime configuration
    Options {
        #[arg(long)]
        json: bool,
    },
}

fn run(args: Args) -> Result<(), CliError> {
    let config = resolve_config(&args.options)?;
    debug!("running {:?} under {}", args.command, config);
    match args.command {
        Command::Layout { type_name, json } => {
            let (runtime, _) = Runtime::with_fixtures(config)?;
            let ty = runtime.registry().resolve(&type_name)?;
            let report = runtime.layout_report(&ty)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }
        Command::Options { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("{}", config);
            }
        }
    }
    Ok(())
}

pub fn run_cli() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
