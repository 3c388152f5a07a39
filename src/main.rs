//! wasmstack command line
//!
//! Usage: wasmstack module.wasm [--report json|text] [--invoke NAME [ARGS...]] [--verbose]

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wasmstack::parser::module::{ImportDesc, Module};
use wasmstack::{decode, instantiate, ImportObject, Input, ModuleReport, Value};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "wasmstack", version, about = "Decode, inspect and run WebAssembly 1.0 modules")]
struct Cli {
    /// Path to a .wasm binary
    file: PathBuf,

    /// Print a report of the decoded module (text by default when not invoking)
    #[arg(long, value_enum)]
    report: Option<ReportFormat>,

    /// Exported function to invoke
    #[arg(long, value_name = "NAME")]
    invoke: Option<String>,

    /// Arguments for --invoke, parsed according to the parameter types
    #[arg(requires = "invoke", allow_hyphen_values = true)]
    args: Vec<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

/// Bind every function import under `env` to a stub that prints its arguments.
fn print_imports(module: &Module) -> ImportObject {
    let mut imports = ImportObject::new();
    for import in &module.imports {
        let func_type = match (&import.desc, import.module.as_str()) {
            (ImportDesc::Function(type_index), "env") => module.types.get(*type_index as usize),
            _ => None,
        };
        let Some(func_type) = func_type.cloned() else {
            warn!(module = %import.module, name = %import.name, kind = import.desc.kind(), "import left unbound");
            continue;
        };
        let name = import.name.clone();
        let results = func_type.results.clone();
        imports.add_function("env", import.name.clone(), func_type, move |args, _| {
            let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
            info!(import = %name, "host call");
            println!("{}({})", name, rendered.join(", "));
            Ok(results.iter().map(|typ| Value::zero(*typ)).collect())
        });
    }
    imports
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&cli.file).map_err(|e| format!("error reading {}: {}", cli.file.display(), e))?;
    let module = decode(&bytes).map_err(|e| format!("error decoding {}: {}", cli.file.display(), e))?;

    let report = ModuleReport::new(&module);
    match (cli.report, &cli.invoke) {
        (Some(ReportFormat::Json), _) => println!("{}", report.to_json()?),
        (Some(ReportFormat::Text), _) | (None, None) => print!("{report}"),
        (None, Some(_)) => {}
    }

    if let Some(name) = &cli.invoke {
        let mut instance = instantiate(&module, &print_imports(&module))?;
        let inputs: Vec<Input> = cli.args.iter().map(|arg| Input::from(arg.as_str())).collect();
        let results = instance.invoke_inputs(name, &inputs)?;
        for value in results {
            println!("{value}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
