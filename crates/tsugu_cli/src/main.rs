use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};
use tsugu_runtime::engine::{CallOutcome, WasmInstance, WasmModule};
use tsugu_runtime::signature::{Signature, ValueKind};
use tsugu_runtime::value::Value;

/// Load WebAssembly modules and drive their exported functions, answering
/// each relayed import call from the command line.
#[derive(Parser)]
#[command(name = "tsugu", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a module's declared imports and exports.
    Inspect {
        /// Path to a .wasm (or .wat) module.
        module: PathBuf,
        /// Emit JSON instead of a listing.
        #[arg(long)]
        json: bool,
    },
    /// Call an exported function, servicing suspended imports from the
    /// reply list.
    Run {
        /// Path to a .wasm (or .wat) module.
        module: PathBuf,
        /// Name of the exported function to call.
        function: String,
        /// Arguments, parsed against the export's parameter kinds.
        args: Vec<String>,
        /// Value handed to the next pending import; repeat for each
        /// suspension, in order.
        #[arg(long = "reply")]
        replies: Vec<String>,
    },
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "tsugu_runtime=info") };
    }

    let subscriber = tracing_subscriber::Registry::default()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env());
    subscriber.try_init()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { module, json } => inspect(&module, json),
        Command::Run {
            module,
            function,
            args,
            replies,
        } => run(&module, &function, &args, &replies),
    }
}

fn load_module(path: &Path) -> Result<WasmModule> {
    let wasm =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(WasmModule::load(&wasm)?)
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let module = load_module(path)?;

    if json {
        let out = serde_json::json!({
            "imports": module.imports(),
            "exports": module.exports(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("imports:");
    for import in module.imports() {
        match &import.signature {
            Some(sig) => println!("  {} {}.{} {}", import.kind, import.module, import.field, sig),
            None => println!("  {} {}.{}", import.kind, import.module, import.field),
        }
    }
    println!("exports:");
    for export in module.exports() {
        match &export.signature {
            Some(sig) => println!("  {} {} {}", export.kind, export.name, sig),
            None => println!("  {} {}", export.kind, export.name),
        }
    }
    Ok(())
}

fn run(path: &Path, function: &str, raw_args: &[String], raw_replies: &[String]) -> Result<()> {
    let module = Arc::new(load_module(path)?);
    let signature = module
        .export_signature(function)
        .with_context(|| format!("no exported function named `{function}`"))?
        .clone();
    if raw_args.len() != signature.params().len() {
        bail!(
            "`{function}` takes {} arguments, got {}",
            signature.params().len(),
            raw_args.len()
        );
    }
    let args = signature
        .params()
        .iter()
        .zip(raw_args)
        .enumerate()
        .map(|(index, (kind, raw))| {
            parse_value(*kind, raw).with_context(|| format!("argument {index}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut instance = WasmInstance::new(module)?;
    let mut replies = raw_replies.iter();
    let mut outcome = instance.call(function, &args)?;
    loop {
        match outcome {
            CallOutcome::Completed(value) => {
                println!("{value}");
                return Ok(());
            }
            CallOutcome::Suspended(call) => {
                let rendered = call
                    .args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                eprintln!(
                    "import {}.{} {} called with [{rendered}]",
                    call.module, call.field, call.signature
                );
                let value = match Signature::decode(&call.signature)?.result_kind() {
                    Some(kind) => {
                        let raw = replies.next().with_context(|| {
                            format!("no reply left for import {}.{}", call.module, call.field)
                        })?;
                        parse_value(kind, raw)
                            .with_context(|| format!("reply for {}.{}", call.module, call.field))?
                    }
                    // Result-less imports accept and discard any value.
                    None => Value::I32(0),
                };
                outcome = instance.resume(value)?;
            }
        }
    }
}

fn parse_value(kind: ValueKind, raw: &str) -> Result<Value> {
    let value = match kind {
        ValueKind::I32 => Value::I32(raw.parse()?),
        ValueKind::I64 => Value::I64(raw.parse()?),
        ValueKind::F32 => Value::F32(raw.parse()?),
        ValueKind::F64 => Value::F64(raw.parse()?),
        ValueKind::V128 => Value::V128(raw.parse()?),
        ValueKind::ExternRef | ValueKind::FuncRef => {
            bail!("reference kind `{kind}` has no textual form")
        }
    };
    Ok(value)
}
