//! Thrifty CLI
//!
//! Decodes Thrift messages to JSON and inspects IDL documents.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use thrifty::{
    split_qualified_name, MissingPolicy, Protocol, SchemaRegistry, SchemaSources, ThriftyConfig,
    Transcoder,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thrifty")]
#[command(about = "Decode Thrift messages to JSON using IDL schemas")]
struct Cli {
    /// Config file (defaults to thrifty.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SchemaArgs {
    /// IDL file to load (repeatable)
    #[arg(short, long = "schema")]
    schemas: Vec<PathBuf>,

    /// Directory searched recursively for .thrift files (repeatable)
    #[arg(short = 'd', long = "schema-dir")]
    schema_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode one message and print it as JSON
    Decode {
        /// Root struct, bare or qualified (e.g. sh.batch.schema.Account)
        #[arg(short, long)]
        root: String,

        #[command(flatten)]
        schemas: SchemaArgs,

        /// Message file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Wire protocol (binary or compact)
        #[arg(short, long)]
        protocol: Option<Protocol>,

        /// Print {} instead of failing when the root struct is unknown
        #[arg(long)]
        lenient: bool,

        /// Nesting limit for structs and containers
        #[arg(long)]
        max_depth: Option<usize>,

        /// Emit null for absent fields instead of omitting them
        #[arg(long)]
        null_missing: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Summarize the structs, enums and typedefs of the loaded IDL
    Inspect {
        #[command(flatten)]
        schemas: SchemaArgs,

        /// Print the full registry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split a qualified struct name into namespace and struct
    Split {
        /// Qualified name, e.g. incfile.Account
        qualified: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ThriftyConfig::load_from(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Decode {
            root,
            schemas,
            input,
            protocol,
            lenient,
            max_depth,
            null_missing,
            pretty,
        } => {
            let registry = load_registry(&config, &schemas)?;

            let mut options = config.decode_options();
            if let Some(protocol) = protocol {
                options.protocol = protocol;
            }
            if let Some(max_depth) = max_depth {
                options.mapping.max_depth = max_depth;
            }
            if null_missing {
                options.mapping.missing = MissingPolicy::Null;
            }
            options.pretty |= pretty;

            let wire = read_input(input.as_ref())?;
            let transcoder = Transcoder::new(&registry).with_options(options);
            let json = if lenient || config.decode.lenient {
                transcoder.decode_or_empty(&wire, &root)?
            } else {
                transcoder.decode(&wire, &root)?
            };

            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&json)?;
            writeln!(stdout)?;
            Ok(())
        }

        Commands::Inspect { schemas, json } => {
            let registry = load_registry(&config, &schemas)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&registry)?);
            } else {
                print_summary(&registry);
            }
            Ok(())
        }

        Commands::Split { qualified } => {
            let (name, namespace) = split_qualified_name(&qualified)?;
            println!("namespace: {}", namespace);
            println!("struct:    {}", name);
            Ok(())
        }
    }
}

fn load_registry(config: &ThriftyConfig, args: &SchemaArgs) -> anyhow::Result<SchemaRegistry> {
    let mut paths = config.schemas.paths.clone();
    paths.extend(args.schemas.iter().cloned());
    let mut dirs = config.schemas.dirs.clone();
    dirs.extend(args.schema_dirs.iter().cloned());

    let sources = SchemaSources::load(&paths, &dirs).context("Failed to load IDL documents")?;
    if sources.is_empty() {
        bail!("no IDL documents given (use --schema, --schema-dir or [schemas] in thrifty.toml)");
    }
    Ok(sources.build_registry()?)
}

fn read_input(input: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    match input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_summary(registry: &SchemaRegistry) {
    println!("Namespace:   {}", registry.namespace().unwrap_or("-"));
    println!("Fingerprint: {}", registry.fingerprint());
    println!("Documents:   {}", registry.documents().len());
    for (id, info) in registry.documents() {
        if info.includes.is_empty() {
            println!("  {}", id);
        } else {
            println!("  {} (includes {})", id, info.includes.join(", "));
        }
    }

    println!();
    println!("Structs ({}):", registry.structs().len());
    for (name, def) in registry.structs() {
        let marker = if registry.recursive_structs().contains(name) {
            " [recursive]"
        } else {
            ""
        };
        println!("  {}{}", name, marker);
        for field in &def.fields {
            println!("    {:>3}: {} {}", field.id, field.field_type, field.name);
        }
    }

    println!();
    println!("Enums ({}):", registry.enums().len());
    for (name, def) in registry.enums() {
        let labels: Vec<String> = def
            .values
            .iter()
            .map(|(ordinal, label)| format!("{}={}", label, ordinal))
            .collect();
        println!("  {} {{ {} }}", name, labels.join(", "));
    }

    println!();
    println!("Typedefs ({}):", registry.typedefs().len());
    for (alias, def) in registry.typedefs() {
        println!("  {} -> {}", alias, def.target);
    }
}
