//! Schema Compiler CLI
//!
//! Checks schema documents, prints compiled type systems and exports the
//! type dependency graph.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schema_compiler::config::{OutputFormat, SchemacConfig, CONFIG_FILE_NAME};
use schema_compiler::{Compiler, Schema, SchemaError, TypeGraph, TypeSystem};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "schemac")]
#[command(about = "Compile and inspect IPLD-style schema declarations")]
struct Cli {
    /// Config file to load on top of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile schema files and report every error
    Check {
        /// Schema files, or directories searched for *.json
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the compiled type system
    Show {
        /// Schema file
        file: PathBuf,

        /// Only print this type
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
    },

    /// Export the type dependency graph in DOT format
    Graph {
        /// Schema file
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Where to write it
        #[arg(default_value = CONFIG_FILE_NAME)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SchemacConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    debug!(?config, "loaded configuration");
    let compiler = Compiler::with_settings(config.compiler.clone());

    match cli.command {
        Commands::Check { paths } => {
            let files = collect_schema_files(&paths)?;
            if files.is_empty() {
                bail!("no schema files found");
            }

            let mut failed = 0;
            for file in &files {
                match compile_file(&compiler, file) {
                    Ok(ts) => println!(
                        "✅ {} - {} types ({} anonymous)",
                        file.display(),
                        ts.len(),
                        ts.anonymous_types().count()
                    ),
                    Err(SchemaError::Compile(errors)) => {
                        failed += 1;
                        println!("❌ {} - {} error(s)", file.display(), errors.len());
                        for error in &errors {
                            println!("   {}", error);
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        println!("❌ {} - {}", file.display(), e);
                    }
                }
            }

            println!();
            println!("{} checked, {} failed", files.len(), failed);
            if failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Show { file, type_name } => {
            let ts = compile_file(&compiler, &file)?;
            match type_name {
                Some(name) => match ts.get(&name) {
                    Some(ty) => println!("{}", ty),
                    None => bail!("type '{}' not found in {}", name, file.display()),
                },
                None => print_types(&ts, &config),
            }
            Ok(())
        }

        Commands::Graph { file, output } => {
            let ts = compile_file(&compiler, &file)?;
            let graph = TypeGraph::build(&ts);
            let dot = graph.to_dot();

            match output {
                Some(path) => {
                    std::fs::write(&path, &dot)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("✅ Exported DOT to: {}", path.display());
                    println!(
                        "   {} types, {} references, {} recursive group(s)",
                        graph.node_count(),
                        graph.edge_count(),
                        graph.recursive_groups().len()
                    );
                }
                None => print!("{}", dot),
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                SchemacConfig::default()
                    .save(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("✅ Wrote default configuration to: {}", path.display());
                Ok(())
            }
        },
    }
}

fn compile_file(compiler: &Compiler, path: &Path) -> Result<TypeSystem, SchemaError> {
    let schema = Schema::from_path(path)?;
    Ok(compiler.compile(&schema)?)
}

/// Expand directories into the JSON files beneath them, sorted
fn collect_schema_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "json")
                {
                    files.push(entry.into_path());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn print_types(ts: &TypeSystem, config: &SchemacConfig) {
    let types = ts
        .iter()
        .filter(|t| config.output.show_anonymous || !t.is_anonymous());
    match config.output.format {
        OutputFormat::Pretty => {
            for ty in types {
                println!("{}\n", ty);
            }
        }
        OutputFormat::Compact => {
            for ty in types {
                let repr = ty.representation_kind().map_or("kinded", |k| k.as_str());
                let marker = if ty.is_anonymous() { " (anonymous)" } else { "" };
                println!("{} {} -> {}{}", ty.name(), ty.type_kind(), repr, marker);
            }
        }
    }
}
