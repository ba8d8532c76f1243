//! quoteform CLI
//!
//! Command-line interface for:
//! - Compiling the insurance-quote ontology into a form schema
//! - Checking the ontology for recoverable defects (diagnostics)
//! - Validating a form submission against the compiled schema
//! - Serving the published schema over HTTP with hot reload

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;

use quoteform_schema::{
    validate_submission, CompileOutcome, Compiler, SectionId, Submission,
};

mod config;
mod logging;
mod server;

use config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(name = "quoteform")]
#[command(
    author,
    version,
    about = "quoteform: compile insurance-quote ontologies into form schemas"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// JSON config file (`{"compiler": {...}, "serve": {...}}`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the ontology documents.
    #[arg(long, global = true, env = "QUOTEFORM_ONTOLOGY_DIR")]
    ontology_dir: Option<PathBuf>,

    /// Ontology document, relative to the ontology dir. Repeat to list
    /// several; order is significant. Replaces the configured list.
    #[arg(long = "document", global = true)]
    documents: Vec<PathBuf>,

    /// Accepted namespace prefix. Repeat for several. Replaces the
    /// configured list.
    #[arg(long = "prefix", global = true)]
    prefixes: Vec<String>,

    /// Debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            ontology_dir: self.ontology_dir.clone(),
            documents: self.documents.clone(),
            accepted_prefixes: self.prefixes.clone(),
        }
    }

    fn app_config(&self) -> Result<AppConfig> {
        AppConfig::resolve(self.config.as_deref(), &self.overrides())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the ontology and print (or write) the schema JSON.
    Compile {
        /// Write the schema here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Fail if the compile produced any diagnostic.
        #[arg(long)]
        strict: bool,
        /// Single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Compile the ontology and report diagnostics.
    Check {
        /// Exit non-zero when there is at least one diagnostic.
        #[arg(long)]
        deny_diagnostics: bool,
        /// Print diagnostics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate a JSON submission against the compiled schema.
    ///
    /// The input is `{"section": ..., "fields": {...}}`, or a bare field map
    /// when `--section` is given. Use `-` to read stdin.
    Validate {
        input: PathBuf,
        #[arg(long)]
        section: Option<SectionId>,
    },

    /// Serve the published schema over HTTP.
    Serve {
        /// Listen address (overrides the config file).
        #[arg(long)]
        listen: Option<SocketAddr>,
        /// Poll the source documents and reload when they change.
        #[arg(long)]
        watch: bool,
        /// Write `{addr, pid}` here once listening.
        #[arg(long)]
        ready_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.global.verbose);
    let config = cli.global.app_config()?;

    match cli.command {
        Commands::Compile {
            out,
            strict,
            compact,
        } => cmd_compile(&config, out.as_ref(), strict, compact),
        Commands::Check {
            deny_diagnostics,
            json,
        } => cmd_check(&config, deny_diagnostics, json),
        Commands::Validate { input, section } => cmd_validate(&config, &input, section),
        Commands::Serve {
            listen,
            watch,
            ready_file,
        } => server::cmd_serve(
            config,
            server::ServeOptions {
                listen,
                watch,
                ready_file,
            },
        ),
    }
}

fn compile(config: &AppConfig) -> Result<CompileOutcome> {
    let compiler = Compiler::from_config(&config.compiler)?;
    compiler.compile().with_context(|| {
        format!(
            "failed to compile ontology in {}",
            config.compiler.ontology_dir.display()
        )
    })
}

fn cmd_compile(
    config: &AppConfig,
    out: Option<&PathBuf>,
    strict: bool,
    compact: bool,
) -> Result<()> {
    let outcome = compile(config)?;
    if strict && !outcome.diagnostics.is_empty() {
        return Err(anyhow!(
            "compile produced {} diagnostic(s) (--strict); run `quoteform check` for details",
            outcome.diagnostics.len()
        ));
    }

    let json = if compact {
        serde_json::to_string(&outcome.schema)?
    } else {
        serde_json::to_string_pretty(&outcome.schema)?
    };

    match out {
        Some(out) => {
            fs::write(out, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!(
                "{} {} ({} fields, {} diagnostics)",
                "wrote".green().bold(),
                out.display().to_string().bold(),
                outcome.schema.field_count(),
                outcome.diagnostics.len()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_check(config: &AppConfig, deny_diagnostics: bool, json: bool) -> Result<()> {
    let outcome = compile(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.diagnostics)?);
    } else {
        for section in outcome.schema.sections.values() {
            println!(
                "  {} {}: {} fields",
                "→".yellow(),
                section.title.cyan(),
                section.fields.len()
            );
        }
        for diagnostic in &outcome.diagnostics {
            println!("{} {}", "warning:".yellow().bold(), diagnostic);
        }
        let summary = format!(
            "{} documents, {} fields, {} diagnostics",
            outcome.documents.len(),
            outcome.schema.field_count(),
            outcome.diagnostics.len()
        );
        if outcome.diagnostics.is_empty() {
            println!("{} {summary}", "ok".green().bold());
        } else {
            println!("{} {summary}", "done".yellow().bold());
        }
    }

    if deny_diagnostics && !outcome.diagnostics.is_empty() {
        return Err(anyhow!(
            "{} diagnostic(s) with --deny-diagnostics",
            outcome.diagnostics.len()
        ));
    }
    Ok(())
}

fn cmd_validate(config: &AppConfig, input: &PathBuf, section: Option<SectionId>) -> Result<()> {
    let text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read submission from stdin")?;
        buf
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let submission = match section {
        Some(section) => Submission {
            section,
            fields: serde_json::from_str(&text).context("submission must be a JSON object")?,
        },
        None => serde_json::from_str(&text)
            .context("submission must be {\"section\": ..., \"fields\": {...}}")?,
    };

    let outcome = compile(config)?;
    let report = validate_submission(&outcome.schema, &submission);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.valid {
        eprintln!("{} submission for {}", "valid".green().bold(), submission.section);
        Ok(())
    } else {
        Err(anyhow!(
            "submission for {} has {} error(s)",
            submission.section,
            report.errors.len()
        ))
    }
}
