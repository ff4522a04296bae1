//! fincheck CLI: check propositions by exhaustive search in finite models.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use fincheck::check::{CheckReport, ModelVerdict, check_document, check_formula};
use fincheck::config::CheckerConfig;
use fincheck::document::DocumentLibrary;
use fincheck::element::Element;
use fincheck::model::{FiniteModel, ModelKind};

#[derive(Parser)]
#[command(
    name = "fincheck",
    version,
    about = "Finite-model tautology checker for first-order formulas"
)]
struct Cli {
    /// Checker configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Models to check in (repeatable). Overrides the config.
    #[arg(long = "model", global = true)]
    models: Vec<String>,

    /// Give up after this many valuations per formula and model.
    #[arg(long, global = true)]
    max_iterations: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every proposition of a document.
    Check {
        /// Path to the document (TOML).
        document: PathBuf,

        /// Check propositions in parallel.
        #[arg(long)]
        parallel: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check a single formula given as an s-expression.
    Formula {
        /// e.g. "(OR (PREDVAR A) (NOT (PREDVAR A)))"
        expression: String,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the built-in models.
    Models,

    /// Write the effective configuration to a file.
    Config {
        /// Destination path.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => CheckerConfig::load(path)?,
        None => CheckerConfig::default(),
    };
    if !cli.models.is_empty() {
        config.models = cli
            .models
            .iter()
            .map(String::as_str)
            .map(ModelKind::parse)
            .collect::<std::result::Result<_, _>>()?;
    }
    if cli.max_iterations.is_some() {
        config.max_iterations = cli.max_iterations;
    }

    match cli.command {
        Commands::Check {
            document,
            parallel,
            json,
        } => {
            config.parallel |= parallel;
            let library = DocumentLibrary::load(&document)?;
            let report = check_document(&library, &config);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).into_diagnostic()?
                );
            } else {
                print_report(&report);
            }
            if !report.is_clean() {
                std::process::exit(1);
            }
        }

        Commands::Formula { expression, json } => {
            let formula = Element::parse(&expression)?;
            let results = check_formula(&formula, &config);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&results).into_diagnostic()?
                );
            } else {
                println!("{formula}");
                print_results(&results);
            }
            if !results.iter().all(|r| r.verdict.is_tautology()) {
                std::process::exit(1);
            }
        }

        Commands::Models => {
            for kind in ModelKind::ALL {
                let model = kind.build();
                println!("{kind} ({} entities)", model.entity_count());
                for meta in model.entities() {
                    println!("  {}  {}", meta.name, meta.description);
                }
                println!(
                    "  predicate pool: {} unary, {} binary",
                    model.predicate_pool_size(1),
                    model.predicate_pool_size(2)
                );
                println!(
                    "  function pool: {} unary, {} binary",
                    model.function_pool_size(1),
                    model.function_pool_size(2)
                );
                let predicates: Vec<String> = model
                    .predicate_constants()
                    .iter()
                    .map(|(key, _)| key.to_string())
                    .collect();
                let functions: Vec<String> = model
                    .function_constants()
                    .iter()
                    .map(|(key, _)| key.to_string())
                    .collect();
                println!("  predicate constants: {}", predicates.join(", "));
                println!("  function constants: {}", functions.join(", "));
            }
        }

        Commands::Config { path } => {
            config.save(&path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn print_report(report: &CheckReport) {
    println!("Document {}", report.document);
    for proposition in &report.propositions {
        let mark = if proposition.is_tautology() { "ok" } else { "FAIL" };
        println!("\n[{mark}] {}", proposition.label);
        println!("  {}", proposition.formula);
        print_results(&proposition.results);
    }
    println!(
        "\n{} propositions, {} falsified, {} errors",
        report.propositions.len(),
        report.falsified_count(),
        report.error_count()
    );
}

fn print_results(results: &[ModelVerdict]) {
    for result in results {
        println!("  {:<6} {}", result.model.to_string(), result.verdict);
    }
}
