//! tripledir CLI: import, export and check file-per-triple ontology stores
//!
//! Logs go to stderr; results go to stdout as a table or as JSON.
//! Exit status: 0 on success, 1 on a fatal error, 2 when the command
//! finished but reported data-integrity errors.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tripledir::pipeline::{export_to_string, ExportStats};
use tripledir::{
    identifier_for, import, relink, statement_identifier, validate, verify, ImportOptions,
    ImportStats, ItemError, PrefixRegistry, RdfFormat, RecordStore, RelinkStats, Severity,
    ValidationReport, VerifyOptions, VerifyReport,
};

#[derive(Parser)]
#[command(name = "tripledir", version, about = "File-per-triple RDF ontology store")]
struct Cli {
    /// Store root directory
    #[arg(long, default_value = ".", global = true, env = "TRIPLEDIR_ROOT")]
    root: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ExportFormat {
    Ntriples,
    Turtle,
}

impl From<ExportFormat> for RdfFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Ntriples => RdfFormat::NTriples,
            ExportFormat::Turtle => RdfFormat::Turtle,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Import an RDF document
    Import {
        /// Source file (Turtle, RDF/XML, N-Triples, N3, JSON-LD, TriG, N-Quads)
        path: PathBuf,

        /// Prefix, also the directory name
        #[arg(long)]
        prefix: String,

        /// Namespace URI, overriding detection
        #[arg(long)]
        namespace: Option<String>,

        /// Source format, overriding detection
        #[arg(long)]
        format: Option<String>,

        /// Remove the prefix's records first
        #[arg(long)]
        clean: bool,

        /// Keep only literals in these languages (repeatable)
        #[arg(long = "lang")]
        languages: Vec<String>,
    },
    /// Export a prefix back to RDF
    Export {
        prefix: String,

        #[arg(long, default_value = "ntriples")]
        format: ExportFormat,

        /// Output file, stdout when absent
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check store consistency
    Validate {
        /// Limit reported issues to one prefix
        prefix: Option<String>,
    },
    /// Turn external references into wikilinks where records now exist
    Relink { prefix: Option<String> },
    /// Compare a source document with the export of its prefix
    Verify {
        path: PathBuf,

        #[arg(long)]
        prefix: String,

        #[arg(long)]
        format: Option<String>,

        #[arg(long = "lang")]
        languages: Vec<String>,
    },
    /// Print the identifier of a URI or of a canonical triple
    Id {
        #[arg(required_unless_present = "triple")]
        uri: Option<String>,

        #[arg(long, num_args = 3, value_names = ["SUBJECT", "PREDICATE", "OBJECT"], conflicts_with = "uri")]
        triple: Option<Vec<String>>,
    },
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(false) => {}
        Ok(true) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// `Ok(true)` when the command reported data-integrity errors
fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Import {
            path,
            prefix,
            namespace,
            format,
            clean,
            languages,
        } => {
            let options = ImportOptions {
                prefix: prefix.clone(),
                namespace: namespace.clone(),
                format: parse_format(format.as_deref())?,
                clean: *clean,
                languages: languages.clone(),
            };
            run_import(&cli.root, path, &options, cli.output)
        }
        Commands::Export { prefix, format, out } => {
            run_export(&cli.root, prefix, (*format).into(), out.as_deref(), cli.output)
        }
        Commands::Validate { prefix } => run_validate(&cli.root, prefix.as_deref(), cli.output),
        Commands::Relink { prefix } => run_relink(&cli.root, prefix.as_deref(), cli.output),
        Commands::Verify {
            path,
            prefix,
            format,
            languages,
        } => {
            let options = VerifyOptions {
                format: parse_format(format.as_deref())?,
                languages: languages.clone(),
            };
            run_verify(&cli.root, path, prefix, &options, cli.output)
        }
        Commands::Id { uri, triple } => {
            let id = match (uri, triple.as_deref()) {
                (_, Some([s, p, o])) => statement_identifier(s, p, o),
                (Some(uri), _) => identifier_for(uri),
                _ => anyhow::bail!("give a URI or --triple SUBJECT PREDICATE OBJECT"),
            };
            println!("{}", id);
            Ok(false)
        }
    }
}

fn parse_format(format: Option<&str>) -> Result<Option<RdfFormat>> {
    format
        .map(|f| f.parse::<RdfFormat>().context("invalid --format"))
        .transpose()
}

fn open(root: &Path) -> Result<(RecordStore, PrefixRegistry)> {
    let store = RecordStore::open(root)
        .with_context(|| format!("cannot open store at {}", root.display()))?;
    let registry = PrefixRegistry::load(root).context("cannot load prefix registry")?;
    Ok((store, registry))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn metrics_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value.clone()]);
    }
    table
}

fn print_errors(errors: &[ItemError]) {
    if errors.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Location", "Error"]);
    for error in errors {
        table.add_row(vec![error.location.clone(), error.message.clone()]);
    }
    println!("{}", table);
    println!("{} error(s)", errors.len());
}

fn run_import(root: &Path, path: &Path, options: &ImportOptions, output: OutputFormat) -> Result<bool> {
    let (store, mut registry) = open(root)?;
    let stats: ImportStats = import(&store, &mut registry, path, options)
        .with_context(|| format!("import of {} failed", path.display()))?;

    match output {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            let table = metrics_table(&[
                ("Prefix", stats.prefix.clone()),
                ("Namespace", stats.namespace.clone()),
                ("Format", stats.format.clone()),
                ("Triples parsed", stats.triples_parsed.to_string()),
                ("Skipped (language)", stats.skipped_language.to_string()),
                ("Skipped (foreign)", stats.skipped_foreign.to_string()),
                ("Skipped (unclassified)", stats.skipped_unclassified.to_string()),
                ("Namespace records", stats.namespaces.to_string()),
                ("Anchor records", stats.anchors.to_string()),
                ("Blank node records", stats.blank_nodes.to_string()),
                ("Statement records", stats.statements.to_string()),
                ("Created", stats.created.to_string()),
                ("Unchanged", stats.unchanged.to_string()),
            ]);
            println!("{}", table);
            print_errors(&stats.errors);
        }
    }
    Ok(!stats.errors.is_empty())
}

fn run_export(
    root: &Path,
    prefix: &str,
    format: RdfFormat,
    out: Option<&Path>,
    output: OutputFormat,
) -> Result<bool> {
    let (store, registry) = open(root)?;
    let (rdf, stats): (String, ExportStats) = export_to_string(&store, &registry, prefix, format)
        .with_context(|| format!("export of '{}' failed", prefix))?;

    match out {
        Some(path) => {
            std::fs::write(path, &rdf).with_context(|| format!("cannot write {}", path.display()))?;
            match output {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Table => {
                    println!(
                        "{}",
                        metrics_table(&[
                            ("Prefix", stats.prefix.clone()),
                            ("Statements", stats.statements.to_string()),
                            ("Triples", stats.triples.to_string()),
                            ("Output", path.display().to_string()),
                        ])
                    );
                    print_errors(&stats.errors);
                }
            }
        }
        // the RDF owns stdout; failures go to stderr
        None => {
            print!("{}", rdf);
            if let Some(summary) = export_summary(&stats) {
                eprintln!("{}", summary);
                for error in &stats.errors {
                    eprintln!("  {}: {}", error.location, error.message);
                }
            }
        }
    }
    Ok(!stats.errors.is_empty())
}

/// One-line failure summary for an export written to stdout
fn export_summary(stats: &ExportStats) -> Option<String> {
    if stats.errors.is_empty() {
        return None;
    }
    Some(format!(
        "{} of {} statement(s) in '{}' could not be exported",
        stats.errors.len(),
        stats.statements,
        stats.prefix
    ))
}

fn run_validate(root: &Path, prefix: Option<&str>, output: OutputFormat) -> Result<bool> {
    let (store, registry) = open(root)?;
    let report: ValidationReport = validate(&store, &registry, prefix)?;

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if report.issues.is_empty() {
                println!("No issues in {} records", report.stats.records);
            } else {
                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["Severity", "Kind", "Path", "Field", "Message"]);
                for issue in &report.issues {
                    table.add_row(vec![
                        issue.severity.to_string(),
                        issue.kind.to_string(),
                        issue.path.display().to_string(),
                        issue.field.clone().unwrap_or_default(),
                        issue.message.clone(),
                    ]);
                }
                println!("{}", table);
            }
            println!(
                "{} records, {} statements, {} external references: {} errors, {} warnings, {} info",
                report.stats.records,
                report.stats.statements,
                report.stats.external_references,
                report.count(Severity::Error),
                report.count(Severity::Warning),
                report.count(Severity::Info)
            );
        }
    }
    Ok(report.has_errors())
}

fn run_relink(root: &Path, prefix: Option<&str>, output: OutputFormat) -> Result<bool> {
    let (store, registry) = open(root)?;
    let stats: RelinkStats = relink(&store, &registry, prefix)?;

    match output {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            println!(
                "{}",
                metrics_table(&[
                    ("Statements", stats.statements.to_string()),
                    ("Rewritten", stats.rewritten.to_string()),
                    ("References linked", stats.references_linked.to_string()),
                    ("Aliases updated", stats.aliases_updated.to_string()),
                    ("Identifier mismatches", stats.identifier_mismatches.to_string()),
                ])
            );
            print_errors(&stats.errors);
        }
    }
    Ok(!stats.errors.is_empty())
}

fn run_verify(
    root: &Path,
    path: &Path,
    prefix: &str,
    options: &VerifyOptions,
    output: OutputFormat,
) -> Result<bool> {
    let (store, registry) = open(root)?;
    let report: VerifyReport = verify(&store, &registry, path, prefix, options)
        .with_context(|| format!("verification of {} failed", path.display()))?;

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "{}",
                metrics_table(&[
                    ("Source triples", report.source_triples.to_string()),
                    ("Expected triples", report.expected_triples.to_string()),
                    ("Exported triples", report.exported_triples.to_string()),
                    ("Matched", report.matched.to_string()),
                    ("Missing", report.missing.len().to_string()),
                    ("Extra", report.extra.len().to_string()),
                ])
            );
            for line in &report.missing {
                println!("- {}", line);
            }
            for line in &report.extra {
                println!("+ {}", line);
            }
            print_errors(&report.export_errors);
            println!(
                "{}",
                if report.is_equivalent() {
                    "Round trip OK"
                } else {
                    "Round trip FAILED"
                }
            );
        }
    }
    Ok(!report.is_equivalent() || !report.export_errors.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_summary_only_on_errors() {
        let mut stats = ExportStats {
            prefix: "ex".to_string(),
            statements: 4,
            triples: 3,
            ..Default::default()
        };
        assert_eq!(export_summary(&stats), None);

        stats
            .errors
            .push(ItemError::new("ex/broken.md", "object: unresolved reference"));
        assert_eq!(
            export_summary(&stats).as_deref(),
            Some("1 of 4 statement(s) in 'ex' could not be exported")
        );
    }
}
