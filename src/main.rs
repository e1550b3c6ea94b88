//! inidoc: edit INI files without disturbing their formatting.
#![allow(clippy::multiple_crate_versions)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use inidoc::config::Config;
use inidoc::edit_plan::EditPlan;
use inidoc::{Document, LineKind};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inidoc")]
#[command(about = "Edit INI files without disturbing their formatting", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Match section and property names regardless of ASCII case
    #[arg(long, short = 'i', global = true)]
    case_insensitive: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the value of a property
    Get {
        /// INI file to read
        file: PathBuf,
        /// Property name
        name: String,
        /// Section holding the property; the global section if omitted
        #[arg(long, short = 's', default_value = "")]
        section: String,
    },
    /// Create or update a property
    Set {
        /// INI file to edit
        file: PathBuf,
        /// Property name
        name: String,
        /// New value
        value: String,
        /// Section holding the property; created if missing
        #[arg(long, short = 's', default_value = "")]
        section: String,
        /// Print the result instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove a property
    Remove {
        /// INI file to edit
        file: PathBuf,
        /// Property name
        name: String,
        /// Section holding the property
        #[arg(long, short = 's', default_value = "")]
        section: String,
        /// Print the result instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove a section with all its declarations and properties
    RemoveSection {
        /// INI file to edit
        file: PathBuf,
        /// Section to remove
        section: String,
        /// Print the result instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },
    /// List section names in declaration order
    Sections {
        /// INI file to read
        file: PathBuf,
    },
    /// Print sections and properties as JSON
    Dump {
        /// INI file to read
        file: PathBuf,
    },
    /// Report malformed lines; exits with status 1 if there are any
    Check {
        /// INI file to read
        file: PathBuf,
    },
    /// Apply an edit plan from a JSON file
    Apply {
        /// Edit plan to apply
        plan: PathBuf,
    },
}

#[derive(Serialize)]
struct SectionDump {
    name: String,
    properties: Vec<PropertyDump>,
}

#[derive(Serialize)]
struct PropertyDump {
    name: String,
    value: String,
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = Config::load();

    // Override config with command line args
    if args.case_insensitive {
        cfg.case_insensitive = true;
    }

    match args.command {
        Command::Get {
            file,
            name,
            section,
        } => {
            let document = open(&file, &cfg)?;
            let Some(value) = document.property(&section, &name) else {
                bail!("no property {name:?} in section {section:?}");
            };
            let mut stdout = io::stdout().lock();
            stdout.write_all(value)?;
            writeln!(stdout)?;
        }
        Command::Set {
            file,
            name,
            value,
            section,
            dry_run,
        } => {
            let mut document = open(&file, &cfg)?;
            document.set_property(&section, &name, &value)?;
            finish(&document, &file, dry_run)?;
        }
        Command::Remove {
            file,
            name,
            section,
            dry_run,
        } => {
            let mut document = open(&file, &cfg)?;
            if !document.remove_property(&section, &name)? {
                bail!("no property {name:?} in section {section:?}");
            }
            finish(&document, &file, dry_run)?;
        }
        Command::RemoveSection {
            file,
            section,
            dry_run,
        } => {
            let mut document = open(&file, &cfg)?;
            if !document.remove_section(&section)? {
                bail!("no section {section:?}");
            }
            finish(&document, &file, dry_run)?;
        }
        Command::Sections { file } => {
            let document = open(&file, &cfg)?;
            for name in document.sections() {
                println!("{name}");
            }
        }
        Command::Dump { file } => {
            let document = open(&file, &cfg)?;
            let json = serde_json::to_string_pretty(&dump(&document))?;
            println!("{json}");
        }
        Command::Check { file } => {
            let document = open(&file, &cfg)?;
            let malformed = malformed_lines(&document);
            for (number, text) in &malformed {
                println!("{}:{number}: {text}", file.display());
            }
            if !malformed.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Apply { plan } => {
            let plan = EditPlan::load(&plan)
                .with_context(|| format!("reading edit plan {}", plan.display()))?;
            plan.apply(&cfg)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open(file: &Path, cfg: &Config) -> Result<Document> {
    Document::load(file, cfg.document_options(), cfg.folding())
        .with_context(|| format!("loading {}", file.display()))
}

fn finish(document: &Document, file: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        document.write_to(&mut io::stdout().lock())?;
        return Ok(());
    }
    document
        .save(file)
        .with_context(|| format!("writing {}", file.display()))
}

fn dump(document: &Document) -> Vec<SectionDump> {
    let mut names = vec![""];
    names.extend(document.sections());
    names
        .into_iter()
        .map(|section| SectionDump {
            name: section.to_string(),
            properties: document
                .properties(section)
                .into_iter()
                .map(|property| PropertyDump {
                    name: String::from_utf8_lossy(property.name).into_owned(),
                    value: String::from_utf8_lossy(property.value).into_owned(),
                })
                .collect(),
        })
        .collect()
}

/// Malformed lines with their 1-based physical line numbers.
fn malformed_lines(document: &Document) -> Vec<(usize, String)> {
    let mut number = 1;
    let mut malformed = Vec::new();
    for line in document.lines() {
        if line.kind == LineKind::Malformed {
            let text = String::from_utf8_lossy(line.contents);
            malformed.push((number, text.trim_end().to_string()));
        }
        number += line.contents.iter().filter(|&&byte| byte == b'\n').count();
    }
    malformed
}
