//! mermaid-links - add mermaid.live links to Mermaid diagrams.
//!
//! # Usage
//!
//! ```bash
//! mermaid-links README.md > README.linked.md
//! mermaid-links --in-place docs/architecture.md
//! mermaid-links --links page.html
//! mermaid-links --edit-text Bearbeiten --fullscreen-text Vollbild --save
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mermaid_links::annotate::{annotate, collect_links};
use mermaid_links::config::{
    FileSettingsStore, SettingsOverrides, SettingsStore, global_config_path, load_layered,
    local_override_path,
};
use mermaid_links::document::{DocumentFormat, HtmlAnnotator, MarkdownAnnotator};
use mermaid_links::encoder;

/// Add mermaid.live edit and view links to Mermaid diagrams
#[derive(Parser, Debug)]
#[command(name = "mermaid-links", version, about, long_about = None)]
struct Cli {
    /// Markdown or HTML file to read (stdin when omitted or `-`)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Input format
    #[arg(long, value_enum, default_value = "auto")]
    format: DocumentFormat,

    /// Write the annotated document to this file instead of stdout
    #[arg(short, long, value_name = "PATH", conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Rewrite FILE with links added
    #[arg(short, long, requires = "file")]
    in_place: bool,

    /// Print each diagram's edit and view URLs instead of annotating
    #[arg(long, conflicts_with_all = ["encode", "decode"])]
    links: bool,

    /// Treat the whole input as one diagram and print its token
    #[arg(long, conflicts_with = "decode")]
    encode: bool,

    /// Decode a mermaid.live token (or `pako:` fragment) and print its payload
    #[arg(long, value_name = "TOKEN")]
    decode: Option<String>,

    /// Label for the edit link
    #[arg(long, value_name = "TEXT")]
    edit_text: Option<String>,

    /// Label for the full screen link
    #[arg(long, value_name = "TEXT")]
    fullscreen_text: Option<String>,

    /// Save the label flags as defaults in the global settings file
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in the global settings file
    #[arg(long)]
    clear: bool,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            edit_link_text: self.edit_text.clone(),
            fullscreen_link_text: self.fullscreen_text.clone(),
        }
    }

    fn input_path(&self) -> Option<&Path> {
        self.file.as_deref().filter(|p| p.as_os_str() != "-")
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            Ok(content)
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging; stdout carries the document.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Some(token) = &cli.decode {
        let payload = encoder::decode(token).context("Failed to decode token")?;
        let json = serde_json::to_string_pretty(&payload)?;
        return write_output(cli.output.as_deref(), &format!("{json}\n"));
    }

    let mut global = FileSettingsStore::new(global_config_path());
    let local = FileSettingsStore::new(local_override_path());
    let cli_overrides = cli.overrides();

    if cli.clear {
        global.clear()?;
    }
    if cli.save {
        let merged = global.load()?.union(&cli_overrides);
        global.save(&merged)?;
        info!(path = %global.path().display(), "saved link settings");
    }
    if (cli.save || cli.clear) && cli.file.is_none() {
        return Ok(());
    }

    let file_overrides = if cli.clear {
        local.load()?
    } else {
        let layers: [&dyn SettingsStore; 2] = [&global, &local];
        load_layered(&layers)?
    };
    let settings = file_overrides.union(&cli_overrides).resolve();

    let input_path = cli.input_path();
    let source = read_input(input_path)?;

    if cli.encode {
        let token = encoder::encode(&source).context("Failed to encode diagram")?;
        return write_output(cli.output.as_deref(), &format!("{token}\n"));
    }

    let format = cli.format.resolve(input_path);

    if cli.links {
        let collected = match format {
            DocumentFormat::Html => collect_links(&HtmlAnnotator::new(source)),
            DocumentFormat::Markdown | DocumentFormat::Auto => collect_links(&MarkdownAnnotator::new(source)),
        };
        let listing: String = collected
            .iter()
            .map(|(block, links)| format!("{}\t{}\t{}\n", block.index, links.edit_url(), links.view_url()))
            .collect();
        return write_output(cli.output.as_deref(), &listing);
    }

    let (annotated, report) = match format {
        DocumentFormat::Html => annotate(HtmlAnnotator::new(source), &settings),
        DocumentFormat::Markdown | DocumentFormat::Auto => annotate(MarkdownAnnotator::new(source), &settings),
    };
    info!(
        annotated = report.annotated,
        skipped_empty = report.skipped_empty,
        failed = report.failed,
        "annotation finished"
    );

    let destination = if cli.in_place {
        input_path
    } else {
        cli.output.as_deref()
    };
    write_output(destination, &annotated)
}
