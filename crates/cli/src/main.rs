//! vellum - rewrite and inspect PDF files at the object level.

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use log::{LevelFilter, info};
use memmap2::Mmap;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use vellum_core::document::Location;
use vellum_core::{ContentStreamAnalyzer, ObjRef, PdfFile, PdfVersion, SaveOptions};

#[derive(Parser)]
#[command(name = "vellum")]
#[command(author, version, about = "Rewrite and inspect PDF files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log parser and writer progress
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a file and write it back out as a single revision
    Rewrite {
        input: PathBuf,
        output: PathBuf,

        /// Write every object directly with a classic xref table
        #[arg(long)]
        no_compress: bool,

        /// Drop objects not reachable from the trailer
        #[arg(long)]
        prune: bool,

        /// Raise the header version to at least this one (e.g. 1.5)
        #[arg(long, value_parser = parse_version)]
        min_version: Option<PdfVersion>,
    },

    /// Print the merged cross-reference table as JSON
    Xref {
        input: PathBuf,

        #[arg(long)]
        pretty: bool,
    },

    /// List the operators of a content stream, optionally deleting some
    Ops {
        input: PathBuf,

        /// Object number of the content stream
        object: u32,

        #[arg(short, long, default_value_t = 0)]
        generation: u16,

        /// Logical operator index to delete; may be repeated
        #[arg(short, long = "delete")]
        delete: Vec<usize>,

        /// Where to save the edited file when deleting
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_version(text: &str) -> Result<PdfVersion, String> {
    PdfVersion::parse(text.as_bytes()).map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct XrefRow {
    number: u32,
    generation: u16,
    in_use: bool,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<u32>,
}

#[derive(Serialize)]
struct OperatorRow {
    index: usize,
    offset: usize,
    keyword: String,
    operands: Vec<String>,
    ctm: [f64; 6],
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    font: Option<String>,
}

fn open(path: &Path) -> anyhow::Result<PdfFile> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    // SAFETY: the mapping is read-only and the file is not modified while loaded.
    let mmap = unsafe { Mmap::map(&file) }?;
    PdfFile::load(Bytes::from_owner(mmap))
        .with_context(|| format!("cannot load {}", path.display()))
}

fn rewrite(
    input: &Path,
    output: &Path,
    options: SaveOptions,
    min_version: Option<PdfVersion>,
) -> anyhow::Result<()> {
    let mut pdf = open(input)?;
    if let Some(version) = min_version {
        pdf.ensure_version(version);
    }
    let data = pdf.save_with(&options)?;
    fs::write(output, &data).with_context(|| format!("cannot write {}", output.display()))?;
    info!(
        "wrote {} ({} bytes, version {})",
        output.display(),
        data.len(),
        pdf.version()
    );
    Ok(())
}

fn dump_xref(input: &Path, pretty: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let pdf = open(input)?;
    let rows: Vec<XrefRow> = pdf
        .xref()
        .iter()
        .map(|entry| {
            let (kind, offset, stream, index) = match entry.location {
                _ if !entry.in_use => ("free", None, None, None),
                Location::AtRest { offset } => ("direct", Some(offset), None, None),
                Location::Compressed { stream, index } => {
                    ("compressed", None, Some(stream), Some(index))
                }
                Location::Detached => ("detached", None, None, None),
            };
            XrefRow {
                number: entry.number,
                generation: entry.generation,
                in_use: entry.in_use,
                kind,
                offset,
                stream,
                index,
            }
        })
        .collect();
    if pretty {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
    } else {
        serde_json::to_writer(&mut *out, &rows)?;
    }
    writeln!(out)?;
    Ok(())
}

fn operators(
    input: &Path,
    target: ObjRef,
    delete: &[usize],
    output: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !delete.is_empty() && output.is_none() {
        bail!("--delete needs --output");
    }
    let mut pdf = open(input)?;
    let Some(object) = pdf.object_mut(target)? else {
        bail!("object {target} does not exist");
    };
    let stream = object.as_stream_mut()?;
    let mut analyzer = ContentStreamAnalyzer::from_stream(stream)?;
    for &index in delete {
        // An index may already be gone with an earlier deletion's q/Q pair.
        if analyzer.operator(index).is_some() {
            let removed = analyzer.delete(index)?;
            info!("deleted operators {removed:?}");
        }
    }

    for op in analyzer.operators() {
        let row = OperatorRow {
            index: op.index,
            offset: op.offset,
            keyword: op.keyword_str().into_owned(),
            operands: op.operands.iter().map(ToString::to_string).collect(),
            ctm: op.state.ctm().to_array(),
            depth: op.state.depth(),
            font: op.state.params.text.font.clone(),
        };
        serde_json::to_writer(&mut *out, &row)?;
        writeln!(out)?;
    }

    if let Some(path) = output {
        stream.set_decoded(analyzer.into_data());
        let data = pdf.save(true)?;
        fs::write(path, data).with_context(|| format!("cannot write {}", path.display()))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    let mut out = BufWriter::new(io::stdout().lock());
    match cli.command {
        Commands::Rewrite {
            input,
            output,
            no_compress,
            prune,
            min_version,
        } => {
            let options = SaveOptions::new()
                .allow_compression(!no_compress)
                .prune_unused(prune);
            rewrite(&input, &output, options, min_version)?;
        }
        Commands::Xref { input, pretty } => dump_xref(&input, pretty, &mut out)?,
        Commands::Ops {
            input,
            object,
            generation,
            delete,
            output,
        } => operators(
            &input,
            ObjRef::new(object, generation),
            &delete,
            output.as_deref(),
            &mut out,
        )?,
    }
    out.flush()?;
    Ok(())
}
