//! pdfutils - select pages of a PDF document from the command line.

use anyhow::{bail, Context, Result};
use clparse::{FlagHandle, ParsedValues, Parser, PositionalHandle, SubcommandId};
use serde::Serialize;
use std::ffi::OsString;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Handles to everything `pdfutils` registers.
struct Cli {
    parser: Parser,
    subpdf: SubcommandId,
    in_path: PositionalHandle,
    range: PositionalHandle,
    output: FlagHandle<String>,
    page_count: FlagHandle<u32>,
    json: FlagHandle<bool>,
}

/// Highest page number accepted when the document length is not given.
const MAX_PAGE: u32 = 100_000;
/// Most pages a single selection may list, repeats included.
const MAX_SELECTION: usize = 1_000_000;

impl Cli {
    fn new() -> Result<Self> {
        let mut parser = Parser::new("pdfutils", "PDF utilities");

        let subpdf = parser.subcommand("subpdf", "Extract sub-PDF")?;
        let in_path = parser.positional("IN_PATH", "input PDF document", subpdf)?;
        let range = parser.positional("RANGE", "pages to keep, e.g. 3-5,8,10-12", subpdf)?;
        let output = parser.flag(
            "output",
            Some('o'),
            "output.pdf".to_string(),
            "output filename",
            subpdf,
        )?;
        let page_count = parser.flag(
            "page-count",
            Some('n'),
            0u32,
            "pages in the input document, 0 if unknown",
            subpdf,
        )?;
        let json = parser.flag("json", None, false, "print the selection as JSON", subpdf)?;

        Ok(Self {
            parser,
            subpdf,
            in_path,
            range,
            output,
            page_count,
            json,
        })
    }
}

/// A resolved page selection.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct Extraction {
    input: String,
    output: String,
    /// Zero-based page indices, in the order given.
    pages: Vec<u32>,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Help(String),
    Usage { message: String, help: String },
    Extract { extraction: Extraction, json: bool },
}

/// Parse a 1-based page range such as `3-5,8,10-12` into zero-based indices.
///
/// Pages past `page_count` (or [`MAX_PAGE`] when it is unknown) are rejected.
fn parse_range(range: &str, page_count: Option<u32>) -> Result<Vec<u32>> {
    let last_page = page_count.unwrap_or(MAX_PAGE);
    let mut pages = Vec::new();

    let parts = range
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());

    for part in parts {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (page_number(start, range)?, page_number(end, range)?),
            None => {
                let page = page_number(part, range)?;
                (page, page)
            }
        };
        if end < start {
            bail!("bad page range {:?}: {} ends before it starts", range, part);
        }
        if end > last_page {
            bail!(
                "bad page range {:?}: {} goes past page {}",
                range,
                part,
                last_page
            );
        }
        if pages.len() + (end - start + 1) as usize > MAX_SELECTION {
            bail!(
                "bad page range {:?}: selects more than {} pages",
                range,
                MAX_SELECTION
            );
        }
        pages.extend((start..=end).map(|page| page - 1));
    }

    if pages.is_empty() {
        bail!("bad page range or empty: {:?}", range);
    }
    Ok(pages)
}

fn page_number(text: &str, range: &str) -> Result<u32> {
    let page: u32 = text
        .parse()
        .with_context(|| format!("bad page range {:?}: {:?} is not a page number", range, text))?;
    if page == 0 {
        bail!("bad page range {:?}: pages are numbered from 1", range);
    }
    Ok(page)
}

/// One-line description of the selection. Nothing is written to `output`.
fn summary(extraction: &Extraction) -> String {
    let pages: Vec<String> = extraction
        .pages
        .iter()
        .map(|page| (page + 1).to_string())
        .collect();
    format!(
        "Would extract pages {} of {} into {} (writing PDFs is not supported)",
        pages.join(","),
        extraction.input,
        extraction.output
    )
}

fn evaluate<I>(args: I) -> Result<Outcome>
where
    I: IntoIterator<Item = OsString>,
{
    let mut cli = Cli::new().context("failed to register command line")?;
    let parsed = cli.parser.parse_os(args);
    debug!(values = ?ParsedValues::collect(&cli.parser), "parsed arguments");

    if let Err(err) = parsed {
        return Ok(Outcome::Usage {
            message: format!("{} ({})", err.report(), err),
            help: cli.parser.render_help(),
        });
    }

    if cli.parser.is_help_requested() {
        return Ok(Outcome::Help(cli.parser.render_help()));
    }

    if !cli.parser.is_active(cli.subpdf) {
        return Ok(Outcome::Usage {
            message: "no subcommand given".to_string(),
            help: cli.parser.render_help(),
        });
    }

    let (Some(input), Some(range)) = (
        cli.parser.positional_value(cli.in_path),
        cli.parser.positional_value(cli.range),
    ) else {
        return Ok(Outcome::Usage {
            message: "subpdf needs IN_PATH and RANGE".to_string(),
            help: cli.parser.render_help(),
        });
    };

    let page_count = Some(cli.parser[cli.page_count]).filter(|&count| count > 0);
    let extraction = Extraction {
        input: input.to_string(),
        output: cli.parser[cli.output].clone(),
        pages: parse_range(range, page_count)?,
    };
    let json = cli.parser[cli.json];

    cli.parser.teardown();
    Ok(Outcome::Extract { extraction, json })
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    match evaluate(std::env::args_os()) {
        Ok(Outcome::Help(help)) => {
            eprint!("{}", help);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Usage { message, help }) => {
            eprintln!("ERROR: {}", message);
            eprint!("{}", help);
            ExitCode::FAILURE
        }
        Ok(Outcome::Extract { extraction, json }) => {
            if json {
                match serde_json::to_string_pretty(&extraction) {
                    Ok(text) => println!("{}", text),
                    Err(err) => {
                        eprintln!("ERROR: {}", err);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", summary(&extraction));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("ERROR: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
