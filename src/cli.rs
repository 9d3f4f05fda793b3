use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Descriptor-driven typed export for document tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the typing pipeline over a raw table dump and write a typed delimited export
    Export(ExportArgs),
    /// Show the per-column typing-plan decisions without writing anything
    Plan(PlanArgs),
    /// Fetch and summarize a descriptor (tables, captions, declared types)
    Describe(DescribeArgs),
}

/// Descriptor source selection shared by all subcommands: either a local
/// `.desc` XML file, or a remote fetch by (service, doctype) codes through a
/// profile.
#[derive(Debug, Args)]
pub struct DescSourceArgs {
    /// Local descriptor XML file
    #[arg(long = "desc")]
    pub desc_file: Option<PathBuf>,
    /// Profile JSON with the descriptor-service settings
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
    /// Service code for remote descriptor lookup
    #[arg(long)]
    pub service: Option<String>,
    /// Document-type code for remote descriptor lookup
    #[arg(long)]
    pub doctype: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Input delimited dump of the raw table
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination file for the typed delimited export
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Table name the rows belong to (defaults to the input file stem)
    #[arg(short, long)]
    pub table: Option<String>,
    /// Input delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    /// Output delimiter character (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Keep original column names instead of descriptor captions
    #[arg(long)]
    pub no_localize: bool,
    /// Keep columns that are empty across every row
    #[arg(long)]
    pub keep_empty: bool,
    #[command(flatten)]
    pub desc: DescSourceArgs,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Input delimited dump of the raw table
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Table name the rows belong to (defaults to the input file stem)
    #[arg(short, long)]
    pub table: Option<String>,
    /// Input delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    #[command(flatten)]
    pub desc: DescSourceArgs,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub desc: DescSourceArgs,
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    let normalized = raw.trim();
    match normalized.to_ascii_lowercase().as_str() {
        "tab" | "\\t" => return Ok(b'\t'),
        _ => {}
    }
    let mut chars = normalized.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(format!("Invalid delimiter '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_parser_accepts_common_forms() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
