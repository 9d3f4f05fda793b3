pub mod acquire;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod filter;
pub mod localize;
pub mod materialize;
pub mod parsers;
pub mod plan;
pub mod profile;
pub mod render;
pub mod table;
pub mod value;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    acquire::{DescriptorAcquirer, HttpFetcher},
    cli::{Cli, Commands, DescSourceArgs},
    descriptor::DescriptorMeta,
    export::PipelineOptions,
    profile::Profile,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("desc_export", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Export(args) => handle_export(&args),
        Commands::Plan(args) => handle_plan(&args),
        Commands::Describe(args) => handle_describe(&args),
    }
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let table_name = table_name_for(&args.input, args.table.as_deref());
    let meta = resolve_descriptor(&args.desc)?;
    let raw = export::read_raw_table(&args.input, args.delimiter, &table_name)
        .with_context(|| format!("Reading raw table from {:?}", args.input))?;

    let options = PipelineOptions {
        localize_captions: !args.no_localize,
        drop_empty_columns: !args.keep_empty,
    };
    let typed = export::prepare_table(&raw, meta.as_ref(), &options);

    let delimiter = args.output_delimiter.unwrap_or(args.delimiter);
    let written = export::write_delimited(&typed, &args.output, delimiter)
        .with_context(|| format!("Writing typed export to {:?}", args.output))?;
    info!(
        "Exported {} row(s), {} column(s) to {written:?}",
        typed.rows.len(),
        typed.columns.len()
    );
    Ok(())
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let table_name = table_name_for(&args.input, args.table.as_deref());
    let meta = resolve_descriptor(&args.desc)?;
    let raw = export::read_raw_table(&args.input, args.delimiter, &table_name)
        .with_context(|| format!("Reading raw table from {:?}", args.input))?;

    let typing = plan::build(&raw, meta.as_ref());
    render::print_table(&plan::TypingPlan::decision_headers(), &typing.decision_rows());
    Ok(())
}

fn handle_describe(args: &cli::DescribeArgs) -> Result<()> {
    let Some(meta) = resolve_descriptor(&args.desc)? else {
        bail!("No descriptor available: pass --desc or --service/--doctype with a profile");
    };

    if let Some(content) = &meta.content_table {
        println!(
            "content table: {content} ({})",
            meta.table_caption(content).unwrap_or("-")
        );
    }
    for table in &meta.fieldset_tables {
        println!(
            "fieldset table: {table} ({})",
            meta.table_caption(table).unwrap_or("-")
        );
    }

    let mut rows: Vec<Vec<String>> = meta
        .fields()
        .map(|field| {
            vec![
                field.system_name.clone(),
                field.declared_type.clone().unwrap_or_default(),
                field.caption.clone().unwrap_or_default(),
            ]
        })
        .collect();
    rows.sort();
    let headers = vec![
        "system name".to_string(),
        "type".to_string(),
        "caption".to_string(),
    ];
    render::print_table(&headers, &rows);
    Ok(())
}

fn table_name_for(input: &Path, explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| {
            input
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "table".to_string())
}

/// Resolves the descriptor from whichever source the arguments select:
/// a local file, a remote (service, doctype) lookup, or none at all.
fn resolve_descriptor(args: &DescSourceArgs) -> Result<Option<DescriptorMeta>> {
    if let Some(path) = &args.desc_file {
        let xml = fs::read_to_string(path)
            .with_context(|| format!("Reading descriptor file {path:?}"))?;
        let meta = descriptor::parse_descriptor(&xml);
        if meta.is_none() {
            warn!("Descriptor file {path:?} was empty or malformed; continuing without one");
        }
        return Ok(meta);
    }

    let (Some(service), Some(doctype)) = (&args.service, &args.doctype) else {
        return Ok(None);
    };
    let profile = match &args.profile {
        Some(path) => Profile::load(path)?,
        None => Profile::default(),
    };

    let runtime = tokio::runtime::Runtime::new().context("Starting async runtime")?;
    let acquirer = DescriptorAcquirer::new(HttpFetcher::default());
    let meta = runtime
        .block_on(acquirer.resolve(&profile, service, doctype))
        .with_context(|| format!("Resolving descriptor for {service}/{doctype}"))?;
    if meta.is_none() {
        warn!("Remote descriptor for {service}/{doctype} was unusable; continuing without one");
    }
    Ok(meta)
}
