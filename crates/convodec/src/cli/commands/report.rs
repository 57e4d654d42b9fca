use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde::Serialize;

use crate::accounting::{CharEstimateCounter, PricingModel};
use crate::config::RuntimePaths;
use crate::models::conversation::decode_batch;
use crate::report::{conversation_rows, message_rows, rows_schema, usage_summary};

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(value_name = "EXPORT")]
    pub input: PathBuf,

    /// Pricing model for the usage summary.
    #[arg(long, default_value = "gpt-4")]
    pub model: String,

    /// Skip records that fail validation instead of aborting.
    #[arg(long, default_value_t = false)]
    pub skip_invalid: bool,
}

pub fn run(args: &ReportArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let pricing = PricingModel::parse(&args.model).ok_or_else(|| {
        anyhow!(
            "unknown pricing model `{}` (accepted: {})",
            args.model,
            PricingModel::TAGS.join(", ")
        )
    })?;

    let records = super::read_export(&args.input)?;
    println!(
        "report: start records={} input={}",
        records.len(),
        args.input.display()
    );

    let mut conversations = Vec::new();
    for (index, outcome) in decode_batch(records).into_iter().enumerate() {
        match outcome {
            Ok(conversation) => conversations.push(conversation),
            Err(error) if args.skip_invalid => {
                eprintln!("report: skipping record {index}: {error}");
            }
            Err(error) => return Err(error.into()),
        }
    }
    for conversation in &mut conversations {
        conversation.sort_mapping();
    }

    let out_dir = runtime_paths.out_dir.join("report");
    write_jsonl_artifact(&out_dir.join("message_rows.jsonl"), &message_rows(&conversations))?;
    write_jsonl_artifact(
        &out_dir.join("conversation_rows.jsonl"),
        &conversation_rows(&conversations),
    )?;
    write_schema_artifact(&out_dir.join("rows.schema.json"))?;

    let summary = usage_summary(&conversations, &CharEstimateCounter::default(), pricing);
    println!(
        "report: conversations={} messages={} paths={}",
        summary.conversations, summary.messages, summary.paths
    );
    println!(
        "report: input_tokens={} output_tokens={} total_tokens={}",
        summary.input_tokens, summary.output_tokens, summary.total_tokens
    );
    println!(
        "report: pricing_model={} estimated_cost_usd={:.2}",
        summary.pricing_model, summary.estimated_cost_usd
    );
    println!("report: complete output={}", out_dir.display());
    Ok(())
}

fn write_jsonl_artifact<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create report artifact directory")?;
    }
    let file = std::fs::File::create(path).context("failed to create report artifact")?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row).context("failed to encode report row")?;
        writer
            .write_all(b"\n")
            .context("failed to write report row newline")?;
    }
    writer.flush().context("failed to flush report artifact")
}

fn write_schema_artifact(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create schema artifact directory")?;
    }
    let encoded = serde_json::to_vec_pretty(&rows_schema())
        .context("failed to encode rows schema json")?;
    std::fs::write(path, encoded).context("failed to write rows schema artifact")
}
