use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::RuntimePaths;
use crate::models::conversation::{Conversation, decode_conversation};
use crate::shorten::shorten_batch;

#[derive(Debug, Clone, Args)]
pub struct CleanArgs {
    #[arg(value_name = "EXPORT")]
    pub input: PathBuf,

    /// Leave identifiers at full length.
    #[arg(long, default_value_t = false)]
    pub keep_long_ids: bool,
}

pub fn run(args: &CleanArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let records = super::read_export(&args.input)?;
    println!(
        "clean: start records={} input={}",
        records.len(),
        args.input.display()
    );

    let records = if args.keep_long_ids {
        records
    } else {
        // Collision check happens before anything is decoded or written.
        let (shortened, stats) = shorten_batch(records)?;
        println!(
            "clean: shortened identifiers={} suffixes={}",
            stats.identifiers_seen, stats.suffixes_produced
        );
        shortened
    };

    let mut conversations = Vec::with_capacity(records.len());
    for record in records {
        conversations.push(decode_conversation(record)?);
    }

    for conversation in &mut conversations {
        conversation.sort_mapping();
    }
    conversations.sort_by(|left, right| {
        right
            .create_time
            .partial_cmp(&left.create_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let output_path = runtime_paths.out_dir.join("conversations.clean.json");
    write_clean_artifact(&output_path, &conversations)?;
    println!(
        "clean: complete conversations={} output={}",
        conversations.len(),
        output_path.display()
    );
    Ok(())
}

fn write_clean_artifact(path: &std::path::Path, conversations: &[Conversation]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create clean artifact directory")?;
    }
    let encoded =
        serde_json::to_vec(conversations).context("failed to encode cleaned conversations")?;
    std::fs::write(path, encoded).context("failed to write clean artifact")
}
