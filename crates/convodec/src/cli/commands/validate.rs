use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::models::conversation::decode_conversation;

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    #[arg(value_name = "EXPORT")]
    pub input: PathBuf,

    /// Keep going after a failed record instead of aborting on the first.
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    /// Suppress pretty-printing of failing records.
    #[arg(long, default_value_t = false)]
    pub quiet_records: bool,
}

#[derive(Debug)]
pub struct ValidationCommandFailure {
    pub failed_records: usize,
    pub first_error: String,
}

impl std::fmt::Display for ValidationCommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "validation failed for {} record(s). {}",
            self.failed_records, self.first_error
        )
    }
}

impl std::error::Error for ValidationCommandFailure {}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let records = super::read_export(&args.input)?;
    let total = records.len();
    println!("validate: start records={total} input={}", args.input.display());

    let mut role_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut failed_records = 0usize;
    let mut first_error: Option<String> = None;

    for (index, record) in records.into_iter().enumerate() {
        let rendered = if args.quiet_records {
            None
        } else {
            serde_json::to_string_pretty(&record).ok()
        };
        match decode_conversation(record) {
            Ok(conversation) => {
                for node in conversation.mapping.values() {
                    if let Some(message) = &node.message {
                        *role_counts.entry(message.role().as_str()).or_default() += 1;
                    }
                }
            }
            Err(error) => {
                failed_records += 1;
                if let Some(rendered) = rendered {
                    eprintln!("\n{rendered}\n");
                }
                eprintln!("validate: record {index}/{total} failed: {error}");
                if first_error.is_none() {
                    first_error = Some(error.to_string());
                }
                if !args.keep_going {
                    break;
                }
            }
        }
    }

    for (role, count) in &role_counts {
        println!("validate: role={role} messages={count}");
    }

    if failed_records > 0 {
        return Err(ValidationCommandFailure {
            failed_records,
            first_error: first_error.unwrap_or_default(),
        }
        .into());
    }

    println!("validate: complete records={total} status=pass");
    Ok(())
}
