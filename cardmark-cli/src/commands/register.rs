//! Register command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardmark_core::{AnchorStatus, CredentialDeriver, Registrar};
use colored::Colorize;
use tracing::{info, warn};

use crate::utils::{build_card_path, default_embedder, format_timestamp, read_input, LedgerArgs};

/// Arguments for the register command.
pub struct RegisterArgs {
    pub image: PathBuf,
    pub subject: Option<String>,
    pub holder: Option<String>,
    pub issuer: Option<String>,
    pub out: Option<PathBuf>,
    pub json: bool,
    pub ledger: LedgerArgs,
    pub quiet: bool,
}

/// Execute the register command.
pub async fn execute(args: RegisterArgs) -> Result<()> {
    let image = read_input(&args.image, "image")?;

    let deriver = CredentialDeriver::with_system_sources();
    let subject = args
        .subject
        .clone()
        .unwrap_or_else(|| deriver.clock().now_millis().to_string());

    let mut registrar =
        Registrar::new(deriver, default_embedder()).with_ledger_timeout(args.ledger.timeout());
    if let Some(ledger) = args.ledger.build()? {
        registrar = registrar.with_ledger(ledger, args.issuer.clone());
    }

    let registration = registrar
        .register(image, &subject, args.holder.as_deref())
        .await
        .context("Failed to issue card")?;

    let out = args.out.clone().unwrap_or_else(|| build_card_path(&args.image));
    std::fs::write(&out, &registration.artifact.bytes)
        .with_context(|| format!("Failed to write card: {}", out.display()))?;
    info!(path = %out.display(), bytes = registration.artifact.bytes.len(), "Card saved");

    if let AnchorStatus::Failed { reason } = &registration.anchor {
        warn!(reason = %reason, "Card issued without ledger anchoring");
    }

    let payload = registration.payload();
    if args.json {
        let report = serde_json::json!({
            "userId": payload.user_id,
            "timestamp": payload.timestamp,
            "hashPrefix": payload.hash,
            "saltPrefix": payload.salt,
            "card": out.display().to_string(),
            "anchor": registration.anchor,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !args.quiet {
        println!();
        println!("{}", "Membership card issued".green().bold());
        println!();
        println!("   {} {}", "Card saved:".dimmed(), out.display());
        println!("   {} {}", "User id:".dimmed(), payload.user_id);
        println!("   {} {}", "Issued at:".dimmed(), format_timestamp(payload.timestamp));
        println!("   {} {}", "Hash prefix:".dimmed(), payload.hash);
        println!("   {} {}", "Salt prefix:".dimmed(), payload.salt);
        match &registration.anchor {
            AnchorStatus::Anchored { tx, expires_at } => {
                println!("   {} {}", "Ledger:".dimmed(), "anchored".green());
                println!("   {} {}", "Transaction:".dimmed(), tx);
                println!(
                    "   {} {}",
                    "Credential expires:".dimmed(),
                    format_timestamp(expires_at.saturating_mul(1000))
                );
            }
            AnchorStatus::Skipped { reason } => {
                println!("   {} {} ({})", "Ledger:".dimmed(), "skipped".yellow(), reason);
            }
            AnchorStatus::Failed { reason } => {
                println!("   {} {} ({})", "Ledger:".dimmed(), "FAILED".red(), reason);
                println!(
                    "   {}",
                    "The card is valid but not anchored; ownership checks will not confirm it."
                        .yellow()
                );
            }
        }
    }

    Ok(())
}
