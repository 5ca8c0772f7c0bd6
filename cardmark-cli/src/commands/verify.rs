//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use cardmark_core::{OwnershipCheck, VerificationOutcome, Verifier};
use colored::Colorize;
use tracing::{error, info};

use crate::utils::{default_embedder, format_timestamp, read_input, LedgerArgs};

/// Execute the verify command.
pub async fn execute(
    card: PathBuf,
    holder: Option<String>,
    require_ownership: bool,
    json: bool,
    ledger: LedgerArgs,
    quiet: bool,
) -> Result<()> {
    let bytes = read_input(&card, "card")?;

    let verifier =
        Verifier::new(default_embedder(), ledger.build()?).with_ledger_timeout(ledger.timeout());
    let outcome = verifier.verify(&bytes, holder.as_deref()).await;

    if json {
        print_json(&outcome, holder.as_deref())?;
    } else if !quiet {
        print_outcome(&outcome);
    }

    match outcome {
        VerificationOutcome::Invalid { reason } => {
            error!(reason = %reason.description(), "Card invalid");
            bail!("Verification failed: {}", reason.description())
        }
        VerificationOutcome::Valid { ownership, .. } if require_ownership => match ownership {
            OwnershipCheck::Confirmed => Ok(()),
            OwnershipCheck::Unavailable(reason) => {
                bail!("Ownership could not be checked, ledger unavailable: {}", reason)
            }
            OwnershipCheck::NotConfirmed(reason) => {
                bail!("Verification failed: ownership not confirmed ({})", reason)
            }
            OwnershipCheck::NotRequested => {
                bail!("Verification failed: no ledger configured for the ownership check")
            }
        },
        VerificationOutcome::Valid { payload, .. } => {
            info!(user_id = %payload.user_id, "Card valid");
            Ok(())
        }
    }
}

fn print_json(outcome: &VerificationOutcome, holder: Option<&str>) -> Result<()> {
    let report = match outcome {
        VerificationOutcome::Valid { payload, ownership } => serde_json::json!({
            "valid": true,
            "data": payload,
            "ownershipVerified": outcome.ownership_verified(),
            "ownership": ownership,
            "walletAddress": holder,
        }),
        VerificationOutcome::Invalid { reason } => serde_json::json!({
            "valid": false,
            "reason": reason.description(),
            "ownershipVerified": false,
            "walletAddress": holder,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_outcome(outcome: &VerificationOutcome) {
    println!();
    match outcome {
        VerificationOutcome::Valid { payload, ownership } => {
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!("{}", "║                VALID                   ║".green().bold());
            println!("{}", "╚════════════════════════════════════════╝".green());
            println!();
            println!("   {} {}", "User id:".dimmed(), payload.user_id);
            println!("   {} {}", "Issued at:".dimmed(), format_timestamp(payload.timestamp));
            println!("   {} {}", "Hash prefix:".dimmed(), payload.hash);
            let ownership_line = match ownership {
                OwnershipCheck::Confirmed => "confirmed".green(),
                OwnershipCheck::NotRequested => "not checked".dimmed(),
                OwnershipCheck::NotConfirmed(reason) => {
                    format!("not confirmed ({})", reason).yellow()
                }
                OwnershipCheck::Unavailable(reason) => {
                    format!("ledger unavailable ({})", reason).yellow()
                }
            };
            println!("   {} {}", "Ownership:".dimmed(), ownership_line);
        }
        VerificationOutcome::Invalid { reason } => {
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!("{}", "║               INVALID                  ║".red().bold());
            println!("{}", "╚════════════════════════════════════════╝".red());
            println!();
            println!("   {} {}", "Reason:".dimmed(), reason.description().red());
        }
    }
}
