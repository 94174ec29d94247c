use anyhow::Result;
use clap::Args;
use ecash_store::WalletStore;

use crate::utils::{truncate, unix_time};

#[derive(Args)]
pub struct ExpireQuotesSubCommand {
    /// Reference time in unix seconds, defaults to now
    #[arg(long)]
    now: Option<u64>,
}

pub fn list_quotes(wallet: &WalletStore) -> Result<()> {
    let quotes = wallet.quotes.list();

    if quotes.is_empty() {
        println!("No mint quotes");
        return Ok(());
    }

    println!(
        "| {:24} | {:10} | {:8} | {:12} | {:30} |",
        "Quote", "Amount", "State", "Expiry", "Mint"
    );
    println!(
        "|{:-<26}|{:-<12}|{:-<10}|{:-<14}|{:-<32}|",
        "", "", "", "", ""
    );

    for quote in quotes {
        println!(
            "| {:24} | {:10} | {:8} | {:12} | {:30} |",
            truncate(&quote.id, 24),
            quote.amount.to_string(),
            quote.state.to_string(),
            quote
                .expiry
                .map(|expiry| expiry.to_string())
                .unwrap_or_else(|| "-".to_string()),
            truncate(quote.mint.as_str(), 30)
        );
    }

    Ok(())
}

pub fn expire_quotes(wallet: &WalletStore, sub_command_args: &ExpireQuotesSubCommand) -> Result<()> {
    let now = sub_command_args.now.unwrap_or_else(unix_time);

    let expired = wallet.quotes.expire_overdue(now)?;

    if expired.is_empty() {
        println!("No overdue quotes");
    }

    for id in expired {
        println!("Expired {id}");
    }

    Ok(())
}
