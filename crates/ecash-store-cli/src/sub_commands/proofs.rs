use anyhow::Result;
use clap::Args;
use ecash_store::{Proof, SpentProof, WalletStore};

use crate::utils::truncate;

#[derive(Args)]
pub struct ProofsSubCommand {
    /// Only show proofs of this keyset
    #[arg(short, long)]
    keyset: Option<String>,
    /// Show the spent proof log instead
    #[arg(long, default_value = "false")]
    spent: bool,
}

pub fn list_proofs(wallet: &WalletStore, sub_command_args: &ProofsSubCommand) -> Result<()> {
    let in_keyset = |keyset_id: &str| {
        sub_command_args
            .keyset
            .as_deref()
            .is_none_or(|wanted| wanted == keyset_id)
    };

    if sub_command_args.spent {
        let records: Vec<SpentProof> = wallet
            .spent
            .list()
            .into_iter()
            .filter(|r| in_keyset(&r.keyset_id))
            .collect();
        print_spent_table(&records);
    } else {
        let proofs: Vec<Proof> = wallet
            .proofs
            .list()
            .into_iter()
            .filter(|p| in_keyset(&p.keyset_id))
            .collect();
        print_proofs_table(&proofs);
    }

    Ok(())
}

fn print_spent_table(records: &[SpentProof]) {
    println!("| {:8} | {:18} | {:24} |", "Amount", "Keyset", "Secret");
    println!("|{:-<10}|{:-<20}|{:-<26}|", "", "", "");

    for record in records {
        let amount = record
            .amount()
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "| {:8} | {:18} | {:24} |",
            amount,
            truncate(&record.keyset_id, 18),
            truncate(&record.secret, 24)
        );
    }

    println!("{} spent records", records.len());
}

fn print_proofs_table(proofs: &[Proof]) {
    println!(
        "| {:8} | {:18} | {:24} | {:12} |",
        "Amount", "Keyset", "Secret", "C"
    );
    println!("|{:-<10}|{:-<20}|{:-<26}|{:-<14}|", "", "", "", "");

    for proof in proofs {
        println!(
            "| {:8} | {:18} | {:24} | {:12} |",
            proof.amount.to_string(),
            truncate(&proof.keyset_id, 18),
            truncate(&proof.secret, 24),
            truncate(&proof.c, 12)
        );
    }

    println!("{} proofs", proofs.len());
}

pub fn debug_proofs(wallet: &WalletStore) -> Result<()> {
    let report = wallet.proofs.report();

    match &report.raw {
        Some(raw) => println!("Stored document: {} bytes", raw.len()),
        None => {
            println!("No proofs document stored");
            return Ok(());
        }
    }

    if !report.is_array {
        println!("Document is not a JSON array, it reads as empty");
        return Ok(());
    }

    println!("Entries: {}", report.entries);
    println!("Valid: {}", report.valid);
    println!("Balance: {}", report.balance);

    if !report.malformed.is_empty() {
        let indices: Vec<String> = report.malformed.iter().map(|i| i.to_string()).collect();
        println!("Malformed entries at: {}", indices.join(", "));
    }

    Ok(())
}
