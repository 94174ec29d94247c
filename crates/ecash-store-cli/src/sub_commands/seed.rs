use anyhow::Result;
use clap::Args;
use ecash_store::WalletStore;

#[derive(Args)]
pub struct SeedSubCommand {
    /// Replace the seed with freshly generated entropy
    #[arg(long, default_value = "false")]
    rotate: bool,
    /// Import a mnemonic phrase or hex entropy
    #[arg(long, conflicts_with = "rotate")]
    import: Option<String>,
}

pub fn seed(wallet: &WalletStore, sub_command_args: &SeedSubCommand) -> Result<()> {
    if sub_command_args.rotate {
        tracing::warn!(
            "Rotating wallet seed, proofs derived from the old seed cannot be restored"
        );
        wallet.seed.rotate()?;
    }

    if let Some(value) = &sub_command_args.import {
        wallet.seed.set(value.trim())?;
    }

    let mnemonic = wallet.seed.mnemonic()?;
    println!("{mnemonic}");

    Ok(())
}
