use anyhow::Result;
use clap::Args;
use ecash_store::WalletStore;

#[derive(Args)]
pub struct BalanceSubCommand {
    /// Recompute from the stored document instead of the in-memory view
    #[arg(long, default_value = "false")]
    refresh: bool,
}

pub fn balance(wallet: &WalletStore, sub_command_args: &BalanceSubCommand) -> Result<()> {
    let amount = if sub_command_args.refresh {
        wallet.refresh_balance()
    } else {
        wallet.balance()
    };

    println!("{amount}");

    Ok(())
}
