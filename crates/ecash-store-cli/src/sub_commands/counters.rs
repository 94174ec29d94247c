use anyhow::Result;
use ecash_store::WalletStore;

pub fn counters(wallet: &WalletStore) -> Result<()> {
    let counts = wallet.counters.get_all();

    if counts.is_empty() {
        println!("No keyset counters");
        return Ok(());
    }

    println!("| {:18} | {:10} |", "Keyset", "Counter");
    println!("|{:-<20}|{:-<12}|", "", "");

    for (keyset_id, counter) in counts {
        println!("| {:18} | {:10} |", keyset_id, counter);
    }

    Ok(())
}
