//! Transfer one credit and wait for the receipt.
//!
//! Configure the operator via environment variables:
//!
//! ```bash
//! export LEDGER_NETWORK=testnet
//! export LEDGER_ACCOUNT_ID=0.1001
//! export LEDGER_SECRET_KEY=ed25519:...
//! cargo run --example quickstart
//! ```

use ledger_kit::{AccountId, Amount, Ledger};

#[tokio::main]
async fn main() -> Result<(), ledger_kit::Error> {
    tracing_subscriber::fmt::init();

    let ledger = Ledger::from_env()?;
    let to: AccountId = "0.1002".parse()?;

    let response = ledger
        .transfer(to, Amount::credits(1))?
        .memo("quickstart")
        .execute(&ledger)
        .await?;
    println!(
        "accepted by node {} as {}",
        response.node_account_id, response.transaction_id
    );

    let receipt = response.get_receipt(&ledger).await?;
    println!("consensus status: {}", receipt.status);

    let balance = ledger.account_balance(to).await?;
    println!("recipient balance: {}", balance.balance);

    Ok(())
}
