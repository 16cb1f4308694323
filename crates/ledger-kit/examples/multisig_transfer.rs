//! Collect several signatures on one frozen transaction before
//! dispatch.
//!
//! The operator signs at freeze time; additional holders sign the
//! frozen transaction afterwards. Signing with a key that already
//! signed is a no-op, so it is safe to route the transaction through
//! every holder unconditionally.

use ledger_kit::{AccountId, Amount, Ledger, SecretKey};

#[tokio::main]
async fn main() -> Result<(), ledger_kit::Error> {
    tracing_subscriber::fmt::init();

    let ledger = Ledger::from_env()?;
    let treasury: AccountId = "0.900".parse()?;

    // In a real deployment these keys live with their holders.
    let holder_a = SecretKey::from_seed_phrase(
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
    )?;
    let holder_b = SecretKey::generate();

    let mut frozen = ledger
        .transfer(treasury, Amount::credits(50))?
        .memo("treasury top-up")
        .freeze_with(&ledger)?;

    frozen.sign(holder_a).sign(holder_b);
    println!("signatures collected: {}", frozen.signer_public_keys().len());

    let response = frozen.execute(&ledger).await?;
    println!(
        "accepted by node {} as {}",
        response.node_account_id, response.transaction_id
    );

    let record = response.get_record(&ledger).await?;
    println!("fee charged: {}", record.transaction_fee);

    Ok(())
}
