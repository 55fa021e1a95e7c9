//! securebank-sim - Vulnerable Banking Sandbox
//!
//! Demo driver for the simulation engine: loads a protection profile from
//! the environment, seeds the demo accounts, and walks through the classic
//! exploits so their outcomes show up in the log. Flip the `SECUREBANK_*`
//! variables to watch the same attacks bounce off the hardened profile.

use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use securebank_sim::auth::RegisterRequest;
use securebank_sim::{ProtectionProfile, SecureBank};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "securebank_sim=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let profile = ProtectionProfile::from_env()?;
    tracing::info!(?profile, "starting simulation run");

    let bank = SecureBank::new(profile.clone());
    bank.seed_demo_accounts()
        .await
        .map_err(|e| anyhow::anyhow!("seeding demo accounts: {e}"))?;

    for record in bank.list_vulnerabilities() {
        tracing::info!(
            id = record.id,
            title = record.title,
            severity = %record.severity,
            flag = %record.related_flag,
            "catalogued vulnerability"
        );
    }

    // Ordinary registration and login.
    match bank
        .register(RegisterRequest::new(
            "eve",
            "eve@example.com",
            "abc",
            "abc",
        ))
        .await
    {
        Ok(user) => tracing::info!(username = %user.username(), balance = %user.balance(), "registered"),
        Err(e) => tracing::warn!(error = %e, "registration rejected"),
    }

    // Tautology login: succeeds only with injection protection off.
    match bank.login("admin' OR '1'='1' --", "whatever").await {
        Ok(session) => {
            tracing::warn!("tautology login yielded a session");

            // Injection through the search filter.
            let hits = bank.search("') OR 1=1 --").await;
            tracing::info!(hits = hits.len(), "search with tautology filter");

            // A destructive raw query; the live ledger survives either way.
            match bank.run_raw_query(&session, "DROP TABLE users").await {
                Ok(report) => tracing::info!(
                    executed = report.executed,
                    message = %report.message,
                    "raw query report"
                ),
                Err(e) => tracing::warn!(error = %e, "raw query refused"),
            }
        }
        Err(e) => tracing::info!(error = %e, "tautology login rejected"),
    }

    // Concurrent transfers against one account: a double-spend when the
    // race guard is off, one rejection when it is on.
    let session = bank.login("john_doe", "sunshine1").await?;
    let stake = Decimal::new(200_000, 2);
    let (a, b) = tokio::join!(
        bank.transfer(&session, "jane_smith", stake, "first"),
        bank.transfer(&session, "jane_smith", stake, "second"),
    );
    let balance = bank
        .ledger()
        .balance_of(session.user_id)
        .await
        .map(|b| b.value())
        .unwrap_or_default();
    tracing::info!(
        first = a.is_ok(),
        second = b.is_ok(),
        balance = %balance,
        "concurrent transfer outcome"
    );

    let summary = bank.system_summary().await;
    tracing::info!(
        users = summary.total_users,
        admins = summary.admin_count,
        total_balance = %summary.total_balance,
        "system summary"
    );

    let verification = bank.audit().verify_chain().await;
    tracing::info!(
        entries = verification.entries_checked,
        valid = verification.is_valid,
        "audit chain verified"
    );

    Ok(())
}
