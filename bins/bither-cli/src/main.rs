//! bither-cli: Deploy and operate the Bither token sale.
//!
//! Every command works on a deployment persisted as JSON in the state
//! directory: `deploy` creates it, the other commands load it, act, and
//! save it back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bither_core::clock::SystemClock;
use bither_core::constants::DECIMALS;
use bither_core::traits::TokenLedger;
use bither_core::types::{format_units, parse_units, Address, Amount, Timestamp};
use bither_deploy::{Deployment, DeploymentConfig, DeploymentSnapshot};
use bither_multisig::Execution;
use bither_sale::SaleStatus;
use clap::{Args, Parser, Subcommand};
use tracing::info;

/// Bither token sale deployment tool.
#[derive(Parser)]
#[command(name = "bither-cli")]
#[command(version, about = "Deploy and operate the Bither token sale")]
struct Cli {
    /// Configuration file (TOML or JSON). BITHER_* variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Deployment state file (default: <state_dir>/deployment.json).
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy tokens, multisig wallet and crowdsale.
    Deploy(DeployArgs),
    /// Submit the BTR and BSK approval transactions to the multisig.
    SubmitApprovals(OwnerArgs),
    /// Confirm approval transactions as a multisig owner.
    ConfirmApprovals(ConfirmArgs),
    /// Show the allowances granted to the crowdsale.
    DisplayAllowance,
    /// Credit ether to an account.
    Fund(FundArgs),
    /// Buy tokens from the crowdsale.
    Buy(BuyArgs),
    /// Show sale and multisig state.
    Status,
}

#[derive(Args)]
struct DeployArgs {
    /// Stop after creating the crowdsale; approvals are left to the owners.
    #[arg(long)]
    skip_approvals: bool,

    /// Replace an existing deployment.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct OwnerArgs {
    /// Multisig owner address.
    #[arg(short, long)]
    owner: Address,
}

#[derive(Args)]
struct ConfirmArgs {
    /// Multisig owner address.
    #[arg(short, long)]
    owner: Address,

    /// Transaction ids to confirm (default: configured ids).
    #[arg(long, value_delimiter = ',')]
    ids: Option<Vec<u64>>,
}

#[derive(Args)]
struct FundArgs {
    /// Account to credit.
    #[arg(short, long)]
    account: Address,

    /// Amount in ether (e.g. 1.5).
    #[arg(short = 'n', long)]
    amount: String,
}

#[derive(Args)]
struct BuyArgs {
    /// Contributor address.
    #[arg(short, long)]
    contributor: Address,

    /// Contribution in ether (e.g. 1.5).
    #[arg(short = 'n', long)]
    amount: String,

    /// Purchase time as Unix seconds (default: now).
    #[arg(long)]
    at: Option<Timestamp>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = DeploymentConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let state_path = cli.state.clone().unwrap_or_else(|| config.state_path());

    match cli.command {
        Commands::Deploy(args) => deploy(&config, state_path, args),
        Commands::SubmitApprovals(args) => submit_approvals(&config, state_path, args),
        Commands::ConfirmApprovals(args) => confirm_approvals(&config, state_path, args),
        Commands::DisplayAllowance => display_allowance(state_path),
        Commands::Fund(args) => fund(state_path, args),
        Commands::Buy(args) => buy(state_path, args),
        Commands::Status => status(state_path),
    }
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

fn load(state_path: &Path) -> Result<Deployment> {
    let snapshot = DeploymentSnapshot::load(state_path)
        .with_context(|| format!("Failed to load deployment from {}", state_path.display()))?;
    Deployment::restore(snapshot, Arc::new(SystemClock)).context("Failed to restore deployment")
}

fn save(deployment: &Deployment, state_path: &Path) -> Result<()> {
    deployment
        .snapshot()
        .save(state_path)
        .with_context(|| format!("Failed to save deployment to {}", state_path.display()))
}

fn parse_ether(s: &str) -> Result<Amount> {
    parse_units(s, DECIMALS).with_context(|| format!("Invalid ether amount: {s}"))
}

fn ether(amount: Amount) -> String {
    format_units(amount, DECIMALS)
}

fn timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn deploy(config: &DeploymentConfig, state_path: PathBuf, args: DeployArgs) -> Result<()> {
    if state_path.exists() && !args.force {
        bail!("Deployment already exists: {} (use --force to replace)", state_path.display());
    }

    let deployment = Deployment::deploy(config, Arc::new(SystemClock), !args.skip_approvals)
        .context("Deployment failed")?;
    save(&deployment, &state_path)?;

    let t = deployment.tokens();
    println!("BitherToken:       {}", t.btr);
    println!("BitherStockToken:  {}", t.bsk);
    println!("MultiSigWallet:    {}", t.multisig);
    println!("BitherCrowdsale:   {}", t.crowdsale);
    println!(
        "Owners:            {} ({} confirmations required)",
        config.owners.len(),
        config.confirmations
    );
    if args.skip_approvals {
        println!("\nApprovals not submitted. Run submit-approvals, then confirm-approvals.");
    } else {
        for allowance in deployment.display_allowance()? {
            println!("{} {} approved for the crowdsale", ether(allowance.allowance), allowance.symbol);
        }
    }
    println!("\nState saved to: {}", state_path.display());
    Ok(())
}

fn submit_approvals(config: &DeploymentConfig, state_path: PathBuf, args: OwnerArgs) -> Result<()> {
    let deployment = load(&state_path)?;
    let ids = deployment
        .submit_approvals(&args.owner, config.btr_allowance_units(), config.bsk_allowance_units())
        .context("Failed to submit approvals")?;
    save(&deployment, &state_path)?;

    for (symbol, id) in [("BTR", ids.btr), ("BSK", ids.bsk)] {
        println!("Approve transaction for {symbol} added to the multisig.");
        println!("  Transaction ID {id} needs confirmation by the other owners before it executes.");
    }
    Ok(())
}

fn confirm_approvals(config: &DeploymentConfig, state_path: PathBuf, args: ConfirmArgs) -> Result<()> {
    let deployment = load(&state_path)?;
    let ids = args.ids.unwrap_or_else(|| config.transaction_ids.clone());
    let outcomes = deployment
        .confirm_approvals(&args.owner, &ids)
        .context("Failed to confirm approvals")?;
    save(&deployment, &state_path)?;

    // Confirmations behind a failed execution are saved above; the
    // transaction stays pending and can be confirmed or retried later.
    let mut failed = Vec::new();
    for (id, outcome) in outcomes {
        match outcome {
            Execution::Executed => println!("Transaction {id} confirmed by {} and executed", args.owner),
            Execution::AwaitingConfirmations { have, need } => {
                println!("Transaction {id} confirmed by {} ({have}/{need})", args.owner)
            }
            Execution::AlreadyExecuted => println!("Transaction {id} was already executed"),
            Execution::Failed(e) => {
                println!("Transaction {id} confirmed but execution failed: {e}");
                failed.push(id);
            }
        }
    }
    if !failed.is_empty() {
        bail!("Approval transactions {failed:?} failed to execute and remain pending");
    }
    Ok(())
}

fn display_allowance(state_path: PathBuf) -> Result<()> {
    let deployment = load(&state_path)?;
    for allowance in deployment.display_allowance()? {
        println!(
            "{} tokens of {} approved for the crowdsale",
            ether(allowance.allowance),
            allowance.symbol
        );
    }
    Ok(())
}

fn fund(state_path: PathBuf, args: FundArgs) -> Result<()> {
    let deployment = load(&state_path)?;
    let amount = parse_ether(&args.amount)?;
    deployment.fund(&args.account, amount).context("Failed to fund account")?;
    save(&deployment, &state_path)?;
    info!(account = %args.account, amount, "account funded");
    println!("Credited {} ETH to {}", ether(amount), args.account);
    Ok(())
}

fn buy(state_path: PathBuf, args: BuyArgs) -> Result<()> {
    let deployment = load(&state_path)?;
    let paid = parse_ether(&args.amount)?;
    let receipt = deployment
        .buy(&args.contributor, paid, args.at)
        .context("Purchase rejected")?;
    save(&deployment, &state_path)?;

    println!("Purchase at {} for {} ETH:", timestamp(receipt.timestamp), ether(receipt.paid));
    for alloc in &receipt.allocations {
        let symbol = deployment
            .ledger()
            .token_info(&alloc.token)
            .map(|info| info.symbol)
            .unwrap_or_default();
        println!("  {} {symbol} (rate {}, phase {})", ether(alloc.amount), alloc.rate, alloc.phase);
    }
    Ok(())
}

fn status(state_path: PathBuf) -> Result<()> {
    let deployment = load(&state_path)?;
    let s = deployment.status()?;

    let sale = match s.sale {
        SaleStatus::NotStarted => "not started",
        SaleStatus::Active => "active",
        SaleStatus::Closed => "closed",
    };
    println!("Deployed:        {}", deployment.created_at().to_rfc3339());
    println!("Sale:            {sale}");
    println!("Opening:         {}", timestamp(s.opening_time));
    println!("Closing:         {}", timestamp(s.closing_time));
    println!("Raised:          {} ETH ({} purchases)", ether(s.raised), s.purchases);
    println!("Cap remaining:   {} ETH", ether(s.cap_remaining));
    for remaining in &s.remaining {
        println!("Remaining {}:   {}", remaining.symbol, ether(remaining.allowance));
    }
    println!("Multisig:        {} of {} owners", s.required, s.owners.len());
    for owner in &s.owners {
        println!("  {owner}");
    }
    println!("Multisig ETH:    {}", ether(s.wallet_balance));
    println!("Pending txs:     {:?}", s.pending);
    println!("Executed txs:    {:?}", s.executed);
    Ok(())
}
