//! Presale Trading Agent CLI
//!
//! Command-line interface for running the claim-and-sell agent.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use clap::{Parser, Subcommand};
use presale_trader::chain::erc20::TokenMeta;
use presale_trader::chain::etherscan::EtherscanAbiResolver;
use presale_trader::chain::presale::EthereumChainClient;
use presale_trader::chain::ChainClient;
use presale_trader::exchange::{ExchangeVenue, UniswapV3Venue};
use presale_trader::vesting::compute_claimable;
use presale_trader::wallet::SecureWallet;
use presale_trader::{Config, Error, Result, RpcConfig, Trader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Functions the presale contract must expose before we trust any reads.
const REQUIRED_PRESALE_FUNCTIONS: &[&str] = &["presale", "userClaimData", "claimAmount"];

#[derive(Parser)]
#[command(name = "presale-trader")]
#[command(about = "Unattended presale vesting claim-and-sell agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading loop until interrupted
    Run {
        /// Decide each cycle but never submit transactions
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the wallet's vesting position and claim eligibility
    Status,

    /// Print the current price for one input token
    Quote,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.validate()?;

    match cli.command {
        Commands::Run { dry_run } => run(config, dry_run).await?,
        Commands::Status => status(config).await?,
        Commands::Quote => quote(config).await?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

fn rpc_url(config: &Config) -> Result<url::Url> {
    let rpc = RpcConfig::from_env();
    let raw = rpc
        .url_for(config.network)
        .ok_or_else(|| Error::Config(format!("no RPC URL for {}", config.network.name())))?;
    raw.parse()
        .map_err(|e| Error::Config(format!("invalid RPC URL {raw}: {e}")))
}

/// Read-only provider for quotes and status queries.
fn read_provider(config: &Config) -> Result<DynProvider> {
    Ok(ProviderBuilder::new().connect_http(rpc_url(config)?).erased())
}

/// Signing provider plus the wallet it signs with.
fn signing_provider(config: &Config) -> Result<(DynProvider, SecureWallet)> {
    let wallet = SecureWallet::from_env("PRIVATE_KEY")?;
    let provider = ProviderBuilder::new()
        .wallet(wallet.wallet().clone())
        .connect_http(rpc_url(config)?)
        .erased();
    Ok((provider, wallet))
}

/// Wallet address for read-only commands: derive from PRIVATE_KEY when
/// set, otherwise accept a plain WALLET_ADDRESS.
fn wallet_address_from_env() -> Result<Address> {
    if let Ok(wallet) = SecureWallet::from_env("PRIVATE_KEY") {
        return Ok(wallet.address());
    }
    let raw = std::env::var("WALLET_ADDRESS")
        .map_err(|_| Error::Config("set PRIVATE_KEY or WALLET_ADDRESS".to_string()))?;
    raw.parse()
        .map_err(|e| Error::Config(format!("invalid WALLET_ADDRESS: {e}")))
}

async fn build_venue(
    provider: DynProvider,
    config: &Config,
    wallet_address: Address,
) -> Result<(TokenMeta, Arc<UniswapV3Venue>)> {
    let input_token = TokenMeta::load(provider.clone(), config.contracts.input_token).await?;
    let output_token = TokenMeta::load(provider.clone(), config.contracts.output_token).await?;
    tracing::info!(
        input = %input_token.symbol,
        output = %output_token.symbol,
        pool_fee = config.trading.pool_fee,
        "Resolved token pair"
    );
    let venue = UniswapV3Venue::new(
        provider,
        config.contracts.swap_router,
        config.contracts.quoter,
        input_token.clone(),
        output_token,
        wallet_address,
        config.trading.pool_fee,
        config.trading.slippage_permille,
    );
    Ok((input_token, Arc::new(venue)))
}

async fn run(config: Config, dry_run: bool) -> Result<()> {
    tracing::info!(
        network = config.network.name(),
        presale_id = config.presale_id,
        dry_run,
        "Starting presale trading agent"
    );

    let (provider, wallet) = signing_provider(&config)?;
    tracing::info!(address = %wallet.address(), "Loaded wallet from PRIVATE_KEY");

    // The presale interface must resolve before anything trusts its reads.
    let resolver = EtherscanAbiResolver::from_env()?;
    resolver
        .verify_interface(config.contracts.presale, REQUIRED_PRESALE_FUNCTIONS)
        .await?;
    tracing::info!(contract = %config.contracts.presale, "Presale interface verified");

    let (input_token, venue) = build_venue(provider.clone(), &config, wallet.address()).await?;
    let chain = Arc::new(EthereumChainClient::new(
        provider,
        config.contracts.presale,
        input_token.clone(),
        wallet.address(),
        config.presale_id,
    ));

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, will stop after current iteration");
            let _ = stop_tx.send(true);
        }
    });

    let trader = Trader::new(
        chain,
        venue,
        config.trading.thresholds.clone(),
        config.trading.tranche_size,
        input_token.unit_amount(),
        &config.intervals,
        dry_run,
        stop_rx,
    );
    trader.run().await
}

async fn status(config: Config) -> Result<()> {
    let provider = read_provider(&config)?;
    let address = wallet_address_from_env()?;
    let input_token = TokenMeta::load(provider.clone(), config.contracts.input_token).await?;
    let chain = EthereumChainClient::new(
        provider,
        config.contracts.presale,
        input_token.clone(),
        address,
        config.presale_id,
    );

    let schedule = chain.vesting_schedule().await?;
    let claim_state = chain.claim_state().await?;
    let now = chain.current_time().await?;
    let balance = chain.wallet_balance().await?;
    let claimable = compute_claimable(&schedule, &claim_state, now);

    let start = chrono::DateTime::from_timestamp(schedule.start_time as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| schedule.start_time.to_string());

    println!("Wallet:           {address}");
    println!("Token:            {} ({} decimals)", input_token.symbol, input_token.decimals);
    println!("Vesting start:    {start}");
    println!(
        "Schedule:         {}‰ initial, {}‰ per {}s cycle, {} cycles",
        schedule.initial_claim_permille,
        schedule.permille_per_cycle,
        schedule.cycle_duration,
        schedule.total_cycles
    );
    println!("Allocated:        {}", claim_state.total_allocated);
    println!(
        "Claimed:          {} over {} claims",
        claim_state.claimed_amount, claim_state.claim_count
    );
    println!("Claims enabled:   {}", claim_state.claim_enabled);
    println!("Wallet balance:   {balance}");
    println!("Claimable now:    {}", claimable.amount);
    println!("Claim eligible:   {}", claimable.eligible);
    Ok(())
}

async fn quote(config: Config) -> Result<()> {
    let provider = read_provider(&config)?;
    // Quotes need no signer; any address satisfies the venue.
    let (input_token, venue) = build_venue(provider, &config, Address::ZERO).await?;

    let quote = venue.quote(input_token.unit_amount()).await?;
    println!(
        "1 {} = {} (raw out: {})",
        input_token.symbol,
        quote.price(),
        quote.output_amount
    );
    Ok(())
}
