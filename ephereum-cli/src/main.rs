//! Ephereum CLI
//!
//! Command-line interface for stealth-addressed encrypted messaging.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ephereum_core::traits::{LogSource, MetaAddressRegistry};
use ephereum_core::types::{ChatMessage, EthAddress, MetaAddress};
use ephereum_payload::prepare_message;
use ephereum_registry::{
    resolve_recipient, CachedLogSource, CachedMetaAddressRegistry, DirBlobStore, JsonRpcLogSource,
};
use ephereum_scanner::{AnnouncementScanner, ProgressCallback, ScanSummary};
use ephereum_stealth::{KeysExport, RecipientKeys};
use ephereum_sync::{sent_messages, ChatSyncEngine, MemorySyncStore, SyncConfig, SyncOutcome};

use crate::config::CliConfig;

/// Ephereum - stealth-addressed encrypted chat over Ethereum
#[derive(Parser)]
#[command(name = "ephereum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Ethereum RPC URL (overrides ETH_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Message envelope registry (overrides EPHEREUM_REGISTRY_ADDRESS)
    #[arg(long, global = true)]
    registry: Option<String>,

    /// RPC timeout in seconds (overrides RPC_TIMEOUT_SECONDS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate recipient keys
    Keygen {
        /// Derive keys from a wallet signature (hex) instead of randomly
        #[arg(long)]
        signature: Option<String>,
        /// Output file for keys (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Meta-address utilities
    MetaAddress {
        #[command(subcommand)]
        action: MetaAddressAction,
    },

    /// Encrypt a message and build its announcement
    Prepare {
        /// Recipient meta-address, or an address registered with ERC-6538
        #[arg(long)]
        to: String,
        /// Thread (subject)
        #[arg(long, default_value = "")]
        thread: String,
        /// Message text
        #[arg(short, long)]
        message: String,
        /// Directory to write the blob file to
        #[arg(long)]
        blob_out: Option<PathBuf>,
    },

    /// Scan announcements for messages addressed to you
    Scan {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// First block to scan
        #[arg(long, default_value = "0")]
        from_block: u64,
    },

    /// Run one sync cycle and print the mailbox
    Sync {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Directory holding blob files (overrides EPHEREUM_BLOB_DIR)
        #[arg(long)]
        blob_dir: Option<PathBuf>,
        /// First block to scan
        #[arg(long, default_value = "0")]
        from_block: u64,
    },

    /// List messages sent by an account
    Sent {
        /// Sending account
        #[arg(long)]
        account: String,
        /// First block to scan
        #[arg(long, default_value = "0")]
        from_block: u64,
    },
}

#[derive(Subcommand)]
enum MetaAddressAction {
    /// Check that a string is a valid scheme 2 meta-address
    Validate {
        /// `0x…` or `st:eth:0x…`
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = CliConfig::from_env();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ephereum=debug,info"
    } else {
        "ephereum=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = config.with_overrides(cli.rpc_url, cli.registry, cli.timeout);

    match cli.command {
        Commands::Keygen { signature, output } => cmd_keygen(signature.as_deref(), output),
        Commands::MetaAddress {
            action: MetaAddressAction::Validate { value },
        } => cmd_validate(&value),
        Commands::Prepare {
            to,
            thread,
            message,
            blob_out,
        } => cmd_prepare(&config, &to, &thread, &message, blob_out).await,
        Commands::Scan { keys, from_block } => cmd_scan(&config, &keys, from_block).await,
        Commands::Sync {
            keys,
            blob_dir,
            from_block,
        } => cmd_sync(&config, &keys, blob_dir, from_block).await,
        Commands::Sent { account, from_block } => cmd_sent(&config, &account, from_block).await,
    }
}

fn load_keys(path: &Path) -> Result<RecipientKeys> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open keys file {}", path.display()))?;
    let export: KeysExport = serde_json::from_reader(file).context("Keys file is not valid JSON")?;
    RecipientKeys::from_export(&export).context("Keys file holds invalid keys")
}

fn rpc_client(config: &CliConfig) -> Result<Arc<JsonRpcLogSource>> {
    Ok(Arc::new(
        JsonRpcLogSource::with_config(config.rpc_config()).context("Failed to create RPC client")?,
    ))
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_message(message: &ChatMessage) {
    let position = match (message.block_number, message.log_index) {
        (Some(block), Some(log)) => format!("#{}:{}", block, log),
        _ => "unconfirmed".to_string(),
    };
    let from = message
        .sender
        .map(|s| s.to_hex_string())
        .unwrap_or_else(|| "unknown".into());

    println!("   {} [{}] {}", position.dimmed(), message.thread_id.cyan(), from.dimmed());
    if message.content_available {
        println!("      {}", message.content);
    } else {
        println!("      {}", message.content.yellow());
    }
}

/// Generate recipient keys
fn cmd_keygen(signature: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    println!("{}", "🔑 Generating Ephereum keys...".cyan().bold());

    let keys = match signature {
        Some(sig) => {
            let bytes = hex::decode(sig.trim_start_matches("0x")).context("Signature is not hex")?;
            RecipientKeys::from_signature(&bytes).context("Failed to derive keys from signature")?
        }
        None => RecipientKeys::generate(),
    };
    let export = keys.export()?;

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&export)?)?;
        println!("{} {}", "✅ Keys saved to:".green(), path.display());
    } else {
        println!("\n{}", "Keys (JSON):".yellow().bold());
        println!("{}", serde_json::to_string_pretty(&export)?);
    }

    println!("\n{} {}", "Meta-address:".green().bold(), export.meta_address);
    println!("\n{}", "⚠️  IMPORTANT: Keep your private keys safe!".red().bold());
    println!("   The view key reads your messages; both keys control your stealth addresses.");

    Ok(())
}

/// Validate a meta-address string
fn cmd_validate(value: &str) -> Result<()> {
    if !MetaAddress::is_valid(value) {
        bail!("Not a meta-address: expected 0x followed by 134 hex characters");
    }

    let meta = MetaAddress::parse(value).context("Invalid meta-address")?;
    println!("{}", "✅ Valid meta-address".green().bold());
    println!("   {} 0x{:02x}", "Scheme:".dimmed(), meta.scheme());
    println!("   {} {}", "Spend key:".dimmed(), meta.spend_pub_key());
    println!("   {} {}", "View key:".dimmed(), meta.view_pub_key());
    Ok(())
}

/// Encrypt a message and build the announce transaction
async fn cmd_prepare(
    config: &CliConfig,
    to: &str,
    thread: &str,
    message: &str,
    blob_out: Option<PathBuf>,
) -> Result<()> {
    println!("{} {}", "✉️  Preparing message to:".cyan().bold(), to);

    let registry: Arc<dyn MetaAddressRegistry> = rpc_client(config)?;
    let registry = CachedMetaAddressRegistry::new(registry);
    let recipient = resolve_recipient(to, &registry)
        .await
        .context("Failed to resolve recipient")?;

    let envelope = prepare_message(&recipient, message, thread).context("Failed to prepare message")?;

    println!("\n{}", "✅ Message prepared:".green().bold());
    println!("   {} {}", "Stealth address:".dimmed(), envelope.stealth_address);
    println!("   {} 0x{:02x}", "View tag:".dimmed(), envelope.view_tag);
    println!("   {} {}", "Ephemeral key:".dimmed(), envelope.ephemeral_pub_key);
    println!("   {} {}", "Payload hash:".dimmed(), envelope.payload_hash);
    println!("   {} {}", "Thread:".dimmed(), envelope.thread_id);
    println!("   {} {} blob(s)", "Blobs:".dimmed(), envelope.blobs.len());

    println!("\n{}", "Announce to:".yellow().bold());
    println!("   {}", config.registry_address);
    println!("{}", "Calldata:".yellow().bold());
    println!("0x{}", hex::encode(&envelope.calldata));
    println!("{}", "Frame:".yellow().bold());
    println!("0x{}", hex::encode(&envelope.frame));

    if let Some(dir) = blob_out {
        let path = dir.join(format!("{}.blob", envelope.payload_hash));
        std::fs::create_dir_all(&dir)?;
        std::fs::write(&path, envelope.blobs.concat())?;
        println!("\n{} {}", "✅ Blobs saved to:".green(), path.display());
        println!("   Rename it to the announcing transaction hash (0x...) once mined.");
    }

    Ok(())
}

/// Scan for messages
async fn cmd_scan(config: &CliConfig, keys_path: &Path, from_block: u64) -> Result<()> {
    println!("{}", "🔎 Scanning for messages...".cyan().bold());

    let keys = load_keys(keys_path)?;
    let source: Arc<dyn LogSource> = rpc_client(config)?;
    let scanner = AnnouncementScanner::with_config(source, config.scanner_config()?);

    let pb = spinner("Fetching announcements")?;
    let progress_pb = pb.clone();
    let callback: ProgressCallback = Box::new(move |progress| {
        progress_pb.set_message(format!("{}/{} checked", progress.scanned, progress.total));
    });

    let outcome = scanner
        .scan_with_progress(&keys, from_block, callback)
        .await
        .context("Scan failed")?;
    pb.finish_and_clear();

    let summary = ScanSummary::from(outcome.stats.clone());
    println!(
        "   {} {} announcements, {} view tag hits, {:.1}% filtered",
        "Scanned:".dimmed(),
        summary.total_scanned,
        summary.view_tag_matches,
        summary.filter_efficiency
    );

    if outcome.matches.is_empty() {
        println!("\n{}", "No messages found.".yellow());
        return Ok(());
    }

    println!("\n{} {} message(s) found:", "✅".green(), outcome.matches.len());
    for found in &outcome.matches {
        println!("   {} {}", "Stealth address:".green(), found.stealth_address);
        println!("      {} #{}:{}", "Position:".dimmed(), found.block_number, found.log_index);
        println!("      {} {}", "Transaction:".dimmed(), found.transaction_hash);
        println!("      {} {}", "Id:".dimmed(), found.message_id());
    }

    Ok(())
}

/// Run one sync cycle
async fn cmd_sync(config: &CliConfig, keys_path: &Path, blob_dir: Option<PathBuf>, from_block: u64) -> Result<()> {
    println!("{}", "🔄 Syncing mailbox...".cyan().bold());

    let keys = load_keys(keys_path)?;
    let blob_dir = blob_dir
        .or_else(|| config.blob_dir.clone())
        .context("No blob directory: pass --blob-dir or set EPHEREUM_BLOB_DIR")?;

    let source: Arc<dyn LogSource> = Arc::new(CachedLogSource::new(rpc_client(config)?));
    let engine = ChatSyncEngine::with_config(
        source,
        Arc::new(DirBlobStore::new(blob_dir)),
        Arc::new(MemorySyncStore::new()),
        SyncConfig::new()
            .scanner(config.scanner_config()?)
            .start_block(from_block),
    );
    engine.set_identity(Some(keys));

    let pb = spinner("Syncing")?;
    let outcome = engine.sync_now().await;
    pb.finish_and_clear();

    match outcome {
        SyncOutcome::Completed(report) => {
            println!(
                "   {} {} new, {} pending, synced to block {}",
                "Done:".green(),
                report.new_messages,
                report.still_pending,
                report
                    .last_synced_block
                    .map_or_else(|| "-".to_string(), |b| b.to_string())
            );
        }
        SyncOutcome::Failed(message) => bail!(message),
        SyncOutcome::Skipped | SyncOutcome::Discarded => bail!("Sync did not run"),
    }

    let messages = engine.messages_for_display();
    if messages.is_empty() {
        println!("\n{}", "Mailbox is empty.".yellow());
        return Ok(());
    }

    println!("\n{}", "📬 Mailbox:".green().bold());
    for message in &messages {
        print_message(message);
    }

    Ok(())
}

/// List sent messages
async fn cmd_sent(config: &CliConfig, account: &str, from_block: u64) -> Result<()> {
    let account = EthAddress::from_hex(account).context("Invalid account address")?;
    println!("{} {}", "📤 Messages sent by:".cyan().bold(), account);

    let source = rpc_client(config)?;
    let history = sent_messages(source.as_ref(), &config.scanner_config()?, &[account], from_block)
        .await
        .context("Failed to load sent messages")?;

    if history.messages.is_empty() {
        println!("\n{}", "No sent messages.".yellow());
    } else {
        for message in &history.messages {
            print_message(message);
        }
    }

    if let Some(block) = history.latest_block {
        println!("\n   {} {}", "Latest block:".dimmed(), block);
    }

    Ok(())
}
