use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};

use wa2tg_core::{
    config::{ensure_config_file, Config, ConfigLocation, DEFAULT_CONFIG_NAME},
    destination::Destination,
    exporter::{login_source, pairing_code_printer, Exporter},
    messaging::{port::MessagingPort, throttled::ThrottledMessenger},
    pacing::TokenBucket,
    source::{ChatSource, SourceState},
};
use wa2tg_telegram::TelegramMessenger;
use wa2tg_whatsapp::{SessionStore, WebConnector, WhatsAppClient};

/// Export WhatsApp chats, including messages and media, to Telegram channels or groups.
#[derive(Debug, Parser)]
#[command(name = "wa2tg", version)]
struct Cli {
    /// Config file name without extension
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_NAME)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Login to WhatsApp by scanning the QR code with your phone
    Login,
    /// Export a specific WhatsApp chat to Telegram
    Export {
        /// Chat name to export
        #[arg(long, short)]
        chat: String,
    },
    /// List WhatsApp chats available for export
    Chats,
    /// Export every WhatsApp chat to Telegram, skipping chats that fail
    ExportAll,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = wa2tg_core::logging::init("wa2tg") {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loc = ConfigLocation::new(cli.config);
    if ensure_config_file(&loc)? {
        tracing::info!("created default config at {}", loc.path().display());
    }
    let cfg = Arc::new(Config::load(&loc).context("error loading config")?);

    match cli.command {
        Command::Login => login(&cfg).await,
        Command::Export { chat } => export_chat(cfg, &chat).await,
        Command::Chats => list_chats(&cfg).await,
        Command::ExportAll => export_all(cfg).await,
    }
}

fn whatsapp_client(cfg: &Config) -> anyhow::Result<Arc<WhatsAppClient>> {
    let connector = WebConnector::new(
        cfg.whatsapp.endpoint.clone(),
        cfg.whatsapp.connect_timeout(),
    )?;
    Ok(Arc::new(WhatsAppClient::new(
        Arc::new(connector),
        SessionStore::new(cfg.whatsapp.session_file.clone()),
    )))
}

fn build_exporter(cfg: Arc<Config>) -> anyhow::Result<Exporter> {
    cfg.require_telegram()?;

    // Pace raw Telegram calls so long exports stay under the bot API flood limits.
    // The adapter still honours RetryAfter responses on top of this.
    let raw: Arc<dyn MessagingPort> =
        Arc::new(TelegramMessenger::from_token(&cfg.telegram.bot_token));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw,
        Arc::new(TokenBucket::every(cfg.export.message_interval())),
    ));
    let destination = Destination::new(messenger, &cfg.telegram.chat_id)
        .context("error creating Telegram client")?;

    let source: Arc<dyn ChatSource> = whatsapp_client(&cfg)?;
    let chat_pacer = Arc::new(TokenBucket::every(cfg.export.chat_interval()));
    Ok(Exporter::new(cfg, source, destination, chat_pacer))
}

async fn login(cfg: &Config) -> anyhow::Result<()> {
    let source = whatsapp_client(cfg)?;
    source
        .connect()
        .await
        .context("error connecting to WhatsApp")?;
    let state = source.state().await;
    tracing::info!(%state, "connected to WhatsApp");
    if state == SourceState::Authenticated {
        println!("Saved session restored, pairing again replaces it.");
    }

    println!("Logging in to WhatsApp...");
    let res = login_source(
        source.as_ref(),
        cfg.whatsapp.login_timeout(),
        pairing_code_printer(),
    )
    .await
    .context("error logging in to WhatsApp");
    let _ = source.disconnect().await;
    res?;

    println!("Login successful!");
    Ok(())
}

async fn export_chat(cfg: Arc<Config>, chat: &str) -> anyhow::Result<()> {
    let exp = build_exporter(cfg)?;
    let state = exp.connect().await.context("error connecting to WhatsApp")?;
    tracing::info!(%state, "connected to WhatsApp");

    let res = async {
        let me = exp
            .validate_destination()
            .await
            .context("error validating Telegram connection")?;
        tracing::info!(bot = ?me.username, "Telegram connection validated");

        println!("Exporting chat '{chat}' to Telegram...");
        let stats = exp.export_chat(chat).await.context("error exporting chat")?;
        println!(
            "Export completed successfully! {} messages, {} media files ({} skipped)",
            stats.messages_sent, stats.media_sent, stats.media_skipped
        );
        anyhow::Ok(())
    }
    .await;

    let _ = exp.disconnect().await;
    res
}

async fn list_chats(cfg: &Config) -> anyhow::Result<()> {
    let source = whatsapp_client(cfg)?;
    source
        .connect()
        .await
        .context("error connecting to WhatsApp")?;

    let res = source.get_chats().await.context("error listing chats");
    let _ = source.disconnect().await;

    for chat in res? {
        println!("{chat}");
    }
    Ok(())
}

async fn export_all(cfg: Arc<Config>) -> anyhow::Result<()> {
    let exp = build_exporter(cfg)?;
    let state = exp.connect().await.context("error connecting to WhatsApp")?;
    tracing::info!(%state, "connected to WhatsApp");

    let res = async {
        exp.validate_destination()
            .await
            .context("error validating Telegram connection")?;
        let summary = exp.export_all_chats().await?;
        println!(
            "Exported {} chats, {} failed",
            summary.exported.len(),
            summary.failed.len()
        );
        for (chat, err) in &summary.failed {
            println!("  {chat}: {err}");
        }
        anyhow::Ok(())
    }
    .await;

    let _ = exp.disconnect().await;
    res
}
