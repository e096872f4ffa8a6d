use std::process::ExitCode;
use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use coderelay::config::Config;
use coderelay::error::RelayError;
use coderelay::generate::Generator;
use coderelay::llm::{self, Params};
use coderelay::relay::{worker, Relay, TelegramClient};
use coderelay::server::{self, WebhookState};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", RelayError::from(e));
            return ExitCode::FAILURE;
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "coderelay.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting coderelay...");
    info!("Model: {} (language: {})", config.model_name, config.lang_hint);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bot = Bot::new(&config.telegram_bot_token);

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            me.username().to_string()
        }
        Err(e) => {
            warn!("Failed to get bot info: {e}");
            String::new()
        }
    };

    if let Some(url) = config.webhook_url() {
        match bot.set_webhook(url.clone()).await {
            Ok(_) => info!("Webhook registered at {url}"),
            Err(e) => warn!("Failed to register webhook at {url}: {e}"),
        }
    }

    let completion = llm::Client::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        config.generation_timeout,
    )?;
    let generator = Generator::new(
        Arc::new(completion),
        config.model_name.clone(),
        config.lang_hint.clone(),
        Params {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
        config.generation_timeout,
    );

    let telegram = Arc::new(TelegramClient::new(bot));
    let relay = Arc::new(Relay::new(telegram, generator, config.reply_fallback, bot_username));

    let (enqueuer, rx) = worker::queue(config.queue_capacity, config.enqueue_timeout);
    let worker = tokio::spawn(worker::run(relay, rx));

    let app = server::router(WebhookState { enqueuer });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    server::serve(listener, app).await?;

    // The router owned the last enqueuer, so the worker drains and exits.
    worker.await?;
    Ok(())
}
