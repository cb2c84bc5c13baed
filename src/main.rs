use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use takings_bot::bot::{self, BotContext};
use takings_bot::config::{BotConfig, LogFormat};
use takings_bot::conversation::ConversationMachine;
use takings_bot::health;
use takings_bot::localization::LocalizationManager;
use takings_bot::sheets::GoogleSheetSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Read configuration before logging so LOG_FORMAT applies
    let config = BotConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|config| config.log_format)
            .unwrap_or_default(),
    );

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    info!("Starting Takings Telegram Bot");

    // Bind the health port first so the host sees it while the sheet connects
    let listener = health::bind(config.port).await?;
    health::spawn(listener);

    let sink = match GoogleSheetSink::open(config.credentials.clone(), &config.sheet_name).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "Failed to connect to Google Sheets");
            return Err(e);
        }
    };

    let ctx = Arc::new(BotContext {
        machine: ConversationMachine::new(Arc::new(sink)),
        messages: LocalizationManager::new()?,
    });

    let bot = Bot::new(config.telegram_token);

    info!("Bot is running");

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let ctx = Arc::clone(&ctx);
        move |bot: Bot, msg: Message| {
            let ctx = Arc::clone(&ctx);
            async move { bot::message_handler(bot, msg, ctx).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}
