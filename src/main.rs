mod commands;
mod config;
mod context;
mod errors;
mod misc;
mod platform;
mod premium;
mod relay;
mod server;
mod split;
mod stats;
mod strings;
mod ytdlp;

use commands::Command;
use config::Config;
use context::Context;
use misc::log_error;
use server::HealthState;
use std::sync::Arc;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use ytdlp::Downloader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine, the real environment still applies
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();
    log::info!("Starting...");

    let config = Config::from_env()?;
    let bot = Bot::new(config.token.clone());

    log::info!("Preparing yt-dlp (can take a while)...");
    let downloader = Arc::new(Downloader::new(config.ytdlp.clone(), &config.workdir).await?);
    log::info!("...done, yt-dlp {}", downloader.version().await);

    tokio::spawn(ytdlp::update_ytdlp(downloader.clone()));

    let ctx = Arc::new(Context::new(config, downloader));
    let health = HealthState {
        stats: ctx.stats.clone(),
        mode: ctx.mode,
    };

    let _ = log_error(bot.set_my_commands(Command::bot_commands()).await);

    let mut dispatcher = Dispatcher::builder(bot.clone(), commands::schema())
        .dependencies(dptree::deps![ctx.clone()])
        .enable_ctrlc_handler()
        .build();

    let addr = ctx.config.listen_addr();

    if let Some(url) = ctx.config.webhook_url() {
        log::info!("Receiving updates through the webhook at {url}");

        let mut options = webhooks::Options::new(addr, url);
        if let Some(ref secret) = ctx.config.webhook_secret {
            options = options.secret_token(secret.clone());
        }

        let (listener, stop_flag, webhook) = webhooks::axum_to_router(bot, options).await?;
        let app = webhook.merge(server::router(health));

        tokio::spawn(async move {
            let _ = log_error(server::serve(addr, app, stop_flag).await);
        });

        dispatcher
            .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("An error from the webhook listener"))
            .await;
    } else {
        log::info!("No external URL configured, using long polling");

        tokio::spawn(async move {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let _ = log_error(server::serve(addr, server::router(health), shutdown).await);
        });

        dispatcher.dispatch().await;
    }

    log::info!("Stopped, cleaning up downloads");
    Ok(())
}
