use crate::context::Context;
use crate::misc::fit_message;
use crate::platform::{Platform, find_supported_url, parse_command_url};
use crate::relay::relay_video;
use crate::strings::{self, Language, Response, StatusReport};
use dptree::case;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::sugar::request::RequestReplyExt;
use teloxide::utils::command::BotCommands;
use url::Url;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start working with the bot")]
    Start,
    #[command(description = "show help")]
    Help,
    #[command(description = "check that the bot is alive")]
    Ping,
    #[command(description = "<link> download a video")]
    Download(String),
    #[command(description = "<link> diagnose a link")]
    Check(String),
    #[command(description = "bot status")]
    Status,
    #[command(description = "<link> video details")]
    Info(String),
    #[command(description = "toggle premium mode")]
    Premium,
}

pub fn schema() -> UpdateHandler<RequestError> {
    let commands = Update::filter_message()
        .filter_command::<Command>()
        .branch(case![Command::Start].endpoint(Command::start))
        .branch(case![Command::Help].endpoint(Command::help))
        .branch(case![Command::Ping].endpoint(Command::ping))
        .branch(case![Command::Download(url)].endpoint(Command::download))
        .branch(case![Command::Check(url)].endpoint(Command::check))
        .branch(case![Command::Status].endpoint(Command::status))
        .branch(case![Command::Info(url)].endpoint(Command::info))
        .branch(case![Command::Premium].endpoint(Command::premium));

    dptree::entry()
        .branch(commands)
        .branch(Update::filter_message().endpoint(receive_link))
}

fn language_of(msg: &Message) -> Language {
    Language::from(msg.from.as_ref())
}

async fn reply(bot: &Bot, msg: &Message, text: &str) -> ResponseResult<Message> {
    bot.send_message(msg.chat.id, fit_message(text)).reply_to(msg.id).await
}

/// Parses the command argument, replying with usage help when it is not a link.
async fn require_url(bot: &Bot, msg: &Message, argument: &str, command: &str) -> ResponseResult<Option<Url>> {
    match parse_command_url(argument) {
        Some(url) => Ok(Some(url)),
        None => {
            reply(bot, msg, &strings::usage(language_of(msg), command)).await?;
            Ok(None)
        }
    }
}

impl Command {
    pub async fn start(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
        reply(&bot, &msg, &strings::welcome(language_of(&msg), &ctx.config.limits)).await?;
        Ok(())
    }

    pub async fn help(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
        reply(&bot, &msg, &strings::help(language_of(&msg), &ctx.config.limits)).await?;
        Ok(())
    }

    pub async fn ping(bot: Bot, msg: Message) -> ResponseResult<()> {
        reply(&bot, &msg, Response::Pong.as_str(language_of(&msg))).await?;
        Ok(())
    }

    pub async fn download(bot: Bot, msg: Message, ctx: Arc<Context>, url: String) -> ResponseResult<()> {
        let Some(url) = require_url(&bot, &msg, &url, "download").await? else {
            return Ok(());
        };

        relay_video(&bot, &msg, url, &ctx).await
    }

    pub async fn check(bot: Bot, msg: Message, ctx: Arc<Context>, url: String) -> ResponseResult<()> {
        let Some(url) = require_url(&bot, &msg, &url, "check").await? else {
            return Ok(());
        };

        let language = language_of(&msg);
        let shown_url = url.to_string();

        let status = reply(&bot, &msg, &strings::check_progress(1, language)).await?;
        let edit = |text: String| bot.edit_message_text(msg.chat.id, status.id, fit_message(&text));

        let basic = match ctx.downloader.fetch_flat_info(&url).await {
            Ok(info) => info,
            Err(err) => {
                log::error!("Check of {url} failed: {err}");
                edit(strings::check_failed(&err.detail(), &shown_url, language)).await?;
                return Ok(());
            }
        };

        edit(strings::check_progress(2, language)).await?;

        let report = match ctx.downloader.fetch_info(&url).await {
            Ok(ref detailed) => strings::check_report(&basic, Ok(detailed), &shown_url, language),
            Err(ref err) => strings::check_report(&basic, Err(err.detail().as_str()), &shown_url, language),
        };

        edit(report).await?;
        Ok(())
    }

    pub async fn info(bot: Bot, msg: Message, ctx: Arc<Context>, url: String) -> ResponseResult<()> {
        let Some(url) = require_url(&bot, &msg, &url, "info").await? else {
            return Ok(());
        };

        let language = language_of(&msg);
        let ceiling = ctx.ceiling_for(msg.from.as_ref().map(|user| user.id)).await;

        let status = reply(&bot, &msg, Response::Processing.as_str(language)).await?;

        let text = match ctx.downloader.fetch_info(&url).await {
            Ok(info) => strings::info(&info, Platform::detect(&url), ceiling, language),
            Err(err) => {
                log::error!("Info for {url} failed: {err}");
                strings::failure(err.kind(), &err.detail(), language)
            }
        };

        bot.edit_message_text(msg.chat.id, status.id, fit_message(&text)).await?;
        Ok(())
    }

    pub async fn status(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
        let user_id = msg.from.as_ref().map(|user| user.id);
        let is_premium = ctx.is_premium(user_id).await;
        let mode = ctx.mode.to_string();
        let ytdlp_version = ctx.downloader.version().await;

        let report = StatusReport {
            snapshot: ctx.stats.snapshot(),
            mode: &mode,
            premium_users: ctx.premium.len().await,
            is_premium,
            ceiling: ctx.config.limits.ceiling(is_premium),
            ytdlp_version: &ytdlp_version,
        };

        reply(&bot, &msg, &strings::status(&report, language_of(&msg))).await?;
        Ok(())
    }

    pub async fn premium(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
        let language = language_of(&msg);

        let Some(user) = msg.from.as_ref() else {
            reply(&bot, &msg, Response::NoUser.as_str(language)).await?;
            return Ok(());
        };

        let text = if ctx.premium.toggle(user.id).await {
            log::info!("Premium mode enabled for {}", user.id.0);
            strings::premium_enabled(&ctx.config.limits, language)
        } else {
            log::info!("Premium mode disabled for {}", user.id.0);
            Response::PremiumDisabled.as_str(language).to_owned()
        };

        reply(&bot, &msg, &text).await?;
        Ok(())
    }
}

/// Plain messages: anything with a supported link gets downloaded.
async fn receive_link(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(text) = msg.text() else { return Ok(()) };

    match find_supported_url(text) {
        Some(url) => relay_video(&bot, &msg, url, &ctx).await,
        None => {
            reply(&bot, &msg, Response::NoSupportedLink.as_str(language_of(&msg))).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands_with_links() {
        let parsed = Command::parse("/download https://youtu.be/abc", "vidrelay_bot").unwrap();
        assert_eq!(parsed, Command::Download("https://youtu.be/abc".to_owned()));

        let parsed = Command::parse("/info@vidrelay_bot https://vk.com/video1_2", "vidrelay_bot").unwrap();
        assert_eq!(parsed, Command::Info("https://vk.com/video1_2".to_owned()));
    }

    #[test]
    fn link_commands_accept_a_missing_argument() {
        assert_eq!(Command::parse("/check", "vidrelay_bot").unwrap(), Command::Check(String::new()));
    }

    #[test]
    fn parses_plain_commands() {
        for (text, expected) in [
            ("/start", Command::Start),
            ("/help", Command::Help),
            ("/ping", Command::Ping),
            ("/status", Command::Status),
            ("/premium", Command::Premium),
        ] {
            assert_eq!(Command::parse(text, "vidrelay_bot").unwrap(), expected);
        }
    }

    #[test]
    fn every_command_is_described() {
        let descriptions = Command::descriptions().to_string();
        for name in ["/start", "/help", "/ping", "/download", "/check", "/status", "/info", "/premium"] {
            assert!(descriptions.contains(name), "{name} missing from {descriptions}");
        }
    }
}
