use crate::config::UPLOAD_LIMIT;
use crate::context::Context;
use crate::misc::{fit_message, log_error};
use crate::split::split_file;
use crate::stats::Stats;
use crate::strings::{self, Language, Response};
use crate::ytdlp::{DownloadedMedia, VideoInfo};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::sugar::request::RequestReplyExt;
use teloxide::types::{ChatId, InputFile, MessageId};
use url::Url;

/// The message we keep editing while a request is in flight.
struct StatusMessage<'a> {
    bot: &'a Bot,
    chat_id: ChatId,
    id: MessageId,
}

impl StatusMessage<'_> {
    async fn edit(&self, text: &str) -> ResponseResult<()> {
        self.bot.edit_message_text(self.chat_id, self.id, fit_message(text)).await?;
        Ok(())
    }

    async fn delete(&self) -> ResponseResult<()> {
        self.bot.delete_message(self.chat_id, self.id).await?;
        Ok(())
    }
}

enum Delivery {
    Sent,
    TooLarge(u64),
    SendFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered,
    Failed,
}

/// What the metadata alone says about a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precheck {
    Proceed,
    Live,
    TooLarge(u64),
}

fn precheck(info: &VideoInfo, ceiling: u64) -> Precheck {
    if info.is_live() {
        return Precheck::Live;
    }

    match info.estimated_size() {
        Some(size) if size > ceiling => Precheck::TooLarge(size),
        _ => Precheck::Proceed,
    }
}

/// How a downloaded file of `size` bytes reaches the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    TooLarge,
    Video,
    Parts,
}

fn route(size: u64, ceiling: u64, upload_limit: u64) -> Route {
    if size > ceiling {
        Route::TooLarge
    } else if size <= upload_limit {
        Route::Video
    } else {
        Route::Parts
    }
}

/// Downloads `url` and relays the media back to the chat `msg` came from.
pub async fn relay_video(bot: &Bot, msg: &Message, url: Url, ctx: &Context) -> ResponseResult<()> {
    ctx.stats.record_request();

    let job_dir = ctx.downloader.job_dir(&format!("{}-{}", msg.chat.id.0, msg.id.0));
    let outcome = run(bot, msg, &url, ctx, &job_dir).await;
    finish(&ctx.stats, &job_dir, &outcome).await;

    outcome.map(|_| ())
}

/// Counts the request and drops whatever it left on disk, however it ended.
async fn finish(stats: &Stats, job_dir: &Path, outcome: &ResponseResult<Outcome>) {
    match outcome {
        Ok(Outcome::Delivered) => stats.record_delivery(),
        Ok(Outcome::Failed) | Err(_) => stats.record_failure(),
    }

    if tokio::fs::try_exists(job_dir).await.unwrap_or(false) {
        let _ = log_error(tokio::fs::remove_dir_all(job_dir).await);
    }
}

async fn run(bot: &Bot, msg: &Message, url: &Url, ctx: &Context, job_dir: &Path) -> ResponseResult<Outcome> {
    let language = Language::from(msg.from.as_ref());
    let user_id = msg.from.as_ref().map(|user| user.id);
    let ceiling = ctx.ceiling_for(user_id).await;

    let username = msg.from.as_ref().and_then(|user| user.username.clone()).unwrap_or_default();
    log::info!("@{username}: {url}");

    let sent = bot
        .send_message(msg.chat.id, Response::Processing.as_str(language))
        .reply_to(msg.id)
        .await?;
    let status = StatusMessage {
        bot,
        chat_id: msg.chat.id,
        id: sent.id,
    };

    let info = match ctx.downloader.fetch_info(url).await {
        Ok(info) => info,
        Err(err) => {
            log::error!("Failed to get info for {url}: {err}");
            status.edit(&strings::failure(err.kind(), &err.detail(), language)).await?;
            return Ok(Outcome::Failed);
        }
    };

    let verdict = precheck(&info, ceiling);
    if verdict == Precheck::Live {
        status.edit(Response::Live.as_str(language)).await?;
        return Ok(Outcome::Failed);
    }

    status.edit(&strings::checking_size(&info, language)).await?;

    if let Precheck::TooLarge(size) = verdict {
        status.edit(&strings::too_large(size, ceiling, &info, language)).await?;
        return Ok(Outcome::Failed);
    }

    status.edit(&strings::downloading(&info, language)).await?;

    match ctx.downloader.download(url, job_dir).await {
        Ok(media) => {
            log::info!("Downloaded {} ({} bytes) with preset `{}`", media.path.display(), media.size, media.preset);
            deliver(bot, msg, &status, &info, &media, ceiling, ctx, language).await
        }
        Err(err) => {
            log::error!("Failed to download {url}: {err}");
            status.edit(&strings::failure(err.kind(), &err.detail(), language)).await?;
            Ok(Outcome::Failed)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn deliver(
    bot: &Bot,
    msg: &Message,
    status: &StatusMessage<'_>,
    info: &VideoInfo,
    media: &DownloadedMedia,
    ceiling: u64,
    ctx: &Context,
    language: Language,
) -> ResponseResult<Outcome> {
    status.edit(Response::Uploading.as_str(language)).await?;

    let delivery = match route(media.size, ceiling, UPLOAD_LIMIT) {
        Route::TooLarge => Delivery::TooLarge(media.size),
        Route::Video => send_video(bot, msg, info, media).await,
        Route::Parts => send_parts(bot, msg, status, info, &media.path, ctx.config.limits.chunk_size, language).await?,
    };

    match delivery {
        Delivery::Sent => {
            // The video is already in the chat, a stale status message is not a failure
            let _ = log_error(status.delete().await);
            Ok(Outcome::Delivered)
        }
        Delivery::TooLarge(size) => {
            status.edit(&strings::too_large(size, ceiling, info, language)).await?;
            Ok(Outcome::Failed)
        }
        Delivery::SendFailed(detail) => {
            status.edit(&strings::send_failed(&detail, language)).await?;
            Ok(Outcome::Failed)
        }
    }
}

async fn send_video(bot: &Bot, msg: &Message, info: &VideoInfo, media: &DownloadedMedia) -> Delivery {
    let mut request = bot
        .send_video(msg.chat.id, InputFile::file(&media.path))
        .caption(strings::video_caption(info))
        .supports_streaming(true)
        .reply_to(msg.id);

    if let Some(ref thumbnail) = media.thumbnail {
        request = request.thumbnail(InputFile::file(thumbnail));
    }

    match log_error(request.await) {
        Ok(_) => Delivery::Sent,
        Err(err) => Delivery::SendFailed(err.to_string()),
    }
}

async fn send_parts(
    bot: &Bot,
    msg: &Message,
    status: &StatusMessage<'_>,
    info: &VideoInfo,
    path: &Path,
    chunk_size: u64,
    language: Language,
) -> ResponseResult<Delivery> {
    let parts = match log_error(split_file(path, chunk_size).await) {
        Ok(parts) => parts,
        Err(err) => return Ok(Delivery::SendFailed(err.to_string())),
    };

    status.edit(&strings::sending_parts(parts.len(), language)).await?;

    let file_name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let count = parts.len();

    for (index, part) in parts.iter().enumerate() {
        let caption = strings::part_caption(info, &file_name, index + 1, count, language);
        let sent = bot
            .send_document(msg.chat.id, InputFile::file(part))
            .caption(caption)
            .reply_to(msg.id)
            .await;

        if let Err(err) = log_error(sent) {
            return Ok(Delivery::SendFailed(err.to_string()));
        }

        // Parts can be large, no reason to keep the sent ones around
        let _ = log_error(tokio::fs::remove_file(part).await);
    }

    Ok(Delivery::Sent)
}
