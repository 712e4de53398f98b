use crate::config::Limits;
use crate::errors::FailureKind;
use crate::misc::{CAPTION_LIMIT, fit_caption, format_duration, format_megabytes, format_upload_date, truncate_chars};
use crate::platform::Platform;
use crate::stats::Snapshot;
use crate::ytdlp::VideoInfo;
use std::fmt::Write;
use teloxide::types::User;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Russian,
}

// From IETF language tag
impl From<Option<String>> for Language {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().and_then(|tag| tag.split(['-', '_']).next()) {
            Some("en") => Self::English,
            Some("ru") => Self::Russian,
            _ => Self::default(),
        }
    }
}

impl From<Option<&User>> for Language {
    fn from(value: Option<&User>) -> Self {
        value.map_or_else(Self::default, |user| user.language_code.clone().into())
    }
}

pub enum Response {
    Pong,
    NoSupportedLink,
    Processing,
    Downloading,
    Uploading,
    RateLimited,
    AgeRestricted,
    Live,
    GeoBlocked,
    Unavailable,
    PremiumDisabled,
    NoUser,
}

impl Response {
    pub const fn as_str(&self, language: Language) -> &str {
        match (self, language) {
            (Self::Pong, Language::English) => "🟢 The bot is up!\n\n📡 Server: online\n⚡ Status: ready",
            (Self::Pong, Language::Russian) => "🟢 Бот работает!\n\n📡 Сервер: онлайн\n⚡ Статус: готов к работе",

            (Self::NoSupportedLink, Language::English) => "🤔 I don't see a supported video link",
            (Self::NoSupportedLink, Language::Russian) => "🤔 Не вижу поддерживаемой ссылки на видео",

            (Self::Processing, Language::English) => "🔄 Processing...",
            (Self::Processing, Language::Russian) => "🔄 Обрабатываю...",

            (Self::Downloading, Language::English) => "⬇️ Downloading...",
            (Self::Downloading, Language::Russian) => "⬇️ Скачиваю...",

            (Self::Uploading, Language::English) => "📤 Sending...",
            (Self::Uploading, Language::Russian) => "📤 Отправляю...",

            (Self::RateLimited, Language::English) => "⏳ The platform is rate limiting me right now, try again in a few minutes",
            (Self::RateLimited, Language::Russian) => "⏳ Платформа временно ограничила запросы, попробуйте через несколько минут",

            (Self::AgeRestricted, Language::English) => "🔞 The video is age restricted",
            (Self::AgeRestricted, Language::Russian) => "🔞 Видео имеет возрастные ограничения",

            (Self::Live, Language::English) => "📡 Live streams and premieres can't be downloaded until they end",
            (Self::Live, Language::Russian) => "📡 Прямые трансляции и премьеры нельзя скачать до их окончания",

            (Self::GeoBlocked, Language::English) => "🌍 The video is not available in the server's region",
            (Self::GeoBlocked, Language::Russian) => "🌍 Видео недоступно в регионе сервера",

            (Self::Unavailable, Language::English) => "❌ The video is private, removed or unavailable",
            (Self::Unavailable, Language::Russian) => "❌ Видео приватное, удалено или недоступно",

            (Self::PremiumDisabled, Language::English) => "💤 Premium mode is off, regular limits apply again",
            (Self::PremiumDisabled, Language::Russian) => "💤 Премиум-режим выключен, снова действуют обычные ограничения",

            (Self::NoUser, Language::English) => "❌ This command only works for messages sent by a user",
            (Self::NoUser, Language::Russian) => "❌ Эта команда работает только для сообщений от пользователя",
        }
    }
}

fn mb(bytes: u64) -> String {
    format_megabytes(bytes)
}

fn platform_list() -> String {
    Platform::ALL.map(|p| format!("• {p}")).join("\n")
}

pub fn welcome(language: Language, limits: &Limits) -> String {
    match language {
        Language::English => format!(
            "🎬 Hi! I download videos for you.\n\n\
             🌟 Features:\n\
             • YouTube, VK, TikTok, Instagram, Twitter/X\n\
             • Files up to {} MB\n\n\
             📱 Commands:\n\
             /help - help\n\
             /download <link> - download a video\n\
             /ping - check that I'm alive\n\n\
             🚀 Just send me a video link!",
            mb(limits.max_file_size)
        ),
        Language::Russian => format!(
            "🎬 Привет! Я бот для скачивания видео.\n\n\
             🌟 Возможности:\n\
             • YouTube, VK, TikTok, Instagram, Twitter/X\n\
             • Файлы до {} МБ\n\n\
             📱 Команды:\n\
             /help - справка\n\
             /download <ссылка> - скачать видео\n\
             /ping - проверка работы\n\n\
             🚀 Просто отправь ссылку на видео!",
            mb(limits.max_file_size)
        ),
    }
}

pub fn help(language: Language, limits: &Limits) -> String {
    match language {
        Language::English => format!(
            "🆘 Help\n\n\
             📝 Commands:\n\
             • /start - start\n\
             • /help - this help\n\
             • /download <link> - download a video\n\
             • /info <link> - video details\n\
             • /check <link> - diagnose a link\n\
             • /status - bot status\n\
             • /premium - toggle premium mode\n\
             • /ping - check that I'm alive\n\n\
             🔗 Supported platforms:\n{}\n\n\
             💡 Examples:\n\
             • Just send: https://youtu.be/dQw4w9WgXcQ\n\
             • Command: /download https://youtu.be/dQw4w9WgXcQ\n\n\
             ⚠️ Limits:\n\
             • Maximum: {} MB ({} MB in premium mode)\n\
             • Quality: up to 720p",
            platform_list(),
            mb(limits.max_file_size),
            mb(limits.premium_file_size)
        ),
        Language::Russian => format!(
            "🆘 Справка по командам\n\n\
             📝 Команды:\n\
             • /start - начать работу\n\
             • /help - эта справка\n\
             • /download <ссылка> - скачать видео\n\
             • /info <ссылка> - информация о видео\n\
             • /check <ссылка> - диагностика ссылки\n\
             • /status - состояние бота\n\
             • /premium - переключить премиум-режим\n\
             • /ping - проверка работы\n\n\
             🔗 Поддерживаемые платформы:\n{}\n\n\
             💡 Примеры:\n\
             • Просто отправь: https://youtu.be/dQw4w9WgXcQ\n\
             • Команда: /download https://youtu.be/dQw4w9WgXcQ\n\n\
             ⚠️ Ограничения:\n\
             • Максимум: {} МБ ({} МБ в премиум-режиме)\n\
             • Качество: до 720p",
            platform_list(),
            mb(limits.max_file_size),
            mb(limits.premium_file_size)
        ),
    }
}

pub fn usage(language: Language, command: &str) -> String {
    match language {
        Language::English => format!("❌ Give me a link!\nExample: /{command} https://youtu.be/dQw4w9WgXcQ"),
        Language::Russian => format!("❌ Укажите ссылку!\nПример: /{command} https://youtu.be/dQw4w9WgXcQ"),
    }
}

fn unknown(language: Language) -> &'static str {
    match language {
        Language::English => "unknown",
        Language::Russian => "неизвестно",
    }
}

fn duration_of(info: &VideoInfo, language: Language) -> String {
    info.duration_secs().map_or_else(|| unknown(language).to_owned(), format_duration)
}

pub fn summary(info: &VideoInfo, language: Language) -> String {
    let title = info.title().unwrap_or(unknown(language));
    let uploader = info.uploader().unwrap_or(unknown(language));
    let duration = duration_of(info, language);

    match language {
        Language::English => format!("📹 {title}\n📺 Channel: {uploader}\n⏱️ Duration: {duration}"),
        Language::Russian => format!("📹 {title}\n📺 Канал: {uploader}\n⏱️ Длительность: {duration}"),
    }
}

pub fn checking_size(info: &VideoInfo, language: Language) -> String {
    let tail = match language {
        Language::English => "🔄 Checking the size...",
        Language::Russian => "🔄 Проверяю размер...",
    };
    format!("{}\n\n{tail}", summary(info, language))
}

pub fn downloading(info: &VideoInfo, language: Language) -> String {
    format!("{}\n\n{}", Response::Downloading.as_str(language), summary(info, language))
}

pub fn too_large(size: u64, ceiling: u64, info: &VideoInfo, language: Language) -> String {
    match language {
        Language::English => format!(
            "❌ The file is too large ({} MB)\nMaximum: {} MB\n\n{}",
            mb(size),
            mb(ceiling),
            summary(info, language)
        ),
        Language::Russian => format!(
            "❌ Файл слишком большой ({} МБ)\nМаксимум: {} МБ\n\n{}",
            mb(size),
            mb(ceiling),
            summary(info, language)
        ),
    }
}

pub fn failure(kind: FailureKind, detail: &str, language: Language) -> String {
    let text = match kind {
        FailureKind::RateLimited => Response::RateLimited,
        FailureKind::AgeRestricted => Response::AgeRestricted,
        FailureKind::Live => Response::Live,
        FailureKind::GeoBlocked => Response::GeoBlocked,
        FailureKind::Unavailable => Response::Unavailable,
        FailureKind::Generic => {
            let detail = truncate_chars(detail, 100);
            return match language {
                Language::English => format!("❌ Error: {detail}"),
                Language::Russian => format!("❌ Ошибка: {detail}"),
            };
        }
    };

    text.as_str(language).to_owned()
}

pub fn send_failed(detail: &str, language: Language) -> String {
    let detail = truncate_chars(detail, 200);
    match language {
        Language::English => format!("❌ Failed to send the file: {detail}"),
        Language::Russian => format!("❌ Ошибка отправки: {detail}"),
    }
}

/// Post texts often end up as titles, so the title gets whatever room the rest leaves.
fn caption_with_title(info: &VideoInfo, build: impl Fn(&str) -> String) -> String {
    let title = info.title().unwrap_or("video");
    let budget = CAPTION_LIMIT.saturating_sub(build("").chars().count() + 3);
    fit_caption(&build(&truncate_chars(title, budget)))
}

pub fn video_caption(info: &VideoInfo) -> String {
    caption_with_title(info, |title| format!("🎬 {title}"))
}

pub fn sending_parts(count: usize, language: Language) -> String {
    match language {
        Language::English => format!("📤 The file is larger than Telegram allows, sending it in {count} parts..."),
        Language::Russian => format!("📤 Файл больше лимита Telegram, отправляю в {count} частях..."),
    }
}

pub fn part_caption(info: &VideoInfo, file_name: &str, index: usize, count: usize, language: Language) -> String {
    caption_with_title(info, |title| match language {
        Language::English => format!("🎬 {title} (part {index}/{count})\nJoin with: cat {file_name}.* > {file_name}"),
        Language::Russian => format!("🎬 {title} (часть {index}/{count})\nСклеить: cat {file_name}.* > {file_name}"),
    })
}

pub fn premium_enabled(limits: &Limits, language: Language) -> String {
    match language {
        Language::English => format!(
            "⭐ Premium mode is on!\nMaximum file size: {} MB\nFiles over 50 MB are sent in {} MB parts",
            mb(limits.premium_file_size),
            mb(limits.chunk_size)
        ),
        Language::Russian => format!(
            "⭐ Премиум-режим включён!\nМаксимальный размер файла: {} МБ\nФайлы больше 50 МБ отправляются частями по {} МБ",
            mb(limits.premium_file_size),
            mb(limits.chunk_size)
        ),
    }
}

pub struct StatusReport<'a> {
    pub snapshot: Snapshot,
    pub mode: &'a str,
    pub premium_users: usize,
    pub is_premium: bool,
    pub ceiling: u64,
    pub ytdlp_version: &'a str,
}

pub fn status(report: &StatusReport<'_>, language: Language) -> String {
    let uptime = format_duration(report.snapshot.uptime_secs);
    let version = if report.ytdlp_version.is_empty() {
        unknown(language)
    } else {
        report.ytdlp_version
    };

    match language {
        Language::English => format!(
            "📊 Status\n\n\
             ⏱️ Uptime: {uptime}\n\
             📡 Mode: {}\n\
             📥 Requests: {}\n\
             ✅ Delivered: {}\n\
             ❌ Failed: {}\n\
             ⭐ Premium users: {}\n\n\
             👤 Your mode: {}\n\
             📦 Your limit: {} MB\n\
             🔧 yt-dlp: {version}",
            report.mode,
            report.snapshot.requests,
            report.snapshot.delivered,
            report.snapshot.failed,
            report.premium_users,
            if report.is_premium { "premium" } else { "regular" },
            mb(report.ceiling)
        ),
        Language::Russian => format!(
            "📊 Состояние\n\n\
             ⏱️ Время работы: {uptime}\n\
             📡 Режим: {}\n\
             📥 Запросов: {}\n\
             ✅ Отправлено: {}\n\
             ❌ Ошибок: {}\n\
             ⭐ Премиум-пользователей: {}\n\n\
             👤 Ваш режим: {}\n\
             📦 Ваш лимит: {} МБ\n\
             🔧 yt-dlp: {version}",
            report.mode,
            report.snapshot.requests,
            report.snapshot.delivered,
            report.snapshot.failed,
            report.premium_users,
            if report.is_premium { "премиум" } else { "обычный" },
            mb(report.ceiling)
        ),
    }
}

pub fn info(info: &VideoInfo, platform: Option<Platform>, ceiling: u64, language: Language) -> String {
    let mut text = summary(info, language);
    let (platform_label, views, likes, date, size, formats) = match language {
        Language::English => ("🌐 Platform", "👁️ Views", "👍 Likes", "📅 Uploaded", "💾 Size", "📊 Formats"),
        Language::Russian => ("🌐 Платформа", "👁️ Просмотры", "👍 Лайки", "📅 Загружено", "💾 Размер", "📊 Форматов"),
    };

    let platform = platform.map(|p| p.to_string()).or_else(|| info.extractor_key.clone());
    if let Some(platform) = platform {
        let _ = write!(text, "\n{platform_label}: {platform}");
    }
    if let Some(count) = info.view_count {
        let _ = write!(text, "\n{views}: {count}");
    }
    if let Some(count) = info.like_count {
        let _ = write!(text, "\n{likes}: {count}");
    }
    if let Some(uploaded) = info.upload_date.as_deref().and_then(format_upload_date) {
        let _ = write!(text, "\n{date}: {uploaded}");
    }

    match (info.estimated_size(), language) {
        (Some(bytes), Language::English) => {
            let verdict = if bytes <= ceiling { "✅ fits" } else { "❌ over your limit" };
            let _ = write!(text, "\n{size}: ~{} MB ({verdict})", mb(bytes));
        }
        (Some(bytes), Language::Russian) => {
            let verdict = if bytes <= ceiling { "✅ подходит" } else { "❌ больше вашего лимита" };
            let _ = write!(text, "\n{size}: ~{} МБ ({verdict})", mb(bytes));
        }
        (None, _) => {
            let _ = write!(text, "\n{size}: {}", unknown(language));
        }
    }

    if info.age_limit.is_some_and(|age| age >= 18) {
        let _ = write!(text, "\n{}", Response::AgeRestricted.as_str(language));
    }
    if !info.formats.is_empty() {
        let _ = write!(text, "\n{formats}: {}", info.formats.len());
    }
    if info.is_live() {
        let _ = write!(text, "\n\n{}", Response::Live.as_str(language));
    }

    text
}

pub fn check_progress(stage: u8, language: Language) -> String {
    match (stage, language) {
        (1, Language::English) => "🔍 Test 1: basic information...".to_owned(),
        (1, Language::Russian) => "🔍 Тест 1: получение информации...".to_owned(),
        (_, Language::English) => "🔍 Test 2: detailed information...".to_owned(),
        (_, Language::Russian) => "🔍 Тест 2: детальная информация...".to_owned(),
    }
}

pub fn check_failed(detail: &str, url: &str, language: Language) -> String {
    let detail = truncate_chars(detail, 200);
    match language {
        Language::English => format!("❌ Test 1 FAILED: could not get basic information\n\nDetails: {detail}\n\n🔗 URL: {url}"),
        Language::Russian => {
            format!("❌ Тест 1 ПРОВАЛЕН: не удалось получить базовую информацию\n\nДетали: {detail}\n\n🔗 URL: {url}")
        }
    }
}

/// `detailed` is the second stage outcome: the info, or the error detail.
pub fn check_report(basic: &VideoInfo, detailed: Result<&VideoInfo, &str>, url: &str, language: Language) -> String {
    let title = truncate_chars(basic.title().unwrap_or(unknown(language)), 50);
    let uploader = truncate_chars(basic.uploader().unwrap_or(unknown(language)), 30);
    let duration = duration_of(basic, language);

    let (heading, formats, preset, problems) = match language {
        Language::English => ("✅ TEST RESULTS", "📊 Formats", "🧩 Preset", "⚠️ Problems"),
        Language::Russian => ("✅ РЕЗУЛЬТАТЫ ТЕСТА", "📊 Форматов", "🧩 Пресет", "⚠️ Проблемы"),
    };

    let mut text = format!("{heading}\n\n📹 {title}\n📺 {uploader}\n⏱️ {duration}\n");

    match detailed {
        Ok(info) => {
            let _ = write!(text, "\n{formats}: {}", info.formats.len());
            if let Some(name) = info.preset {
                let _ = write!(text, "\n{preset}: {name}");
            }
        }
        Err(detail) => {
            let _ = write!(text, "\n{problems}: {}", truncate_chars(detail, 200));
        }
    }

    let _ = write!(text, "\n\n🔗 URL: {url}");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::misc::{MESSAGE_LIMIT, megabytes};
    use pretty_assertions::assert_eq;

    fn limits() -> Limits {
        Limits {
            max_file_size: megabytes(50),
            premium_file_size: megabytes(200),
            chunk_size: megabytes(45),
        }
    }

    fn video() -> VideoInfo {
        VideoInfo {
            id: "abc".to_owned(),
            title: Some("Clip".to_owned()),
            uploader: Some("Author".to_owned()),
            duration: Some(75.0),
            view_count: Some(10),
            upload_date: Some("20240102".to_owned()),
            filesize: Some(megabytes(60)),
            ..Default::default()
        }
    }

    #[test]
    fn language_from_tag() {
        assert_eq!(Language::from(Some("ru".to_owned())), Language::Russian);
        assert_eq!(Language::from(Some("ru-RU".to_owned())), Language::Russian);
        assert_eq!(Language::from(Some("de".to_owned())), Language::English);
        assert_eq!(Language::from(None::<String>), Language::English);
    }

    #[test]
    fn summary_lists_title_channel_duration() {
        assert_eq!(summary(&video(), Language::English), "📹 Clip\n📺 Channel: Author\n⏱️ Duration: 1:15");
        assert_eq!(
            summary(&VideoInfo::default(), Language::Russian),
            "📹 неизвестно\n📺 Канал: неизвестно\n⏱️ Длительность: неизвестно"
        );
    }

    #[test]
    fn failure_templates() {
        assert_eq!(
            failure(FailureKind::AgeRestricted, "ignored", Language::Russian),
            "🔞 Видео имеет возрастные ограничения"
        );
        assert_eq!(failure(FailureKind::Generic, &"x".repeat(150), Language::English), format!("❌ Error: {}...", "x".repeat(100)));
    }

    #[test]
    fn long_titles_are_cut_to_fit_captions() {
        let mut post = video();
        post.title = Some("a".repeat(2000));

        let caption = video_caption(&post);
        assert_eq!(caption.chars().count(), CAPTION_LIMIT);
        assert!(caption.starts_with("🎬 aaa") && caption.ends_with("..."));

        let part = part_caption(&post, "abc.mp4", 2, 3, Language::English);
        assert!(part.chars().count() <= CAPTION_LIMIT);
        assert!(part.ends_with("(part 2/3)\nJoin with: cat abc.mp4.* > abc.mp4"));

        assert_eq!(video_caption(&video()), "🎬 Clip");
    }

    #[test]
    fn too_large_reports_both_sizes() {
        let text = too_large(megabytes(60), megabytes(50), &video(), Language::English);
        assert!(text.starts_with("❌ The file is too large (60.0 MB)\nMaximum: 50.0 MB"));
    }

    #[test]
    fn info_report_flags_oversized_files() {
        let text = info(&video(), Some(Platform::YouTube), megabytes(50), Language::English);
        assert!(text.contains("🌐 Platform: YouTube"));
        assert!(text.contains("📅 Uploaded: 02.01.2024"));
        assert!(text.contains("~60.0 MB (❌ over your limit)"));

        let text = info(&video(), None, megabytes(200), Language::English);
        assert!(text.contains("(✅ fits)"));
    }

    #[test]
    fn check_report_shows_problems() {
        let text = check_report(&video(), Err("Sign in to confirm your age"), "https://youtu.be/abc", Language::English);
        assert!(text.contains("⚠️ Problems: Sign in to confirm your age"));
        assert!(text.ends_with("🔗 URL: https://youtu.be/abc"));

        let mut detailed = video();
        detailed.preset = Some("android");
        let text = check_report(&video(), Ok(&detailed), "https://youtu.be/abc", Language::Russian);
        assert!(text.contains("🧩 Пресет: android"));
    }

    #[test]
    fn static_texts_fit_in_a_message() {
        for language in [Language::English, Language::Russian] {
            for text in [welcome(language, &limits()), help(language, &limits()), premium_enabled(&limits(), language)] {
                assert!(!text.is_empty());
                assert!(text.chars().count() < MESSAGE_LIMIT);
            }
        }
    }
}
