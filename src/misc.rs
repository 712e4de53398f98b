use std::fmt::Debug;

/// Telegram rejects messages longer than this many characters.
pub const MESSAGE_LIMIT: usize = 4096;

/// Media captions have a much lower limit than messages.
pub const CAPTION_LIMIT: usize = 1024;

const MEGABYTE: u64 = 1024 * 1024;

pub fn log_error<T, E>(x: Result<T, E>) -> Result<T, E>
where
    E: Debug,
{
    if let Err(ref err) = x {
        log::error!("{err:?}");
    }

    x
}

/// Cuts `text` down to what a single Telegram message can hold.
pub fn fit_message(text: &str) -> String {
    fit_within(text, MESSAGE_LIMIT)
}

pub fn fit_caption(text: &str) -> String {
    fit_within(text, CAPTION_LIMIT)
}

fn fit_within(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }

    let mut fitted: String = text.chars().take(limit - 1).collect();
    fitted.push('…');
    fitted
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }

    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

pub const fn megabytes(mb: u64) -> u64 {
    mb * MEGABYTE
}

pub const fn checked_megabytes(mb: u64) -> Option<u64> {
    mb.checked_mul(MEGABYTE)
}

#[allow(clippy::cast_precision_loss)]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / MEGABYTE as f64)
}

/// `m:ss` below an hour, `h:mm:ss` above.
pub fn format_duration(seconds: u64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// yt-dlp reports dates as `YYYYMMDD`.
pub fn format_upload_date(date: &str) -> Option<String> {
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(format!("{}.{}.{}", &date[6..8], &date[4..6], &date[0..4]))
}
