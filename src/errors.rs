use std::time::Duration;
use thiserror::Error;

/// What went wrong from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    AgeRestricted,
    Live,
    GeoBlocked,
    Unavailable,
    Generic,
}

impl FailureKind {
    /// Another preset will not help with these.
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::RateLimited | Self::Live)
    }
}

const RATE_LIMITED: &[&str] = &["http error 429", "too many requests", "rate-limit", "rate limit"];

const LIVE: &[&str] = &[
    "is live",
    "live event",
    "live stream",
    "premieres in",
    "this live",
    "is_live",
];

const AGE_RESTRICTED: &[&str] = &[
    "age-gated",
    "age gated",
    "age-restricted",
    "age restricted",
    "confirm your age",
    "inappropriate for some users",
];

const GEO_BLOCKED: &[&str] = &[
    "your country",
    "in your region",
    "geo restriction",
    "geo-restricted",
    "geo restricted",
    "not available in your location",
    "region",
];

const UNAVAILABLE: &[&str] = &[
    "private video",
    "video is private",
    "video unavailable",
    "is not available",
    "has been removed",
    "does not exist",
    "http error 404",
    "unsupported url",
    "account has been terminated",
];

/// Maps yt-dlp's stderr onto one of the reply templates.
pub fn classify(stderr: &str) -> FailureKind {
    let stderr = stderr.to_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|needle| stderr.contains(needle));

    if matches(RATE_LIMITED) {
        FailureKind::RateLimited
    } else if matches(AGE_RESTRICTED) {
        FailureKind::AgeRestricted
    } else if matches(LIVE) {
        FailureKind::Live
    } else if matches(GEO_BLOCKED) {
        FailureKind::GeoBlocked
    } else if matches(UNAVAILABLE) {
        FailureKind::Unavailable
    } else {
        FailureKind::Generic
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("yt-dlp exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("yt-dlp did not finish within {0:?}")]
    Timeout(Duration),

    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("unexpected yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("yt-dlp did not produce a media file")]
    MissingOutput,

    #[error("no extraction preset could be tried")]
    Exhausted,
}

impl ExtractError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Failed { stderr, .. } => classify(stderr),
            _ => FailureKind::Generic,
        }
    }

    /// The most informative single line to show to a user.
    pub fn detail(&self) -> String {
        match self {
            Self::Failed { stderr, .. } => stderr
                .lines()
                .rev()
                .find(|line| line.starts_with("ERROR"))
                .or_else(|| stderr.lines().rev().find(|line| !line.trim().is_empty()))
                .unwrap_or("unknown error")
                .trim_start_matches("ERROR: ")
                .to_owned(),
            other => other.to_string(),
        }
    }
}
