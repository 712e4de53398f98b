use std::fmt::Display;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    Vk,
    TikTok,
    Instagram,
    Twitter,
}

const DOMAINS: &[(&str, Platform)] = &[
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("vk.com", Platform::Vk),
    ("vk.ru", Platform::Vk),
    ("vkvideo.ru", Platform::Vk),
    ("tiktok.com", Platform::TikTok),
    ("instagram.com", Platform::Instagram),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
];

// Query parameters that only track where a link was shared from
const TRACKING_PARAMS: &[&str] = &["si", "feature", "fbclid", "igshid", "igsh", "s", "t_source"];

impl Platform {
    pub const ALL: [Self; 5] = [Self::YouTube, Self::Vk, Self::TikTok, Self::Instagram, Self::Twitter];

    pub fn detect(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();

        DOMAINS
            .iter()
            .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
            .map(|(_, platform)| *platform)
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::YouTube => "YouTube",
            Self::Vk => "VK",
            Self::TikTok => "TikTok",
            Self::Instagram => "Instagram",
            Self::Twitter => "Twitter/X",
        };
        f.write_str(name)
    }
}

/// Every link we hand to yt-dlp goes through here, already stripped of tracking noise.
fn parse_web_url(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| clean_url(&url))
}

/// First link in `text` that points to a supported platform.
pub fn find_supported_url(text: &str) -> Option<Url> {
    text.split_whitespace()
        .filter_map(parse_web_url)
        .find(|url| Platform::detect(url).is_some())
}

/// Commands take any web link, yt-dlp knows far more sites than we advertise.
pub fn parse_command_url(argument: &str) -> Option<Url> {
    argument.split_whitespace().next().and_then(parse_web_url)
}

pub fn clean_url(url: &Url) -> Url {
    let mut cleaned = url.clone();
    cleaned.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()) && !key.starts_with("utm_"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn detects_platforms_and_subdomains() {
        assert_eq!(Platform::detect(&url("https://www.youtube.com/watch?v=dQw4w9WgXcQ")), Some(Platform::YouTube));
        assert_eq!(Platform::detect(&url("https://youtu.be/dQw4w9WgXcQ")), Some(Platform::YouTube));
        assert_eq!(Platform::detect(&url("https://m.vk.com/video-1_2")), Some(Platform::Vk));
        assert_eq!(Platform::detect(&url("https://vm.tiktok.com/ZMabc/")), Some(Platform::TikTok));
        assert_eq!(Platform::detect(&url("https://x.com/user/status/1")), Some(Platform::Twitter));
        assert_eq!(Platform::detect(&url("https://example.com/video")), None);
    }

    #[test]
    fn lookalike_hosts_are_not_supported() {
        assert_eq!(Platform::detect(&url("https://notyoutube.com/watch")), None);
        assert_eq!(Platform::detect(&url("https://box.com/")), None);
    }

    #[test]
    fn finds_link_inside_text() {
        let found = find_supported_url("look at this https://youtu.be/abc please");
        assert_eq!(found, Some(url("https://youtu.be/abc")));
        assert_eq!(find_supported_url("no links here"), None);
        assert_eq!(find_supported_url("https://example.com/clip"), None);
    }

    #[test]
    fn command_urls_accept_any_web_link() {
        assert_eq!(parse_command_url(" https://example.com/clip extra"), Some(url("https://example.com/clip")));
        assert_eq!(parse_command_url("ftp://example.com/clip"), None);
        assert_eq!(parse_command_url(""), None);
    }

    #[test]
    fn extracted_links_are_cleaned() {
        assert_eq!(
            find_supported_url("watch https://youtu.be/abc?si=track&utm_medium=share now"),
            Some(url("https://youtu.be/abc"))
        );
        assert_eq!(
            parse_command_url("https://vk.com/video1_2?utm_source=tg#comments"),
            Some(url("https://vk.com/video1_2"))
        );
    }

    #[test]
    fn cleaning_keeps_meaningful_params() {
        let cleaned = clean_url(&url("https://www.youtube.com/watch?v=abc&si=track&utm_source=tg#t=10"));
        assert_eq!(cleaned.as_str(), "https://www.youtube.com/watch?v=abc");

        let cleaned = clean_url(&url("https://youtu.be/abc?si=track"));
        assert_eq!(cleaned.as_str(), "https://youtu.be/abc");
    }
}
