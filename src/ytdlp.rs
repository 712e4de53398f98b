use crate::config::YtdlpConfig;
use crate::errors::ExtractError;
use crate::misc::log_error;
use serde_derive::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep, timeout};
use url::Url;
use yt_dlp::Youtube;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "mov"];
const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// A fixed set of extra yt-dlp flags, tried in order until one works.
#[derive(Debug)]
pub struct Preset {
    pub name: &'static str,
    pub args: &'static [&'static str],
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "default",
        args: &[],
    },
    Preset {
        name: "android",
        args: &["--extractor-args", "youtube:player_client=android"],
    },
    Preset {
        name: "web-geo-bypass",
        args: &["--extractor-args", "youtube:player_client=web", "--geo-bypass"],
    },
    Preset {
        name: "ipv4-compat",
        args: &["--force-ipv4", "--user-agent", DESKTOP_USER_AGENT],
    },
];

#[derive(Deserialize, Debug, Clone, Default)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub upload_date: Option<String>,
    pub live_status: Option<String>,
    pub is_live: Option<bool>,
    pub age_limit: Option<u32>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<f64>,
    pub extractor_key: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,

    // Which preset produced this info
    #[serde(skip)]
    pub preset: Option<&'static str>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FormatInfo {
    pub height: Option<u32>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<f64>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn size_of(exact: Option<u64>, approx: Option<f64>) -> Option<u64> {
    exact
        .or_else(|| approx.filter(|size| *size > 0.0).map(|size| size as u64))
        .filter(|size| *size > 0)
}

impl VideoInfo {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn uploader(&self) -> Option<&str> {
        self.uploader.as_deref().or(self.channel.as_deref()).filter(|u| !u.is_empty())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_secs(&self) -> Option<u64> {
        self.duration.filter(|d| *d > 0.0).map(|d| d.round() as u64)
    }

    pub fn is_live(&self) -> bool {
        self.is_live == Some(true) || matches!(self.live_status.as_deref(), Some("is_live" | "is_upcoming"))
    }

    /// Size of the format yt-dlp selected, otherwise the largest known one up to 720p.
    pub fn estimated_size(&self) -> Option<u64> {
        size_of(self.filesize, self.filesize_approx).or_else(|| {
            self.formats
                .iter()
                .filter(|f| f.height.is_some_and(|h| h <= 720))
                .filter_map(|f| size_of(f.filesize, f.filesize_approx))
                .max()
        })
    }
}

#[derive(Debug)]
pub struct DownloadedMedia {
    pub path: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub size: u64,
    pub preset: &'static str,
}

pub struct Downloader {
    program: PathBuf,
    leading_args: Vec<String>,
    ffmpeg_dir: Option<PathBuf>,
    installer: Option<Mutex<Youtube>>,
    settings: YtdlpConfig,
    version: RwLock<String>,
    downloads: TempDir,
}

impl Downloader {
    /// Installs yt-dlp and ffmpeg into `workdir`, unless a command is configured.
    pub async fn new(settings: YtdlpConfig, workdir: &Path) -> Result<Self, ExtractError> {
        tokio::fs::create_dir_all(workdir).await?;

        if let Some(command) = settings.command.clone() {
            return Self::with_command(command, settings, workdir).await;
        }

        let mut inner = Youtube::with_new_binaries(workdir, workdir)
            .await
            .map_err(|err| std::io::Error::other(format!("failed to install yt-dlp: {err:?}")))?;
        inner.with_timeout(Duration::from_secs(10 * 60));

        let _ = log_error(inner.update_downloader().await);

        let mut downloader = Self::with_command(vec![binary_path(workdir).display().to_string()], settings, workdir).await?;
        downloader.ffmpeg_dir = Some(workdir.to_path_buf());
        downloader.installer = Some(Mutex::new(inner));

        Ok(downloader)
    }

    /// Runs an already installed yt-dlp, `command` is the program followed by its leading arguments.
    pub async fn with_command(command: Vec<String>, settings: YtdlpConfig, workdir: &Path) -> Result<Self, ExtractError> {
        let mut command = command.into_iter();
        let program = command
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty yt-dlp command"))?;

        tokio::fs::create_dir_all(workdir).await?;
        let downloads = tempfile::Builder::new().prefix("downloads-").tempdir_in(workdir)?;

        let downloader = Self {
            program,
            leading_args: command.collect(),
            ffmpeg_dir: None,
            installer: None,
            settings,
            version: RwLock::new(String::new()),
            downloads,
        };
        downloader.refresh_version().await;

        Ok(downloader)
    }

    pub async fn version(&self) -> String {
        self.version.read().await.clone()
    }

    async fn refresh_version(&self) {
        if let Ok(output) = log_error(self.run(vec!["--version".to_owned()]).await) {
            *self.version.write().await = output.trim().to_owned();
        }
    }

    /// Directory for one request's files, removed by the caller once the files are sent.
    pub fn job_dir(&self, name: &str) -> PathBuf {
        self.downloads.path().join(name)
    }

    pub async fn fetch_info(&self, url: &Url) -> Result<VideoInfo, ExtractError> {
        self.with_presets(|preset| self.fetch_with(url, preset, false)).await
    }

    /// Shallow extraction, only what the page itself exposes.
    pub async fn fetch_flat_info(&self, url: &Url) -> Result<VideoInfo, ExtractError> {
        self.with_presets(|preset| self.fetch_with(url, preset, true)).await
    }

    pub async fn download(&self, url: &Url, job_dir: &Path) -> Result<DownloadedMedia, ExtractError> {
        tokio::fs::create_dir_all(job_dir).await?;
        self.with_presets(|preset| self.download_with(url, job_dir, preset)).await
    }

    async fn with_presets<T, F, Fut>(&self, mut attempt: F) -> Result<T, ExtractError>
    where
        F: FnMut(&'static Preset) -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let mut last_error = None;

        for preset in PRESETS {
            match attempt(preset).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let kind = err.kind();
                    log::warn!("yt-dlp preset `{}` failed ({kind:?}): {}", preset.name, err.detail());

                    last_error = Some(err);
                    if !kind.is_retryable() {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ExtractError::Exhausted))
    }

    async fn fetch_with(&self, url: &Url, preset: &'static Preset, flat: bool) -> Result<VideoInfo, ExtractError> {
        let mut args = self.common_args(preset);
        args.extend(["--dump-single-json", "--skip-download"].map(str::to_owned));
        if flat {
            args.push("--flat-playlist".to_owned());
        } else {
            args.extend(["--format".to_owned(), self.settings.format.clone()]);
        }
        args.push(url.to_string());

        let output = self.run(args).await?;
        let mut info: VideoInfo = serde_json::from_str(output.trim())?;
        info.preset = Some(preset.name);

        Ok(info)
    }

    async fn download_with(&self, url: &Url, job_dir: &Path, preset: &'static Preset) -> Result<DownloadedMedia, ExtractError> {
        let mut args = self.common_args(preset);
        args.extend([
            "--format".to_owned(),
            self.settings.format.clone(),
            "--merge-output-format".to_owned(),
            "mp4".to_owned(),
            "--write-thumbnail".to_owned(),
            "--convert-thumbnails".to_owned(),
            "jpg".to_owned(),
            "--print".to_owned(),
            "after_move:filepath".to_owned(),
            "--output".to_owned(),
            job_dir.join("%(id)s.%(ext)s").display().to_string(),
        ]);
        args.push(url.to_string());

        let output = self.run(args).await?;

        let printed = output
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.is_file());

        let path = match printed {
            Some(path) => path,
            None => find_with_extension(job_dir, VIDEO_EXTENSIONS, None)
                .await?
                .ok_or(ExtractError::MissingOutput)?,
        };

        let thumbnail = find_with_extension(job_dir, THUMBNAIL_EXTENSIONS, Some(&path)).await?;
        let size = tokio::fs::metadata(&path).await?.len();

        Ok(DownloadedMedia {
            path,
            thumbnail,
            size,
            preset: preset.name,
        })
    }

    fn common_args(&self, preset: &Preset) -> Vec<String> {
        let mut args: Vec<String> = ["--no-playlist", "--no-warnings", "--no-progress"]
            .map(str::to_owned)
            .to_vec();

        if let Some(ref dir) = self.ffmpeg_dir {
            args.extend(["--ffmpeg-location".to_owned(), dir.display().to_string()]);
        }
        if let Some(ref cookies) = self.settings.cookies {
            args.extend(["--cookies".to_owned(), cookies.display().to_string()]);
        }

        args.extend(preset.args.iter().map(|arg| (*arg).to_owned()));
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<String, ExtractError> {
        log::debug!("running {} {}", self.program.display(), args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let limit = self.settings.timeout;
        let output = timeout(limit, command.output())
            .await
            .map_err(|_| ExtractError::Timeout(limit))??;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn update(&self) {
        let Some(ref installer) = self.installer else { return };

        if log_error(installer.lock().await.update_downloader().await).is_ok() {
            self.refresh_version().await;
        }
    }
}

fn binary_path(workdir: &Path) -> PathBuf {
    if cfg!(windows) {
        workdir.join("yt-dlp.exe")
    } else {
        workdir.join("yt-dlp")
    }
}

async fn find_with_extension(dir: &Path, extensions: &[&str], except: Option<&Path>) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if Some(path.as_path()) == except {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()));

        if matches {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

pub async fn update_ytdlp(downloader: Arc<Downloader>) {
    loop {
        sleep(Duration::from_secs(60 * 60)).await;
        downloader.update().await;
    }
}
