use crate::config::Config;
use crate::premium::PremiumUsers;
use crate::server::Mode;
use crate::stats::Stats;
use crate::ytdlp::Downloader;
use std::sync::Arc;
use teloxide::types::UserId;

/// Everything the handlers share, injected into the dispatcher as one dependency.
pub struct Context {
    pub config: Config,
    pub downloader: Arc<Downloader>,
    pub premium: PremiumUsers,
    pub stats: Arc<Stats>,
    pub mode: Mode,
}

impl Context {
    pub fn new(config: Config, downloader: Arc<Downloader>) -> Self {
        let mode = if config.webhook_url().is_some() { Mode::Webhook } else { Mode::Polling };

        Self {
            config,
            downloader,
            premium: PremiumUsers::default(),
            stats: Arc::new(Stats::default()),
            mode,
        }
    }

    pub async fn is_premium(&self, user_id: Option<UserId>) -> bool {
        match user_id {
            Some(user_id) => self.premium.contains(user_id).await,
            None => false,
        }
    }

    /// Largest file this user may receive.
    pub async fn ceiling_for(&self, user_id: Option<UserId>) -> u64 {
        self.config.limits.ceiling(self.is_premium(user_id).await)
    }
}
