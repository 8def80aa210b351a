//!
//! src/notify.rs  Oct 18th, 2026
//!
//! Posts match announcements to the Telegram bot API. Sends are rare,
//! so every call opens its own connection instead of sharing the scan pool.
//!

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{HttpConfig, TelegramConfig};
use crate::errors::ScoutError;
use crate::fetch::one_shot_client;
use crate::scanner::Notify;
use crate::types::NotificationPayload;

#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    cfg: TelegramConfig,
    http: HttpConfig,
}

impl TelegramNotifier {
    pub fn new(http: &HttpConfig, cfg: &TelegramConfig) -> Self {
        Self { cfg: cfg.clone(), http: http.clone() }
    }

    /// POST {base}/bot{token}/sendMessage. The `./` keeps the token colon
    /// from being read as a url scheme.
    fn send_url(&self) -> Result<Url, ScoutError> {
        self.cfg.base_url.join(&format!("./bot{}/sendMessage", self.cfg.api_token))
            .map_err(|e| ScoutError::Config(format!("telegram url: {e}")))
    }

    pub async fn try_send(&self, payload: &NotificationPayload) -> Result<(), ScoutError> {
        let client = one_shot_client(&self.http)?;
        let response = client.post(self.send_url()?)
            .json(payload)
            .send()
            .await
            // the url embeds the bot token
            .map_err(|e| ScoutError::Http(e.without_url().to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ScoutError::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn send(&self, payload: &NotificationPayload) -> bool {
        match self.try_send(payload).await {
            Ok(()) => {
                info!(chat_id = %payload.chat_id, "notify.send");
                true
            }
            Err(ScoutError::Status(code)) => {
                warn!(chat_id = %payload.chat_id, status = code, "notify.send");
                false
            }
            Err(e) => {
                error!(chat_id = %payload.chat_id, error = %e, "notify.send.failed");
                false
            }
        }
    }
}
