//! Opening the authorization popup and watching it.

use crate::config::PopupConfig;
use crate::error::{PopupError, PopupResult};
use crate::request::AuthorizationRequest;
use crate::window::{PopupHandle, PopupLauncher};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Opens the provider's authorize page in a popup.
pub struct PopupFlowController {
    config: PopupConfig,
    launcher: Arc<dyn PopupLauncher>,
}

impl PopupFlowController {
    pub fn new(config: PopupConfig, launcher: Arc<dyn PopupLauncher>) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &PopupConfig {
        &self.config
    }

    /// A fresh authorization request with a new random state.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        AuthorizationRequest::new(&self.config)
    }

    /// Open the popup and start watching for it to be closed.
    ///
    /// Must be called from within a tokio runtime. If the user closes the
    /// popup before [`PopupFlow::finish`] is called, the flow is cancelled.
    pub fn start_flow(&self) -> PopupResult<PopupFlow> {
        self.config.validate()?;

        let request = self.authorization_request();
        let url = request.to_url(&self.config.authorize_endpoint()?);

        let popup = self
            .launcher
            .open(&url, &self.config.popup_name, &self.config.popup_features)
            .ok_or(PopupError::PopupBlocked)?;

        info!("Opened authorization popup");
        let flow = PopupFlow::new(request.state, url);
        tokio::spawn(watch_popup(
            popup,
            flow.clone(),
            self.config.poll_interval,
        ));
        Ok(flow)
    }
}

async fn watch_popup(popup: Arc<dyn PopupHandle>, flow: PopupFlow, every: Duration) {
    let mut ticker = interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = flow.finished.cancelled() => return,
            _ = ticker.tick() => {
                if popup.is_closed() {
                    if !flow.is_finished() {
                        debug!("Popup closed before completing the flow");
                        flow.cancelled.cancel();
                    }
                    return;
                }
            }
        }
    }
}

/// One in-flight popup flow.
#[derive(Debug, Clone)]
pub struct PopupFlow {
    state: String,
    authorize_url: Url,
    cancelled: CancellationToken,
    finished: CancellationToken,
}

impl PopupFlow {
    fn new(state: String, authorize_url: Url) -> Self {
        Self {
            state,
            authorize_url,
            cancelled: CancellationToken::new(),
            finished: CancellationToken::new(),
        }
    }

    /// The `state` value sent in the authorize URL.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    /// Token cancelled when the popup closes before the flow finishes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancelled.clone()
    }

    pub async fn cancelled(&self) {
        self.cancelled.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// Mark the flow as completed; the popup watcher stops.
    pub fn finish(&self) {
        self.finished.cancel();
    }

    pub async fn finished(&self) {
        self.finished.cancelled().await
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::InMemoryPopupLauncher;

    fn controller(launcher: Arc<InMemoryPopupLauncher>) -> PopupFlowController {
        PopupFlowController::new(
            PopupConfig::new("client-123").with_poll_interval(Duration::from_millis(500)),
            launcher,
        )
    }

    #[tokio::test]
    async fn test_start_flow_opens_authorize_url() {
        let launcher = Arc::new(InMemoryPopupLauncher::new());
        let flow = controller(launcher.clone()).start_flow().unwrap();

        let popup = launcher.last_opened().unwrap();
        assert_eq!(popup.url(), flow.authorize_url());
        assert_eq!(popup.name(), "azure-oauth");
        assert!(
            popup
                .url()
                .query_pairs()
                .any(|(k, v)| k == "state" && v == flow.state())
        );
    }

    #[tokio::test]
    async fn test_blocked_popup() {
        let launcher = Arc::new(InMemoryPopupLauncher::new());
        launcher.set_blocked(true);
        let result = controller(launcher).start_flow();
        assert!(matches!(result, Err(PopupError::PopupBlocked)));
    }

    #[tokio::test]
    async fn test_missing_client_id_is_rejected() {
        let launcher = Arc::new(InMemoryPopupLauncher::new());
        let controller = PopupFlowController::new(PopupConfig::new(""), launcher.clone());
        assert!(matches!(
            controller.start_flow(),
            Err(PopupError::ConfigError(_))
        ));
        assert!(launcher.opened().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_popup_cancels_flow() {
        let launcher = Arc::new(InMemoryPopupLauncher::new());
        let flow = controller(launcher.clone()).start_flow().unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!flow.is_cancelled());

        launcher.last_opened().unwrap().close();
        tokio::time::timeout(Duration::from_secs(5), flow.cancelled())
            .await
            .expect("flow should be cancelled once the popup closes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_flow_is_not_cancelled_by_close() {
        let launcher = Arc::new(InMemoryPopupLauncher::new());
        let flow = controller(launcher.clone()).start_flow().unwrap();

        flow.finish();
        launcher.last_opened().unwrap().close();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(flow.is_finished());
        assert!(!flow.is_cancelled());
    }
}
