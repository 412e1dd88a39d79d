//! Session Store: the opener's auth state machine.

use crate::channel::MessageEvent;
use crate::error::PopupResult;
use crate::flow::{PopupFlow, PopupFlowController};
use crate::storage::{PersistedSession, SessionStorage};
use ras_oauth_core::{OAuthMessage, TokenBundle, TokenValidator, UserProfile};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Checking,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session as the application sees it.
///
/// `is_loading` is orthogonal to `status`: a login in progress does not hide
/// the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub status: SessionStatus,
    pub is_loading: bool,
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            is_loading: true,
            user: None,
            access_token: None,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    fn authenticated(bundle: TokenBundle) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            is_loading: false,
            user: Some(bundle.user),
            access_token: Some(bundle.access_token),
        }
    }

    fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            is_loading: false,
            user: None,
            access_token: None,
        }
    }
}

/// Owns [`AuthState`]; every transition goes through here.
pub struct SessionStore {
    origin: String,
    state: watch::Sender<AuthState>,
    session: PersistedSession,
    validator: Arc<dyn TokenValidator>,
    flows: PopupFlowController,
    pending: Mutex<Vec<PopupFlow>>,
}

impl SessionStore {
    /// `origin` is the opener page's own origin; messages from anywhere else
    /// are dropped.
    pub fn new(
        origin: impl Into<String>,
        storage: Arc<dyn SessionStorage>,
        validator: Arc<dyn TokenValidator>,
        flows: PopupFlowController,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            origin: origin.into(),
            state,
            session: PersistedSession::new(storage),
            validator,
            flows,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Restore and revalidate the persisted session.
    pub async fn initialize(&self) {
        self.state.send_modify(|state| {
            state.status = SessionStatus::Checking;
            state.is_loading = true;
        });

        let Some(bundle) = self.session.load() else {
            debug!("No stored session");
            self.state.send_replace(AuthState::unauthenticated());
            return;
        };

        let valid = self.validator.validate(&bundle.access_token).await;

        // A login or logout may have landed while the validator was out.
        if self.session.access_token().as_deref() != Some(bundle.access_token.as_str()) {
            debug!("Stored session changed during validation, keeping newer state");
            return;
        }

        if valid {
            info!("Restored stored session");
            self.state.send_replace(AuthState::authenticated(bundle));
        } else {
            warn!("Stored session is no longer valid, clearing it");
            self.session.clear();
            self.state.send_replace(AuthState::unauthenticated());
        }
    }

    /// Listen to `messages` until the channel closes.
    pub fn attach(self: &Arc<Self>, mut messages: broadcast::Receiver<MessageEvent>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(event) => {
                        store.handle_event(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Message listener lagged, skipped {} messages", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Apply one inbound message. Returns whether it changed anything.
    pub fn handle_event(&self, event: &MessageEvent) -> bool {
        if event.origin != self.origin {
            warn!("Ignoring message from foreign origin {}", event.origin);
            return false;
        }

        let Some(message) = OAuthMessage::from_data(&event.data) else {
            debug!("Ignoring unrelated message");
            return false;
        };

        self.finish_pending();

        match message {
            OAuthMessage::Success { payload } => {
                if let Err(e) = self.session.save(&payload) {
                    error!("Failed to persist session: {}", e);
                }
                info!("Login succeeded");
                self.state.send_replace(AuthState::authenticated(payload));
            }
            OAuthMessage::Error { error } => {
                error!("OAuth error: {}", error);
                self.state.send_modify(|state| state.is_loading = false);
            }
        }
        true
    }

    /// Open the login popup.
    ///
    /// The outcome arrives later through the message channel. If the user
    /// closes the popup first, loading is cleared.
    pub fn login(self: &Arc<Self>) -> PopupResult<PopupFlow> {
        self.state.send_modify(|state| state.is_loading = true);

        let flow = match self.flows.start_flow() {
            Ok(flow) => flow,
            Err(e) => {
                warn!("Could not start login: {}", e);
                self.state.send_modify(|state| state.is_loading = false);
                return Err(e);
            }
        };

        self.pending_flows().push(flow.clone());

        let store = Arc::clone(self);
        let watched = flow.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = watched.cancelled() => store.flow_cancelled(&watched),
                _ = watched.finished() => {}
            }
        });

        Ok(flow)
    }

    pub fn logout(&self) {
        self.session.clear();
        self.state.send_replace(AuthState::unauthenticated());
        info!("Logged out");
    }

    /// Revalidate the stored token. A rejected token logs the user out.
    ///
    /// Without a stored session the result is `false` and an in-memory
    /// session is dropped too.
    pub async fn refresh_token(&self) -> bool {
        let Some(bundle) = self.session.load() else {
            let authenticated = self.state.borrow().is_authenticated();
            if authenticated {
                warn!("Nothing stored to refresh, ending in-memory session");
                self.logout();
            }
            return false;
        };

        if self.validator.validate(&bundle.access_token).await {
            return true;
        }

        // A newer login may have replaced the token while it was checked.
        if self.session.access_token().as_deref() != Some(bundle.access_token.as_str()) {
            debug!("Stored session changed during refresh, keeping newer state");
            return false;
        }

        warn!("Stored token rejected on refresh");
        self.logout();
        false
    }

    fn pending_flows(&self) -> std::sync::MutexGuard<'_, Vec<PopupFlow>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_pending(&self) {
        for flow in self.pending_flows().drain(..) {
            flow.finish();
        }
    }

    fn flow_cancelled(&self, flow: &PopupFlow) {
        let mut pending = self.pending_flows();
        pending.retain(|other| other.state() != flow.state());
        let idle = pending.is_empty();
        drop(pending);

        info!("Login popup closed by user");
        if idle {
            self.state.send_modify(|state| state.is_loading = false);
        }
    }
}
