//! Client side of the popup OAuth2 authorization code flow.
//!
//! Three cooperating pieces live here:
//!
//! - [`PopupFlowController`] builds the authorize URL, opens the popup and
//!   watches for the user closing it before the flow completes.
//! - [`CallbackBridge`] runs inside the popup once the provider redirects
//!   back, exchanges the code through the server and relays exactly one
//!   [`OAuthMessage`] to the opener before closing the popup.
//! - [`SessionStore`] runs in the opener, owns the [`AuthState`], persists
//!   the token/user pair and offers login, logout and refresh.
//!
//! Browser facilities (window opening, `postMessage`, `localStorage`) sit
//! behind small traits; in-memory implementations ship with the crate so the
//! whole handshake can run without a browser.

mod bridge;
mod channel;
mod config;
mod error;
mod flow;
mod http;
mod request;
mod session;
mod storage;
mod window;


pub use bridge::{BridgeOutcome, CallbackBridge, CallbackQuery, CodeExchangeClient};
pub use channel::{BusOpenerPort, MessageBus, MessageEvent, OpenerPort};
pub use config::PopupConfig;
pub use error::{PopupError, PopupResult};
pub use flow::{PopupFlow, PopupFlowController};
pub use http::{HttpGatewayClient, HttpTokenValidator};
pub use request::{AuthorizationRequest, generate_state};
pub use session::{AuthState, SessionStatus, SessionStore};
pub use storage::{InMemoryStorage, PersistedSession, SessionStorage, StorageError};
pub use window::{
    CallbackWindow, InMemoryCallbackWindow, InMemoryPopup, InMemoryPopupLauncher, PopupHandle,
    PopupLauncher,
};

// Re-export common types for convenience
pub use ras_oauth_core::{OAuthMessage, TokenBundle, TokenValidator, UserProfile};
