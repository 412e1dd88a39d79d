//! Window handles for the popup and the callback page.

use crate::channel::OpenerPort;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// A popup opened by [`PopupLauncher`].
pub trait PopupHandle: Send + Sync {
    fn is_closed(&self) -> bool;
}

/// Opens popup windows.
pub trait PopupLauncher: Send + Sync {
    /// Open `url` in a popup. `None` means the popup was blocked.
    fn open(&self, url: &Url, name: &str, features: &str) -> Option<Arc<dyn PopupHandle>>;
}

/// The window the callback page runs in.
pub trait CallbackWindow: Send + Sync {
    /// Origin of the callback page itself.
    fn origin(&self) -> String;

    /// The window that opened this one, if it is still reachable.
    fn opener(&self) -> Option<Arc<dyn OpenerPort>>;

    fn close(&self);
}

/// A popup living in memory. Closing it is observable by the flow watcher.
#[derive(Debug)]
pub struct InMemoryPopup {
    url: Url,
    name: String,
    features: String,
    closed: AtomicBool,
}

impl InMemoryPopup {
    pub fn new(url: Url, name: impl Into<String>, features: impl Into<String>) -> Self {
        Self {
            url,
            name: name.into(),
            features: features.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &str {
        &self.features
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl PopupHandle for InMemoryPopup {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Launcher that records every popup it opens.
#[derive(Debug, Default)]
pub struct InMemoryPopupLauncher {
    opened: Mutex<Vec<Arc<InMemoryPopup>>>,
    blocked: AtomicBool,
}

impl InMemoryPopupLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `open` calls behave like a popup blocker.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<Arc<InMemoryPopup>> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_opened(&self) -> Option<Arc<InMemoryPopup>> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl PopupLauncher for InMemoryPopupLauncher {
    fn open(&self, url: &Url, name: &str, features: &str) -> Option<Arc<dyn PopupHandle>> {
        if self.blocked.load(Ordering::SeqCst) {
            return None;
        }

        let popup = Arc::new(InMemoryPopup::new(url.clone(), name, features));
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(popup.clone());
        Some(popup)
    }
}

/// Callback page window living in memory, optionally backed by the popup
/// the opener launched so that closing one closes the other.
pub struct InMemoryCallbackWindow {
    origin: String,
    opener: Option<Arc<dyn OpenerPort>>,
    popup: Option<Arc<InMemoryPopup>>,
    closed: AtomicBool,
}

impl InMemoryCallbackWindow {
    pub fn new(origin: impl Into<String>, opener: Option<Arc<dyn OpenerPort>>) -> Self {
        Self {
            origin: origin.into(),
            opener,
            popup: None,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_popup(mut self, popup: Arc<InMemoryPopup>) -> Self {
        self.popup = Some(popup);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CallbackWindow for InMemoryCallbackWindow {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn opener(&self) -> Option<Arc<dyn OpenerPort>> {
        self.opener.clone()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(popup) = &self.popup {
            popup.close();
        }
    }
}
