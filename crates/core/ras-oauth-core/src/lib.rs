//! Core types shared by both ends of the popup OAuth2 authorization code flow.
//!
//! The server side (code exchange and token validation) and the client side
//! (popup controller, callback bridge and session store) only agree on the
//! types defined here: the token bundle returned by a successful exchange, the
//! message that crosses the popup/opener boundary, and the error taxonomy used
//! at the HTTP boundary.

mod error;
mod message;
mod types;
mod validator;

pub use error::{AuthErrorKind, reason};
pub use message::{OAuthMessage, OAuthMessageKind};
pub use types::{ErrorBody, ExchangeRequest, TokenBundle, UserProfile, ValidateResponse};
pub use validator::TokenValidator;
