//! Session authentication for FRITZ!Box routers.
//!
//! The device authenticates clients with a challenge-response handshake on
//! `login_sid.lua` and hands out a session id (SID) that stays valid for twenty
//! minutes. [`SessionManager`] performs the handshake, honors the device's
//! brute-force `BlockTime`, and reuses the SID until it expires so that
//! callers do not authenticate on every request.

pub mod challenge;
pub mod cli;
pub mod device;
pub mod error;
pub mod session;
pub mod transport;
pub mod xml;

pub use challenge::{compute_response, ChallengeSpec, Pbkdf2Params};
pub use device::{CallList, FritzBox, RebootOutcome};
pub use error::{Error, Result};
pub use session::{
    Credentials, SessionManager, SessionState, DEFAULT_SESSION_TIMEOUT, INVALID_SID, LOGIN_PATH,
};
pub use transport::{DeviceTarget, HttpTransport, Transport, TransportResponse, APP_USER_AGENT};
