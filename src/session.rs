//! Session handshake and reuse.
//!
//! Flow Overview:
//! 1. `login` installs credentials and runs a handshake.
//! 2. `session_id(false)` returns the cached SID while it is younger than the
//!    session timeout, without touching the network.
//! 3. Otherwise (or with `renew`), the handshake runs: GET the challenge, honor
//!    `BlockTime`, compute the response, POST `username` + `response`, read `SID`.
//!
//! Failures of the device or the network produce `None`; the caller cannot
//! tell "unreachable" from "rejected". Only a malformed PBKDF2 challenge or a
//! missing login surfaces as an error.

use crate::{
    challenge::ChallengeSpec,
    error::{Error, Result},
    transport::Transport,
    xml::{extract_value, extract_value_with, Occurrence},
};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Login endpoint, version 2 of the protocol (PBKDF2 capable).
pub const LOGIN_PATH: &str = "/login_sid.lua?version=2";

/// The device drops idle sessions after 20 minutes.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_millis(1_200_000);

/// SID returned when authentication is rejected.
pub const INVALID_SID: &str = "0000000000000000";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Cached session and the instant it was issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    sid: Option<String>,
    acquired_at: Option<Instant>,
}

impl SessionState {
    fn acquired(sid: String, at: Instant) -> Self {
        Self {
            sid: Some(sid),
            acquired_at: Some(at),
        }
    }

    #[must_use]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    #[must_use]
    pub fn acquired_at(&self) -> Option<Instant> {
        self.acquired_at
    }

    /// SID usable at `now`, if any.
    #[must_use]
    pub fn valid_sid(&self, now: Instant, timeout: Duration) -> Option<&str> {
        let acquired_at = self.acquired_at?;
        let sid = self.sid.as_deref()?;

        (sid != INVALID_SID && now.saturating_duration_since(acquired_at) < timeout).then_some(sid)
    }
}

/// Owns the credentials and the current session for one device.
///
/// One instance per device relationship; operations take `&mut self`, so a
/// handshake in flight has exclusive access to the session state.
pub struct SessionManager<T> {
    transport: T,
    credentials: Option<Credentials>,
    state: SessionState,
    session_timeout: Duration,
}

impl<T: Transport> SessionManager<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            credentials: None,
            state: SessionState::default(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Install credentials and authenticate.
    ///
    /// Any session held for previous credentials is discarded first.
    /// # Errors
    /// Returns [`Error::MalformedChallenge`] if the device sent an unparseable PBKDF2 challenge.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, username: &str, password: SecretString) -> Result<bool> {
        self.credentials = Some(Credentials::new(username, password));
        self.state = SessionState::default();

        let sid = self.session_id(false).await?;

        Ok(sid.is_some())
    }

    /// Current session id, authenticating again when the cached one expired or
    /// `renew` is set.
    /// # Errors
    /// Returns [`Error::MissingCredentials`] before `login`, or
    /// [`Error::MalformedChallenge`] if the device sent an unparseable PBKDF2 challenge.
    #[instrument(skip(self))]
    pub async fn session_id(&mut self, renew: bool) -> Result<Option<String>> {
        let credentials = self.credentials.clone().ok_or(Error::MissingCredentials)?;

        if !renew {
            if let Some(sid) = self.state.valid_sid(Instant::now(), self.session_timeout) {
                debug!("reusing cached session");
                return Ok(Some(sid.to_string()));
            }
        }

        let Some(sid) = self.handshake(&credentials).await? else {
            return Ok(None);
        };

        if sid == INVALID_SID {
            warn!("device rejected credentials for user {}", credentials.username);
            self.state = SessionState::default();
            return Ok(None);
        }

        info!("session established for user {}", credentials.username);
        self.state = SessionState::acquired(sid.clone(), Instant::now());

        Ok(Some(sid))
    }

    /// Name of the account that authenticated last, read from the login page.
    #[instrument(skip(self))]
    pub async fn last_user(&self) -> Option<String> {
        let response = self.transport.get(LOGIN_PATH).await;
        let body = response.ok_data()?;

        extract_value_with(Some(body), "User", &[("last", "1")], Occurrence::First)
            .or_else(|| extract_value_with(Some(body), "User", &[], Occurrence::Last))
    }

    async fn handshake(&self, credentials: &Credentials) -> Result<Option<String>> {
        let response = self.transport.get(LOGIN_PATH).await;
        let Some(body) = response.ok_data() else {
            warn!("challenge request failed: {} - {:?}", response.url, response.status);
            return Ok(None);
        };

        let block_time = block_time(body);
        if block_time > 0 {
            info!("device requested a block time of {} seconds", block_time);
            sleep(Duration::from_secs(block_time)).await;
        }

        let Some(challenge) = extract_value(Some(body), "Challenge").filter(|c| !c.is_empty())
        else {
            warn!("no challenge in login response");
            return Ok(None);
        };

        let token = ChallengeSpec::parse(&challenge)?.respond(credentials.password.expose_secret());

        let response = self
            .transport
            .post(
                LOGIN_PATH,
                &[
                    ("username", credentials.username.as_str()),
                    ("response", token.as_str()),
                ],
            )
            .await;
        let Some(body) = response.ok_data() else {
            warn!("login request failed: {} - {:?}", response.url, response.status);
            return Ok(None);
        };

        Ok(extract_value(Some(body), "SID").filter(|sid| !sid.is_empty()))
    }
}

impl<T> std::fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .field("state", &self.state)
            .field("session_timeout", &self.session_timeout)
            .finish_non_exhaustive()
    }
}

/// Seconds to wait before answering; missing or unparseable counts as zero.
fn block_time(body: &str) -> u64 {
    extract_value(Some(body), "BlockTime")
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn block_time_defaults_to_zero() {
        assert_eq!(block_time("<BlockTime>12</BlockTime>"), 12);
        assert_eq!(block_time("<BlockTime> 3 </BlockTime>"), 3);
        assert_eq!(block_time("<BlockTime></BlockTime>"), 0);
        assert_eq!(block_time("<BlockTime>soon</BlockTime>"), 0);
        assert_eq!(block_time("<Challenge>abc</Challenge>"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_state_has_no_session() {
        let state = SessionState::default();
        assert_eq!(state.valid_sid(Instant::now(), DEFAULT_SESSION_TIMEOUT), None);
    }

    #[tokio::test(start_paused = true)]
    async fn session_expires_after_timeout() {
        let timeout = Duration::from_secs(60);
        let start = Instant::now();
        let state = SessionState::acquired("1122334455667788".to_string(), start);

        assert_eq!(state.valid_sid(start, timeout), Some("1122334455667788"));
        assert_eq!(
            state.valid_sid(start + timeout - Duration::from_millis(1), timeout),
            Some("1122334455667788")
        );
        assert_eq!(state.valid_sid(start + timeout, timeout), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_is_never_valid() {
        let start = Instant::now();
        let state = SessionState::acquired(INVALID_SID.to_string(), start);
        assert_eq!(state.valid_sid(start, DEFAULT_SESSION_TIMEOUT), None);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials::new("admin", SecretString::from("hunter2".to_string()));
        let debug = format!("{credentials:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
