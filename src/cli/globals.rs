//! Connection settings shared by every subcommand.

use crate::{
    device::FritzBox,
    session::SessionManager,
    transport::{DeviceTarget, HttpTransport, APP_USER_AGENT},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

#[derive(Clone)]
pub struct GlobalArgs {
    pub url: String,
    pub target: DeviceTarget,
    pub username: String,
    pub password: Option<SecretString>,
    pub session_timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(url: String, target: DeviceTarget) -> Self {
        Self {
            url,
            target,
            username: String::new(),
            password: None,
            session_timeout: crate::session::DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Password for commands that need a session.
    /// # Errors
    /// Returns an error if no password was configured.
    pub fn password(&self) -> Result<SecretString> {
        self.password
            .clone()
            .context("missing required argument: --password (or FRITZBOX_PASSWORD)")
    }

    /// Device client for the configured target, not yet logged in.
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn device(&self) -> Result<FritzBox<HttpTransport>> {
        let transport = HttpTransport::from_target(APP_USER_AGENT, self.target.clone())?;
        let session = SessionManager::new(transport).with_session_timeout(self.session_timeout);

        Ok(FritzBox::new(session))
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("url", &self.url)
            .field("target", &self.target)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("session_timeout", &self.session_timeout)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let url = "http://192.168.178.1".to_string();
        let target = DeviceTarget::parse(&url).unwrap();
        let mut args = GlobalArgs::new(url, target);
        assert_eq!(args.url, "http://192.168.178.1");
        assert!(args.password().is_err());

        args.password = Some(SecretString::from("hunter2".to_string()));
        let debug = format!("{args:?}");
        assert!(!debug.contains("hunter2"));
        assert!(args.password().is_ok());
    }

    #[test]
    fn test_device_uses_timeout() {
        let target = DeviceTarget::default();
        let mut args = GlobalArgs::new(target.base_url().to_string(), target);
        args.session_timeout = Duration::from_secs(60);

        let device = args.device().unwrap();
        assert_eq!(device.session().session_timeout(), Duration::from_secs(60));
        assert_eq!(
            device.session().transport().target().base_url(),
            "http://fritz.box"
        );
    }
}
