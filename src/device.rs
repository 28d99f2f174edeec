//! Authenticated device operations on top of [`SessionManager`].
//!
//! Each operation obtains a session first (cached when possible) and returns
//! `None` when that fails, when the device answers with anything but 200, or
//! when the body cannot be decoded. Payloads are handed back as received; the
//! only shaping done here is splitting the call list CSV into rows.

use crate::{error::Result, session::SessionManager, transport::Transport};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const DATA_PATH: &str = "/data.lua";
pub const CALLS_PATH: &str = "/fon_num/foncalls_list.lua";
pub const FIRMWARECFG_PATH: &str = "/cgi-bin/firmwarecfg";
pub const REBOOT_PATH: &str = "/reboot.lua";

/// Header and rows of the call list export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallList {
    pub head: Vec<String>,
    pub entries: Vec<Vec<String>>,
}

impl CallList {
    /// Parse the CSV export: a `sep=<c>` line, a header row, then entries.
    ///
    /// Returns `None` when the separator line is missing.
    #[must_use]
    pub fn parse(csv: &str, skip: usize, limit: Option<usize>) -> Option<Self> {
        let mut rows = csv
            .split(|c: char| c == '\r' || c == '\n')
            .filter(|line| !line.is_empty());

        let separator = rows.next()?.split_once('=')?.1.to_string();
        if separator.is_empty() {
            return None;
        }

        let split = |row: &str| -> Vec<String> {
            row.split(separator.as_str()).map(str::to_string).collect()
        };

        let head = rows.next().map(split).unwrap_or_default();
        let entries = rows
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .map(split)
            .collect();

        Some(Self { head, entries })
    }
}

/// JSON body answered by `/reboot.lua`.
#[derive(Debug, Clone, PartialEq)]
pub struct RebootOutcome(pub Value);

impl RebootOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.0.get("reboot_state").and_then(Value::as_i64) == Some(0)
    }
}

/// A device reachable through one authenticated session.
#[derive(Debug)]
pub struct FritzBox<T> {
    session: SessionManager<T>,
}

impl<T: Transport> FritzBox<T> {
    #[must_use]
    pub fn new(session: SessionManager<T>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<T> {
        &mut self.session
    }

    /// See [`SessionManager::login`].
    /// # Errors
    /// Returns an error if the device sent a malformed challenge.
    pub async fn login(&mut self, username: &str, password: SecretString) -> Result<bool> {
        self.session.login(username, password).await
    }

    /// See [`SessionManager::session_id`].
    /// # Errors
    /// Returns an error before `login` or on a malformed challenge.
    pub async fn session_id(&mut self, renew: bool) -> Result<Option<String>> {
        self.session.session_id(renew).await
    }

    pub async fn last_user(&self) -> Option<String> {
        self.session.last_user().await
    }

    /// Query a `data.lua` page. `params` override the defaults
    /// (`xhr=1`, `sid`, `page=overview`, `xhrId=`) by name.
    /// # Errors
    /// Returns an error before `login` or on a malformed challenge.
    #[instrument(skip(self))]
    pub async fn data(&mut self, params: &[(&str, &str)]) -> Result<Option<Value>> {
        let Some(sid) = self.session.session_id(false).await? else {
            return Ok(None);
        };

        let mut form: Vec<(&str, &str)> = vec![
            ("xhr", "1"),
            ("sid", sid.as_str()),
            ("page", "overview"),
            ("xhrId", ""),
        ];
        for &(key, value) in params {
            match form.iter_mut().find(|(k, _)| *k == key) {
                Some(field) => field.1 = value,
                None => form.push((key, value)),
            }
        }

        let response = self.session.transport().post(DATA_PATH, &form).await;

        Ok(decode_json(response.ok_data()))
    }

    /// Export a phone book as raw XML.
    /// # Errors
    /// Returns an error before `login` or on a malformed challenge.
    #[instrument(skip(self))]
    pub async fn phone_book(&mut self, phone_book_id: u32) -> Result<Option<String>> {
        let Some(sid) = self.session.session_id(false).await? else {
            return Ok(None);
        };

        let id = phone_book_id.to_string();
        let response = self
            .session
            .transport()
            .post(
                FIRMWARECFG_PATH,
                &[
                    ("sid", sid.as_str()),
                    ("PhonebookId", id.as_str()),
                    ("PhonebookExportName", "Phonebook"),
                    ("PhonebookExport", ""),
                ],
            )
            .await;

        Ok(response.ok_data().map(str::to_string))
    }

    /// Fetch the call list, skipping `skip` entries and keeping at most `limit`.
    /// # Errors
    /// Returns an error before `login` or on a malformed challenge.
    #[instrument(skip(self))]
    pub async fn calls(&mut self, skip: usize, limit: Option<usize>) -> Result<Option<CallList>> {
        let Some(sid) = self.session.session_id(false).await? else {
            return Ok(None);
        };

        let path = format!("{CALLS_PATH}?sid={sid}&csv=");
        let response = self.session.transport().get(&path).await;

        Ok(response
            .ok_data()
            .and_then(|csv| CallList::parse(csv, skip, limit)))
    }

    /// Ask the device to reboot; it must acknowledge on `data.lua` first.
    /// # Errors
    /// Returns an error before `login` or on a malformed challenge.
    #[instrument(skip(self))]
    pub async fn reboot(&mut self) -> Result<Option<RebootOutcome>> {
        let Some(result) = self.data(&[("page", "reboot"), ("reboot", "1")]).await? else {
            return Ok(None);
        };

        let acknowledged = result
            .get("data")
            .and_then(|d| d.get("reboot"))
            .and_then(Value::as_str)
            == Some("ok");
        if !acknowledged {
            warn!("device did not acknowledge reboot request");
            return Ok(None);
        }

        let Some(sid) = self.session.session_id(false).await? else {
            return Ok(None);
        };

        let response = self
            .session
            .transport()
            .post(
                REBOOT_PATH,
                &[
                    ("ajax", "1"),
                    ("sid", sid.as_str()),
                    ("no_sidrenew", "1"),
                    ("xhr", "1"),
                    ("useajax", "1"),
                ],
            )
            .await;

        Ok(decode_json(response.ok_data()).map(RebootOutcome))
    }
}

fn decode_json(body: Option<&str>) -> Option<Value> {
    serde_json::from_str(body?)
        .map_err(|e| debug!("response is not JSON: {}", e))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const CSV: &str = "sep=;\r\nType;Date;Name;Number\r\n1;01.10.26 10:00;Alice;0301\r\n2;01.10.26 11:00;Bob;0302\r\n3;02.10.26 09:15;;0303\r\n";

    #[test]
    fn call_list_splits_on_declared_separator() {
        let list = CallList::parse(CSV, 0, None).unwrap();
        assert_eq!(list.head, vec!["Type", "Date", "Name", "Number"]);
        assert_eq!(list.entries.len(), 3);
        assert_eq!(list.entries[0], vec!["1", "01.10.26 10:00", "Alice", "0301"]);
        assert_eq!(list.entries[2], vec!["3", "02.10.26 09:15", "", "0303"]);
    }

    #[test]
    fn call_list_skip_and_limit() {
        let list = CallList::parse(CSV, 1, Some(1)).unwrap();
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0][2], "Bob");

        let list = CallList::parse(CSV, 5, Some(10)).unwrap();
        assert!(list.entries.is_empty());
    }

    #[test]
    fn call_list_accepts_mixed_line_endings() {
        let list = CallList::parse("sep=,\nA,B\r1,2\r\n3,4", 0, None).unwrap();
        assert_eq!(list.head, vec!["A", "B"]);
        assert_eq!(list.entries, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn call_list_requires_separator_line() {
        assert_eq!(CallList::parse("", 0, None), None);
        assert_eq!(CallList::parse("Type;Date", 0, None), None);
    }

    #[test]
    fn reboot_outcome_reads_state() {
        assert!(RebootOutcome(json!({"reboot_state": 0})).is_success());
        assert!(!RebootOutcome(json!({"reboot_state": 1})).is_success());
        assert!(!RebootOutcome(json!({})).is_success());
    }

    #[test]
    fn decode_json_is_lenient() {
        assert_eq!(decode_json(Some(r#"{"a":1}"#)), Some(json!({"a": 1})));
        assert_eq!(decode_json(Some("<html/>")), None);
        assert_eq!(decode_json(None), None);
    }
}
