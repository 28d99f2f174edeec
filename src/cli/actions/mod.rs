pub mod device;
pub mod session;

use crate::cli::globals::GlobalArgs;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SessionId,
    LastUser,
    Data {
        page: String,
        params: Vec<(String, String)>,
    },
    Calls {
        skip: usize,
        limit: Option<usize>,
    },
    PhoneBook {
        id: u32,
    },
    Reboot,
}

/// Run `action` against the configured device.
/// # Errors
/// Returns an error if the client cannot be built, login fails, or the device
/// sent a malformed challenge.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::SessionId => session::session_id(globals).await,
        Action::LastUser => session::last_user(globals).await,
        Action::Data { page, params } => device::data(globals, &page, &params).await,
        Action::Calls { skip, limit } => device::calls(globals, skip, limit).await,
        Action::PhoneBook { id } => device::phone_book(globals, id).await,
        Action::Reboot => device::reboot(globals).await,
    }
}
