use crate::{
    cli::globals::GlobalArgs,
    device::FritzBox,
    transport::{HttpTransport, Transport},
};
use anyhow::{anyhow, Result};
use tracing::instrument;

/// Build a client and log in with the configured credentials.
/// # Errors
/// Returns an error if no password is configured or the device rejects the login.
pub async fn connect(globals: &GlobalArgs) -> Result<FritzBox<HttpTransport>> {
    let mut device = globals.device()?;
    login(&mut device, globals).await?;
    Ok(device)
}

pub(crate) async fn login<T: Transport>(
    device: &mut FritzBox<T>,
    globals: &GlobalArgs,
) -> Result<()> {
    if device.login(&globals.username, globals.password()?).await? {
        Ok(())
    } else {
        Err(anyhow!(
            "login to {} failed: device unreachable or credentials rejected",
            globals.target.base_url()
        ))
    }
}

#[instrument(skip(globals))]
pub async fn session_id(globals: &GlobalArgs) -> Result<()> {
    let mut device = connect(globals).await?;

    let sid = device
        .session_id(false)
        .await?
        .ok_or_else(|| anyhow!("no session id"))?;

    println!("SID: {sid}");

    Ok(())
}

#[instrument(skip(globals))]
pub async fn last_user(globals: &GlobalArgs) -> Result<()> {
    let device = globals.device()?;

    let user = device.last_user().await;

    println!("Last User: {}", user.as_deref().unwrap_or("None"));

    Ok(())
}
