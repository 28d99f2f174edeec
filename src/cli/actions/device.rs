use crate::cli::{actions::session::connect, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use tracing::instrument;

#[instrument(skip(globals))]
pub async fn data(globals: &GlobalArgs, page: &str, params: &[(String, String)]) -> Result<()> {
    let mut device = connect(globals).await?;

    let mut form: Vec<(&str, &str)> = vec![("page", page)];
    form.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let result = device
        .data(&form)
        .await?
        .ok_or_else(|| anyhow!("no data returned for page {page}"))?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

#[instrument(skip(globals))]
pub async fn calls(globals: &GlobalArgs, skip: usize, limit: Option<usize>) -> Result<()> {
    let mut device = connect(globals).await?;

    let list = device
        .calls(skip, limit)
        .await?
        .ok_or_else(|| anyhow!("no call list returned"))?;

    println!("{}", serde_json::to_string_pretty(&list)?);

    Ok(())
}

#[instrument(skip(globals))]
pub async fn phone_book(globals: &GlobalArgs, id: u32) -> Result<()> {
    let mut device = connect(globals).await?;

    let xml = device
        .phone_book(id)
        .await?
        .ok_or_else(|| anyhow!("no phone book returned for id {id}"))?;

    println!("{xml}");

    Ok(())
}

#[instrument(skip(globals))]
pub async fn reboot(globals: &GlobalArgs) -> Result<()> {
    let mut device = connect(globals).await?;

    let succeeded = device
        .reboot()
        .await?
        .is_some_and(|outcome| outcome.is_success());

    println!(
        "Reboot State: {}",
        if succeeded { "Success" } else { "Failure" }
    );

    Ok(())
}
