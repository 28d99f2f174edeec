use anyhow::Result;
use fritzbox::cli::{actions, start};

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = start()?;

    actions::execute(action, &globals).await
}
