//! Health check against the remote API.

use super::{CliError, client};

/// Round-trip the page view counter to prove the API answers.
pub async fn ping() -> Result<(), CliError> {
    let api = client()?;
    let views = api.page_views().await?;
    println!("API is up. {views} page views recorded.");
    Ok(())
}
