mod discover;
mod generate;
mod sync;

pub use discover::*;
pub use generate::*;
pub use sync::*;

use crate::errors::CliError;
use crate::utils::config::AppConfig;
use keymaster_core::UrlSource;

/// HTTP source honoring the timeout from keymaster.toml.
fn url_source(settings: &AppConfig) -> Result<UrlSource, CliError> {
    let source = match settings.http_timeout() {
        Some(timeout) => UrlSource::with_timeout(timeout)?,
        None => UrlSource::new()?,
    };
    Ok(source)
}
