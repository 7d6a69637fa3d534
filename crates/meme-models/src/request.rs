//! HTTP request schema for meme generation.

use serde::{Deserialize, Serialize};
use url::Url;

/// Number of source URLs a generation request must carry.
pub const REQUIRED_URL_COUNT: usize = 4;

/// Body of `POST /generate-meme`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMemeRequest {
    /// Media source URLs, in the order their clips should play.
    pub urls: Vec<String>,
}

impl GenerateMemeRequest {
    /// Validate the request.
    ///
    /// Only absolute `http`/`https` URLs are accepted so that nothing the
    /// caller sends can be read as an option by the fetch tool.
    pub fn validate(&self) -> Result<(), String> {
        if self.urls.len() != REQUIRED_URL_COUNT {
            return Err(format!("Exactly {} URLs are required", REQUIRED_URL_COUNT));
        }

        for (index, raw) in self.urls.iter().enumerate() {
            // The fetch tool gets the string as sent, so it must parse as is
            if raw.trim() != raw {
                return Err(format!(
                    "URL at index {} has leading or trailing whitespace",
                    index
                ));
            }

            let parsed = Url::parse(raw)
                .map_err(|e| format!("URL at index {} is invalid: {}", index, e))?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!(
                    "URL at index {} must use http or https, got {}",
                    index,
                    parsed.scheme()
                ));
            }
        }

        Ok(())
    }
}
