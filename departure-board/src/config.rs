use anyhow::{Context, anyhow};
use chrono_tz::Tz;
use departure_feed::Track;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The board's configuration file.
///
/// ```json
/// {"station": "OSL", "timezone": "Europe/Oslo", "track": 4, "displayUrl": "http://192.168.1.50"}
/// ```
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    /// Station code, as used by the feed (ex: `OSL`).
    pub station: String,
    /// IANA timezone that departure times are displayed in.
    pub timezone: String,
    /// The track to show departures for.
    pub track: Track,
    /// Base URL of the LED matrix display; the console is used if absent.
    #[serde(default)]
    pub display_url: Option<String>,
}

impl BoardConfig {
    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read or isn't a valid config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::from_json(&bytes)
    }

    /// # Errors
    ///
    /// Fails on malformed JSON or missing fields.
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(bytes).context("Invalid board config")
    }

    /// # Errors
    ///
    /// Fails if the timezone isn't a known IANA name.
    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| anyhow!("Unknown timezone {:?}: {e}", self.timezone))
    }
}
