use serde::{Deserialize, Serialize};

/// Calendar used to turn epoch day counts into dates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateZone {
    #[default]
    Utc,
    /// The executing process's local zone. Results depend on the host.
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub date_zone: DateZone,
    /// Reject dictionary codes that do not refer to an interned string.
    ///
    /// When disabled, codes are trusted as long as they are non-negative.
    pub verify_codes: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            date_zone: DateZone::Utc,
            verify_codes: true,
        }
    }
}
