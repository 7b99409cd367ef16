// Session configuration.
//
// Client-side knobs loaded from JSON. Every field has a default, so a
// partial JSON object (or `{}`) is valid input. Rule limits that the ledger
// enforces (board sides, ship vector shape) are protocol constants and do
// not live here.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The ledger's ping window in blocks. Only used in alert text; the
    /// ledger enforces the window itself.
    pub ping_window_blocks: u32,
    /// Refuse to submit a board whose ships cannot be extracted. When false
    /// the board is committed anyway and the mismatch becomes an automatic
    /// loss at validation time.
    pub reject_mismatched_boards: bool,
    /// Shown when the local account is neither host nor guest.
    pub unauthorized_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_window_blocks: 5,
            reject_mismatched_boards: true,
            unauthorized_message: "You are not a player".into(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(
            SessionConfig::from_json("{}").unwrap(),
            SessionConfig::default()
        );
    }

    #[test]
    fn partial_override() {
        let config = SessionConfig::from_json(r#"{"ping_window_blocks": 12}"#).unwrap();
        assert_eq!(config.ping_window_blocks, 12);
        assert!(config.reject_mismatched_boards);
        assert_eq!(config.unauthorized_message, "You are not a player");
    }

    #[test]
    fn json_roundtrip() {
        let config = SessionConfig {
            ping_window_blocks: 7,
            reject_mismatched_boards: false,
            unauthorized_message: "Spectators cannot act".into(),
        };
        let json = config.to_json().unwrap();
        assert_eq!(SessionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            SessionConfig::from_json("{\"ping_window_blocks\": \"soon\"}"),
            Err(SessionError::Config(_))
        ));
    }
}
