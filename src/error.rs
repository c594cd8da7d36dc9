//! Error types and result definitions for the smartoutlet crate.
//! Includes Tuya-specific error codes and conversion from JSON errors.

use thiserror::Error;

/// Represents all possible errors that can occur when talking to an outlet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TuyaError {
    /// Malformed hex input or cipher padding
    #[error("Format error: {0}")]
    Format(String),

    /// The device type has no template for the requested command kind
    #[error("No '{kind}' command template for device type '{dev_type}'")]
    UnknownCommand { dev_type: String, kind: String },

    /// Payload plus suffix does not fit the one-byte length field
    #[error("Payload too large for envelope: {0} bytes (max 255)")]
    PayloadTooLarge(usize),

    /// TCP connection could not be established (refused, unreachable, timed out)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Send or receive failed on an open connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// The reply is neither plaintext JSON nor a versioned encrypted payload
    #[error("Unexpected payload from device ({} bytes)", .0.len())]
    UnexpectedPayload(Vec<u8>),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// Local key is not 16 bytes long
    #[error("Local key must be 16 bytes, got {0}")]
    InvalidKey(usize),

    /// Ciphertext is not a whole number of AES blocks
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signature fragment on an encrypted reply did not match
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// No dps entry could be picked as the timer slot
    #[error("No timer slot available in device status")]
    TimerSlotUnavailable,
}

/// A specialized Result type for outlet operations.
pub type Result<T> = std::result::Result<T, TuyaError>;

impl From<serde_json::Error> for TuyaError {
    fn from(err: serde_json::Error) -> Self {
        TuyaError::Json(err.to_string())
    }
}

impl TuyaError {
    pub fn code(&self) -> u32 {
        match self {
            TuyaError::Format(_) => ERR_PAYLOAD,
            TuyaError::UnknownCommand { .. } => ERR_FUNCTION,
            TuyaError::PayloadTooLarge(_) => ERR_RANGE,
            TuyaError::Connection(_) => ERR_CONNECT,
            TuyaError::Transport(_) => ERR_OFFLINE,
            TuyaError::UnexpectedPayload(_) => ERR_PAYLOAD,
            TuyaError::Json(_) => ERR_JSON,
            TuyaError::InvalidKey(_) => ERR_KEY_OR_VER,
            TuyaError::DecryptionFailed => ERR_KEY_OR_VER,
            TuyaError::SignatureMismatch => ERR_KEY_OR_VER,
            TuyaError::TimerSlotUnavailable => ERR_STATE,
        }
    }

    /// Message associated with this error's code.
    pub fn message(&self) -> &'static str {
        get_error_message(self.code())
    }
}

// TinyTuya Error Response Codes
define_error_codes! {
    ERR_SUCCESS = 0 => "Connection Successful",
    ERR_JSON = 900 => "Invalid JSON Response from Device",
    ERR_CONNECT = 901 => "Network Error: Unable to Connect",
    ERR_TIMEOUT = 902 => "Timeout Waiting for Device",
    ERR_RANGE = 903 => "Specified Value Out of Range",
    ERR_PAYLOAD = 904 => "Unexpected Payload from Device",
    ERR_OFFLINE = 905 => "Network Error: Device Unreachable",
    ERR_STATE = 906 => "Device in Unknown State",
    ERR_FUNCTION = 907 => "Function Not Supported by Device",
    ERR_KEY_OR_VER = 914 => "Check device key or version",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_resolve_to_messages() {
        assert_eq!(
            TuyaError::Connection("refused".into()).message(),
            "Network Error: Unable to Connect"
        );
        assert_eq!(TuyaError::UnexpectedPayload(vec![1, 2]).code(), ERR_PAYLOAD);
        assert_eq!(get_error_message(ERR_SUCCESS), "Connection Successful");
        assert_eq!(get_error_message(12345), "Unknown Error");
    }
}
