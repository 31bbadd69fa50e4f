//! NFC error types

use std::time::Duration;

use thiserror::Error;

/// Errors raised while scanning or writing tags
#[derive(Error, Debug)]
pub enum NfcError {
    /// The device has no NFC hardware or it is switched off
    #[error("NFC is not available on this device")]
    Unavailable,

    /// A scan is already running on this scanner
    #[error("An NFC scan is already in progress")]
    Busy,

    /// No tag was presented before the deadline
    #[error("No NFC tag detected within {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// A tag was read but carried neither an identifier nor a text record
    #[error("The NFC tag has no readable identifier")]
    NoIdentifier,

    /// The reader reported a failure
    #[error("NFC hardware error: {0}")]
    Hardware(String),

    /// A record payload did not follow the NDEF layout
    #[error("Malformed NDEF record: {0}")]
    Malformed(String),
}

/// Type alias for Result with NfcError
pub type NfcResult<T> = Result<T, NfcError>;
