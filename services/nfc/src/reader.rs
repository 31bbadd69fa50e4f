//! Reader abstraction over the platform NFC driver

use async_trait::async_trait;

use crate::error::NfcResult;

/// NDEF record type name format, reduced to what the client distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    Text,
    Uri,
    Other(String),
}

/// One NDEF record as delivered by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    pub record_type: RecordType,
    /// Raw record payload
    pub payload: Vec<u8>,
}

/// A tag presented to the reader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfcTag {
    /// Hardware serial number, if the driver exposes it
    pub id: Option<Vec<u8>>,
    pub records: Vec<NdefRecord>,
}

/// Platform NFC driver
///
/// Implementations wrap whatever the device provides. `next_tag` may wait
/// indefinitely; bounding the wait is the scanner's job.
#[async_trait]
pub trait NfcReader: Send + Sync {
    /// Probe whether NFC hardware is present and enabled
    async fn is_available(&self) -> bool;

    /// Start listening for tags
    async fn start_scan(&self) -> NfcResult<()>;

    /// Wait for the next tag
    async fn next_tag(&self) -> NfcResult<NfcTag>;

    /// Stop listening and release driver listeners
    async fn stop_scan(&self) -> NfcResult<()>;

    /// Write records to the next tag presented
    async fn write(&self, records: Vec<NdefRecord>) -> NfcResult<()>;
}

/// Reader used on devices without NFC support
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableReader;

#[async_trait]
impl NfcReader for UnavailableReader {
    async fn is_available(&self) -> bool {
        false
    }

    async fn start_scan(&self) -> NfcResult<()> {
        Err(crate::error::NfcError::Unavailable)
    }

    async fn next_tag(&self) -> NfcResult<NfcTag> {
        Err(crate::error::NfcError::Unavailable)
    }

    async fn stop_scan(&self) -> NfcResult<()> {
        Ok(())
    }

    async fn write(&self, _records: Vec<NdefRecord>) -> NfcResult<()> {
        Err(crate::error::NfcError::Unavailable)
    }
}
