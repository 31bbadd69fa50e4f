//! NFC tag scanning for card enrollment
//!
//! The platform driver sits behind [`reader::NfcReader`]; [`scanner::NfcScanner`]
//! adds the availability probe, the bounded wait and UID extraction.

pub mod error;
pub mod ndef;
pub mod reader;
pub mod scanner;

pub use error::{NfcError, NfcResult};
pub use reader::{NdefRecord, NfcReader, NfcTag, RecordType, UnavailableReader};
pub use scanner::{NfcConfig, NfcScanner};
