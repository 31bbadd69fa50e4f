//! Bounded NFC scanning and writing
//!
//! A scan races the driver's tag callback against a deadline. Whichever
//! finishes first wins; the reader is stopped afterwards on every path and
//! the scanning flag always ends up false.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{NfcError, NfcResult};
use crate::ndef::{text_record, uid_from_tag};
use crate::reader::NfcReader;

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct NfcConfig {
    /// How long to wait for a tag (default: 30 seconds)
    pub scan_timeout: Duration,
    /// Language code for written text records (default: "en")
    pub language: String,
}

impl Default for NfcConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(30),
            language: "en".to_string(),
        }
    }
}

/// Resets the scanning flag when the operation ends or is dropped
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// NFC scanner
#[derive(Clone)]
pub struct NfcScanner {
    reader: Arc<dyn NfcReader>,
    config: NfcConfig,
    scanning: Arc<AtomicBool>,
}

impl NfcScanner {
    pub fn new(reader: Arc<dyn NfcReader>, config: NfcConfig) -> Self {
        Self {
            reader,
            config,
            scanning: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a scan or write is currently running
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Probe the hardware
    pub async fn is_available(&self) -> bool {
        self.reader.is_available().await
    }

    fn begin(&self) -> NfcResult<ScanGuard<'_>> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Err(NfcError::Busy);
        }
        Ok(ScanGuard(&self.scanning))
    }

    /// Wait for a tag and return its UID
    pub async fn scan_uid(&self) -> NfcResult<String> {
        if !self.reader.is_available().await {
            warn!("NFC scan requested but hardware is unavailable");
            return Err(NfcError::Unavailable);
        }

        let _guard = self.begin()?;
        info!(
            "Waiting up to {}s for an NFC tag",
            self.config.scan_timeout.as_secs()
        );

        let result = self.read_one().await;

        if let Err(e) = self.reader.stop_scan().await {
            warn!("Failed to stop NFC scan: {}", e);
        }

        match &result {
            Ok(uid) => info!("Read NFC tag {}", uid),
            Err(e) => warn!("NFC scan failed: {}", e),
        }
        result
    }

    async fn read_one(&self) -> NfcResult<String> {
        self.reader.start_scan().await?;

        let tag = tokio::time::timeout(self.config.scan_timeout, self.reader.next_tag())
            .await
            .map_err(|_| NfcError::Timeout(self.config.scan_timeout))??;

        uid_from_tag(&tag)
    }

    /// Write `text` as a single text record to the next tag presented
    pub async fn write_text(&self, text: &str) -> NfcResult<()> {
        if !self.reader.is_available().await {
            return Err(NfcError::Unavailable);
        }

        let record = text_record(text, &self.config.language)?;
        let _guard = self.begin()?;

        tokio::time::timeout(self.config.scan_timeout, self.reader.write(vec![record]))
            .await
            .map_err(|_| NfcError::Timeout(self.config.scan_timeout))??;

        info!("Wrote text record to NFC tag");
        Ok(())
    }
}
