//! Evidence artifacts: viewport captures attached to the running step.
//!
//! Capturing is failure-isolated. A failed screenshot is logged and counted but
//! never turns into an error, so it cannot mask the outcome of the step that
//! asked for it.

use crate::driver::BrowserDriver;

/// Media type of every capture
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// A captured image tagged with a step name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Evidence name (e.g. `website_opened`)
    pub name: String,
    /// Media type
    pub media_type: String,
    /// Encoded image
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create a PNG attachment
    #[must_use]
    pub fn png(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: PNG_MEDIA_TYPE.to_string(),
            data,
        }
    }

    /// File extension matching the media type
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.media_type.as_str() {
            PNG_MEDIA_TYPE => "png",
            "image/jpeg" => "jpg",
            _ => "bin",
        }
    }
}

/// Attachments captured since the last [`EvidenceLog::take`]
#[derive(Debug, Default)]
pub struct EvidenceLog {
    attachments: Vec<Attachment>,
    failed: usize,
}

impl EvidenceLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attachment
    pub fn push(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Drain all attachments
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.attachments)
    }

    /// Pending attachments
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Number of captures that failed over the log's lifetime
    #[must_use]
    pub const fn failed_captures(&self) -> usize {
        self.failed
    }
}

/// Capture the active viewport into the log
///
/// Returns whether an attachment was recorded.
pub async fn capture<D: BrowserDriver + ?Sized>(
    driver: &D,
    log: &mut EvidenceLog,
    name: &str,
) -> bool {
    match driver.screenshot().await {
        Ok(data) => {
            tracing::debug!(evidence = name, bytes = data.len(), "captured evidence");
            log.push(Attachment::png(name, data));
            true
        }
        Err(e) => {
            tracing::warn!(evidence = name, error = %e, "evidence capture failed");
            log.failed += 1;
            false
        }
    }
}
