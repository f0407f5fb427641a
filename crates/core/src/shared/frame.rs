use std::time::SystemTime;

use image::ImageFormat;

/// A single captured snapshot: encoded image bytes as produced by the
/// frame source (JPEG, PNG, ...).
///
/// The session layer treats pixel data as opaque; only the HTTP clients
/// look at the format, to label the multipart upload.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    format: ImageFormat,
    index: u64,
    captured_at: SystemTime,
}

impl Frame {
    pub fn new(data: Vec<u8>, format: ImageFormat, index: u64) -> Self {
        Self {
            data,
            format,
            index,
            captured_at: SystemTime::now(),
        }
    }

    /// Builds a frame, sniffing the format from the leading bytes.
    ///
    /// Returns `None` when the bytes carry no recognizable image signature.
    pub fn from_encoded(data: Vec<u8>, index: u64) -> Option<Self> {
        let format = image::guess_format(&data).ok()?;
        Some(Self::new(data, format, index))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// File name used for the multipart upload, e.g. `frame-12.jpg`.
    pub fn file_name(&self) -> String {
        let ext = self
            .format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin");
        format!("frame-{}.{ext}", self.index)
    }
}
