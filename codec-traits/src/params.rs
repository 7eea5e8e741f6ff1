//! Operation parameter types shared by the pipeline and the codecs.
//!
//! A parameter bundle is a plain value object. Two independently configurable
//! items never share one by reference; the pipeline copies bundles whenever a
//! per-item override forks from the global defaults.

use serde::{Deserialize, Serialize};

/// The conversion operation a codec performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Merge multiple PDF inputs into one document
    MergePdf,
    /// Re-encode a PDF to shrink it
    CompressPdf,
    /// Re-encode an image (format, quality, dimensions)
    ConvertImage,
    /// Lay plain text out as a PDF
    TextToPdf,
}

impl OperationKind {
    /// String form used in logs and event payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::MergePdf => "merge_pdf",
            OperationKind::CompressPdf => "compress_pdf",
            OperationKind::ConvertImage => "convert_image",
            OperationKind::TextToPdf => "text_to_pdf",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target output format for conversions that re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Pdf,
}

impl OutputFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// MIME type of the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

/// Operation-specific parameter bundle handed to a codec with each run.
///
/// Fields not meaningful for a given operation are ignored by its codec
/// (e.g. `dimensions` for a PDF merge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    /// The operation these parameters configure
    pub operation: OperationKind,
    /// Encoding quality, 0-100
    pub quality: u8,
    /// Target output format
    pub format: OutputFormat,
    /// Target dimensions (width, height), when resizing
    pub dimensions: Option<(u32, u32)>,
    /// Target output size budget in bytes, when compressing to a size
    pub target_size_bytes: Option<u64>,
}

impl OperationParams {
    /// Defaults for an operation: quality 80, format chosen by operation
    pub fn new(operation: OperationKind) -> Self {
        let format = match operation {
            OperationKind::ConvertImage => OutputFormat::Jpeg,
            _ => OutputFormat::Pdf,
        };
        Self {
            operation,
            quality: 80,
            format,
            dimensions: None,
            target_size_bytes: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn with_target_size(mut self, bytes: u64) -> Self {
        self.target_size_bytes = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_operation() {
        let pdf = OperationParams::new(OperationKind::CompressPdf);
        assert_eq!(pdf.format, OutputFormat::Pdf);
        assert_eq!(pdf.quality, 80);

        let image = OperationParams::new(OperationKind::ConvertImage);
        assert_eq!(image.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_quality_is_clamped() {
        let params = OperationParams::new(OperationKind::ConvertImage).with_quality(250);
        assert_eq!(params.quality, 100);
    }

    #[test]
    fn test_params_are_value_copies() {
        let a = OperationParams::new(OperationKind::ConvertImage);
        let mut b = a.clone();
        b.quality = 10;
        assert_eq!(a.quality, 80);
    }
}
