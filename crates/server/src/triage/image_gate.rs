use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use shared_types::{AppError, AppErrorKind, TriageSettings};

/// Dimensions and container format of an upload that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl ImageInfo {
    /// Canonical file extension for the detected format.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageGateError {
    #[error("Unreadable image: {0}")]
    Unreadable(String),
    #[error("Invalid image: resolution {width}x{height} is below the minimum {min_width}x{min_height}")]
    TooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
}

impl ImageGateError {
    pub fn kind(&self) -> AppErrorKind {
        match self {
            Self::Unreadable(_) => AppErrorKind::UnreadableImage,
            Self::TooSmall { .. } => AppErrorKind::InvalidImage,
        }
    }
}

impl From<ImageGateError> for AppError {
    fn from(err: ImageGateError) -> Self {
        match err {
            ImageGateError::Unreadable(_) => AppError::unreadable_image(err.to_string()),
            ImageGateError::TooSmall { .. } => AppError::invalid_image(err.to_string()),
        }
    }
}

/// Decode the image header and reject uploads that are not images or that
/// fall below the minimum resolution in either dimension.
pub fn inspect(bytes: &[u8], settings: &TriageSettings) -> Result<ImageInfo, ImageGateError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageGateError::Unreadable(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| ImageGateError::Unreadable("unrecognized image format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImageGateError::Unreadable(e.to_string()))?;

    if width < settings.min_width || height < settings.min_height {
        return Err(ImageGateError::TooSmall {
            width,
            height,
            min_width: settings.min_width,
            min_height: settings.min_height,
        });
    }

    Ok(ImageInfo {
        width,
        height,
        format,
    })
}
