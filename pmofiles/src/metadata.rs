//! Album tag and cover art extraction using lofty.
//!
//! Both entry points are infallible from the caller's point of view: any
//! parsing or decoding failure degrades to an empty album name or to the
//! placeholder cover. Failures are logged at `debug` level only.
//!
//! Everything here is blocking I/O and CPU work; async callers wrap it in
//! `tokio::task::spawn_blocking`.

use crate::path::ResolvedPath;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lofty::{config::ParseOptions, picture::PictureType, prelude::*, probe::Probe};
use once_cell::sync::Lazy;
use std::io::Cursor;
use tracing::{debug, error};

/// Side of the square placeholder, in pixels
pub const PLACEHOLDER_SIZE: u32 = 200;
const PLACEHOLDER_GRAY: [u8; 3] = [128, 128, 128];

pub const COVER_CONTENT_TYPE: &str = "image/jpeg";

static PLACEHOLDER: Lazy<Bytes> = Lazy::new(|| match render_placeholder() {
    Ok(bytes) => Bytes::from(bytes),
    Err(e) => {
        error!("Unable to encode the placeholder cover: {}", e);
        Bytes::new()
    }
});

/// Local failures, never surfaced past this module.
#[derive(thiserror::Error, Debug)]
enum MetadataError {
    #[error("tag read failed: {0}")]
    Tag(#[from] lofty::error::LoftyError),
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("no embedded picture")]
    NoPicture,
}

/// A JPEG cover, either extracted from the file or the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub bytes: Bytes,
    pub is_placeholder: bool,
}

impl CoverImage {
    pub fn placeholder() -> Self {
        Self {
            bytes: placeholder_cover(),
            is_placeholder: true,
        }
    }

    pub fn content_type(&self) -> &'static str {
        COVER_CONTENT_TYPE
    }
}

/// Album name of an audio file, `""` when missing or unreadable.
pub fn album(file: &ResolvedPath) -> String {
    match read_album(file) {
        Ok(Some(album)) => album,
        Ok(None) => String::new(),
        Err(e) => {
            debug!(path = %file, error = %e, "No album tag");
            String::new()
        }
    }
}

fn read_album(file: &ResolvedPath) -> Result<Option<String>, MetadataError> {
    let tagged_file = Probe::open(file.as_path())?
        .options(ParseOptions::new())
        .read()?;

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
    Ok(tag
        .and_then(|t| t.album())
        .map(|album| album.trim().to_string()))
}

/// Embedded cover art re-encoded as JPEG, or the placeholder.
pub fn cover(file: &ResolvedPath) -> CoverImage {
    match read_cover(file) {
        Ok(bytes) => CoverImage {
            bytes: Bytes::from(bytes),
            is_placeholder: false,
        },
        Err(e) => {
            debug!(path = %file, error = %e, "Using placeholder cover");
            CoverImage::placeholder()
        }
    }
}

fn read_cover(file: &ResolvedPath) -> Result<Vec<u8>, MetadataError> {
    let tagged_file = Probe::open(file.as_path())?
        .options(ParseOptions::new())
        .read()?;

    // Front cover wins, whatever tag it is stored in; otherwise the first picture
    let pictures: Vec<_> = tagged_file
        .tags()
        .iter()
        .flat_map(|tag| tag.pictures())
        .collect();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .ok_or(MetadataError::NoPicture)?;

    let img = image::load_from_memory(picture.data())?;
    encode_jpeg(&img)
}

/// The 200x200 flat gray JPEG returned when no cover is available.
///
/// Encoded once per process; every call returns the same bytes.
pub fn placeholder_cover() -> Bytes {
    PLACEHOLDER.clone()
}

fn render_placeholder() -> Result<Vec<u8>, MetadataError> {
    let img = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, Rgb(PLACEHOLDER_GRAY));
    encode_jpeg(&DynamicImage::ImageRgb8(img))
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, MetadataError> {
    // The JPEG encoder rejects alpha channels
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
    Ok(buf)
}
