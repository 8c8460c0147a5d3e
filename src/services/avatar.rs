//! Avatar uploads: multipart intake, file checks and PNG rendering.

use actix_multipart::Multipart;
use futures::StreamExt;
use image::imageops::FilterType;
use image::ImageOutputFormat;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Cursor;

use crate::error::AppError;

/// Multipart field that carries the image.
pub const AVATAR_FIELD: &str = "avatar";
/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 1_000_000;
/// Stored avatars are exactly this many pixels wide and high.
pub const AVATAR_SIZE: u32 = 300;

pub const NOT_AN_IMAGE_MESSAGE: &str = "File must be an image!";
pub const TOO_LARGE_MESSAGE: &str = "File too large";
pub const MISSING_UPLOAD_MESSAGE: &str = "Please upload an image";

lazy_static! {
    static ref IMAGE_FILENAME: Regex =
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|bmp)$").expect("image filename pattern is valid");
}

/// Accepts only filenames with a jpg, jpeg, png, gif or bmp extension.
pub fn check_filename(filename: Option<&str>) -> Result<(), AppError> {
    match filename {
        Some(name) if IMAGE_FILENAME.is_match(name) => Ok(()),
        _ => Err(AppError::BadRequest(NOT_AN_IMAGE_MESSAGE.into())),
    }
}

/// Reads the `avatar` field of a multipart body, enforcing the name and size rules.
///
/// Other fields are drained and ignored.
pub async fn read_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    let mut upload = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(e.to_string()))?;

        if field.name() != AVATAR_FIELD {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            continue;
        }

        check_filename(field.content_disposition().get_filename())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest(TOO_LARGE_MESSAGE.into()));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(bytes);
    }

    upload.ok_or_else(|| AppError::BadRequest(MISSING_UPLOAD_MESSAGE.into()))
}

/// Decodes an uploaded image, crops and scales it to fill 300x300, and encodes it as PNG.
pub fn render_avatar(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let image = image::load_from_memory(bytes)
        .map_err(|_| AppError::BadRequest(NOT_AN_IMAGE_MESSAGE.into()))?;
    let resized = image.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);

    let mut png = Cursor::new(Vec::new());
    resized
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| AppError::Internal(format!("Failed to encode avatar: {}", e)))?;
    Ok(png.into_inner())
}
