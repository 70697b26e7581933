//! Image uploads to the platform's file storage.

use std::path::Path;

use super::require_viewer;
use crate::{
    errors::{DataError, ValidationError, ValidationResult},
    id::generate_token,
    platform::Platform,
};

pub const POSTS_BUCKET: &str = "posts";
pub const AVATARS_BUCKET: &str = "avatars";
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Lowercased extension of `file_name` if it is an accepted image type.
pub fn image_extension(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&extension.as_str()).then_some(extension)
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Check an image before upload and return its extension.
pub fn validate_image(file_name: &str, bytes: &[u8]) -> ValidationResult<String> {
    if bytes.is_empty() {
        return Err(ValidationError::single("image", "validation.required", "Please choose an image."));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::single(
            "image",
            "validation.size",
            "Image must be 10 MB or smaller.",
        ));
    }
    image_extension(file_name).ok_or_else(|| {
        ValidationError::single(
            "image",
            "validation.extension",
            "Image must be a JPG, PNG, GIF or WebP file.",
        )
    })
}

async fn upload_image<P: Platform>(
    platform: &P,
    bucket: &str,
    path: &str,
    extension: &str,
    bytes: &[u8],
    upsert: bool,
) -> Result<String, DataError> {
    let stored = platform
        .upload(bucket, path, bytes, content_type_for(extension), upsert)
        .await?;
    log::debug!("uploaded {} bytes to {}/{}", stored.size, stored.bucket, stored.path);
    Ok(platform.public_url(&stored.bucket, &stored.path))
}

/// Upload a new post image under a fresh name; returns its public URL.
pub async fn upload_post_image<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, DataError> {
    let viewer = require_viewer(viewer)?;
    let extension = validate_image(file_name, bytes)?;
    let path = format!("{viewer}/{}.{extension}", generate_token());
    upload_image(platform, POSTS_BUCKET, &path, &extension, bytes, false).await
}

/// Upload (or replace) the viewer's avatar; returns its public URL.
pub async fn upload_avatar<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, DataError> {
    let viewer = require_viewer(viewer)?;
    let extension = validate_image(file_name, bytes)?;
    let path = format!("{viewer}/avatar.{extension}");
    upload_image(platform, AVATARS_BUCKET, &path, &extension, bytes, true).await
}
