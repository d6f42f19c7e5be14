use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use tracing::{info, warn};

use crate::{error::AppError, storage::StorageClient, users::DEFAULT_IMAGE};

pub const PROFILE_PICS_PREFIX: &str = "profile_pics";
const THUMBNAIL_SIZE: u32 = 100;

pub fn profile_key(image_file: &str) -> String {
    format!("{PROFILE_PICS_PREFIX}/{image_file}")
}

fn format_from_filename(filename: &str) -> Option<(ImageFormat, &'static str, &'static str)> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" => Some((ImageFormat::Jpeg, ".jpg", "image/jpeg")),
        "jpeg" => Some((ImageFormat::Jpeg, ".jpeg", "image/jpeg")),
        "png" => Some((ImageFormat::Png, ".png", "image/png")),
        _ => None,
    }
}

/// Shrinks to fit inside 100x100, keeping the aspect ratio.
fn thumbnail(body: &[u8], format: ImageFormat) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory_with_format(body, format).context("decode image")?;
    let thumb = img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let thumb = match format {
        // jpeg has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(thumb.to_rgb8()),
        _ => thumb,
    };
    let mut out = Vec::new();
    thumb
        .write_to(&mut Cursor::new(&mut out), format)
        .context("encode thumbnail")?;
    Ok(out)
}

/// Stores a resized copy of an uploaded picture under a random name and
/// returns that name for `users.image_file`.
pub async fn save_profile_picture(
    storage: &dyn StorageClient,
    body: Bytes,
    original_filename: &str,
) -> Result<String, AppError> {
    let (format, ext, content_type) = format_from_filename(original_filename)
        .ok_or_else(|| AppError::validation("Profile picture must be a jpg, jpeg or png file"))?;

    // decoding and resizing are CPU bound
    let resized = tokio::task::spawn_blocking(move || thumbnail(&body, format))
        .await
        .context("thumbnail task")?
        .map_err(|_| AppError::validation("Profile picture could not be read as an image"))?;

    let image_file = format!("{:016x}{}", rand::random::<u64>(), ext);
    let key = profile_key(&image_file);
    storage
        .put_object(&key, Bytes::from(resized), content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    info!(%key, "profile picture stored");
    Ok(image_file)
}

/// Best effort; the default picture is shared and never removed.
pub async fn remove_profile_picture(storage: &dyn StorageClient, image_file: &str) {
    if image_file == DEFAULT_IMAGE {
        return;
    }
    if let Err(e) = storage.delete_object(&profile_key(image_file)).await {
        warn!(error = %e, %image_file, "failed to remove old profile picture");
    }
}

pub async fn profile_image_url(storage: &dyn StorageClient, image_file: &str) -> anyhow::Result<String> {
    storage
        .object_url(&profile_key(image_file))
        .await
        .with_context(|| format!("url for {}", image_file))
}
