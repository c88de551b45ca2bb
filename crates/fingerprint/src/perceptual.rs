use image::{imageops::FilterType, DynamicImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
}

/// 8x8 average hash: grayscale, shrink to 8x8, threshold each pixel against
/// the mean, pack row-major into 64 bits. Re-encoded or lightly re-scaled
/// copies of the same receipt land within a few bits of each other.
pub fn average_hash(img: &DynamicImage) -> u64 {
    let small = img.resize_exact(8, 8, FilterType::Triangle).to_luma8();
    let sum: u32 = small.pixels().map(|p| u32::from(p[0])).sum();
    let mean = (sum / 64) as u8;

    let mut hash = 0u64;
    for p in small.pixels() {
        hash = (hash << 1) | u64::from(p[0] > mean);
    }
    hash
}

/// Decode image bytes (JPEG / PNG / WEBP / …) and hash them.
pub fn average_hash_bytes(data: &[u8]) -> Result<u64, FingerprintError> {
    let img = image::load_from_memory(data)?;
    Ok(average_hash(&img))
}

/// Bits differing between two perceptual hashes (0-64).
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
