use std::path::{Path, PathBuf};

use half::f16;

use crate::error::{Result, TracerError};

/// `{dir}/Frame_{frame:05}.png`
pub fn frame_capture_path(dir: &Path, frame: u32) -> PathBuf {
    dir.join(format!("Frame_{:05}.png", frame))
}

/// Linear [0, inf) to 8-bit sRGB
fn encode_srgb(linear: f32) -> u8 {
    let c = if linear.is_nan() { 0.0 } else { linear.clamp(0.0, 1.0) };
    let srgb = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0 + 0.5) as u8
}

/// Convert tightly packed RGBA16F texels into RGBA8 sRGB pixels
pub fn half_rgba_to_srgb8(texels: &[f16]) -> Vec<u8> {
    texels
        .chunks_exact(4)
        .flat_map(|px| {
            [
                encode_srgb(px[0].to_f32()),
                encode_srgb(px[1].to_f32()),
                encode_srgb(px[2].to_f32()),
                255,
            ]
        })
        .collect()
}

/// Write RGBA16F texels as a PNG, creating the parent directory if needed
pub fn write_png(path: &Path, width: u32, height: u32, texels: &[f16]) -> Result<()> {
    let expected = (width as usize) * (height as usize) * 4;
    if texels.len() != expected {
        return Err(TracerError::Capture(format!(
            "expected {} texel channels for {}x{}, got {}",
            expected,
            width,
            height,
            texels.len()
        )));
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            log::info!("Creating capture directory {:?}", dir);
            std::fs::create_dir_all(dir)?;
        }
    }

    let pixels = half_rgba_to_srgb8(texels);
    image::save_buffer(path, &pixels, width, height, image::ExtendedColorType::Rgba8)?;
    log::info!("Captured {:?}", path);
    Ok(())
}

/// Strip per-row padding from a texture readback
pub fn depad_rows(data: &[u8], tight_bytes_per_row: usize, padded_bytes_per_row: usize, rows: usize) -> Vec<u8> {
    let mut tight = vec![0u8; tight_bytes_per_row * rows];
    for row in 0..rows {
        let src = row * padded_bytes_per_row;
        let dst = row * tight_bytes_per_row;
        tight[dst..dst + tight_bytes_per_row].copy_from_slice(&data[src..src + tight_bytes_per_row]);
    }
    tight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_paths_are_zero_padded() {
        let dir = Path::new("Render");
        assert_eq!(frame_capture_path(dir, 0), PathBuf::from("Render/Frame_00000.png"));
        assert_eq!(frame_capture_path(dir, 42), PathBuf::from("Render/Frame_00042.png"));
        assert_eq!(frame_capture_path(dir, 123456), PathBuf::from("Render/Frame_123456.png"));
    }

    #[test]
    fn srgb_encoding_clamps_and_maps_endpoints() {
        assert_eq!(encode_srgb(0.0), 0);
        assert_eq!(encode_srgb(1.0), 255);
        assert_eq!(encode_srgb(7.5), 255);
        assert_eq!(encode_srgb(-1.0), 0);
        assert_eq!(encode_srgb(f32::NAN), 0);
        // Mid grey is brightened by the transfer curve
        assert!(encode_srgb(0.5) > 128);
    }

    #[test]
    fn depad_keeps_only_tight_rows() {
        let data = [1, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(depad_rows(&data, 2, 4, 2), vec![1, 2, 3, 4]);
    }

    #[test]
    fn write_png_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = frame_capture_path(&dir.path().join("Render"), 1);
        let texels: Vec<f16> = [0.0f32, 0.5, 1.0, 1.0]
            .iter()
            .cycle()
            .take(2 * 2 * 4)
            .map(|&v| f16::from_f32(v))
            .collect();

        write_png(&path, 2, 2, &texels).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
    }

    #[test]
    fn write_png_rejects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        let texels = vec![f16::ZERO; 3];
        assert!(matches!(write_png(&path, 2, 2, &texels), Err(TracerError::Capture(_))));
    }
}
