use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use super::{ensure_rows, ExportArtifact, ExportError, MediaKind};
use crate::data::results::ResultSetStore;

pub const FILENAME: &str = "results.png";

/// A rendered region handed over by the presentation layer.
///
/// The exporter never draws anything itself; it only encodes what the UI
/// captured of the visible table or cards.
pub trait RasterSurface {
    /// `[width, height]` in pixels.
    fn dimensions(&self) -> [usize; 2];

    /// Unmultiplied RGBA, row-major, four bytes per pixel.
    fn rgba_pixels(&self) -> Vec<u8>;
}

pub fn export_snapshot(
    store: &ResultSetStore,
    surface: &dyn RasterSurface,
) -> Result<ExportArtifact, ExportError> {
    ensure_rows(store)?;

    let [width, height] = surface.dimensions();
    let pixels = surface.rgba_pixels();
    let len = pixels.len();
    let image = RgbaImage::from_raw(width as u32, height as u32, pixels).ok_or(
        ExportError::SurfaceSize {
            width,
            height,
            len,
        },
    )?;

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    Ok(ExportArtifact {
        filename: FILENAME,
        media: MediaKind::Png,
        bytes,
    })
}
