use eframe::egui::ColorImage;

use crate::export::snapshot::RasterSurface;

/// A cropped viewport screenshot is what the PNG exporter encodes.
impl RasterSurface for ColorImage {
    fn dimensions(&self) -> [usize; 2] {
        self.size
    }

    fn rgba_pixels(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| c.to_srgba_unmultiplied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::Color32;

    #[test]
    fn exposes_unmultiplied_rgba() {
        let image = ColorImage::new([2, 1], Color32::from_rgb(10, 20, 30));
        assert_eq!(image.dimensions(), [2, 1]);
        assert_eq!(image.rgba_pixels(), [10, 20, 30, 255, 10, 20, 30, 255]);
    }
}
