//! External graphic loading and pixmap conversion.
//!
//! External graphics are rasterized into a tiny-skia [`Pixmap`] at the pixel
//! size they will be drawn at: SVG through resvg/usvg, everything else through
//! the `image` crate. Only `file:` URLs are read; fetching remote resources is
//! the caller's business.

use image::{Rgba, RgbaImage, imageops};
use resvg::tiny_skia::{IntSize, Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use tracing::debug;
use url::Url;

use crate::error::{IconError, Result};

/// Decoded external graphic, ready to be scaled.
pub(crate) enum LoadedGraphic {
    Svg(Tree),
    Raster(RgbaImage),
}

impl LoadedGraphic {
    /// Natural size in logical units.
    pub(crate) fn natural_size(&self) -> (f32, f32) {
        match self {
            Self::Svg(tree) => (tree.size().width(), tree.size().height()),
            Self::Raster(img) => (img.width() as f32, img.height() as f32),
        }
    }

    /// Rasterizes the graphic to exactly `width x height` pixels.
    pub(crate) fn rasterize(&self, width: u32, height: u32) -> Option<Pixmap> {
        match self {
            Self::Svg(tree) => {
                let (w, h) = self.natural_size();
                let mut pixmap = Pixmap::new(width, height)?;
                let transform = Transform::from_scale(width as f32 / w, height as f32 / h);
                resvg::render(tree, transform, &mut pixmap.as_mut());
                Some(pixmap)
            }
            Self::Raster(img) => {
                let resized = imageops::resize(img, width, height, imageops::FilterType::Triangle);
                rgba_image_to_pixmap(&resized)
            }
        }
    }
}

/// Loads the graphic behind `location`.
///
/// Returns `Ok(None)` for locations this crate does not read (anything other
/// than `file:`), and an error if a local file cannot be read or decoded.
pub(crate) fn load_external(location: &str, format: &str) -> Result<Option<LoadedGraphic>> {
    let failed = |reason: String| IconError::ExternalGraphic {
        location: location.to_string(),
        reason,
    };

    let url = Url::parse(location).map_err(|e| failed(e.to_string()))?;
    if url.scheme() != "file" {
        debug!(location, "skipping non-local external graphic");
        return Ok(None);
    }
    let path = url
        .to_file_path()
        .map_err(|_| failed("not a local path".to_string()))?;
    let bytes = std::fs::read(&path).map_err(|e| failed(e.to_string()))?;

    let is_svg = format.contains("svg")
        || path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        let tree = Tree::from_data(&bytes, &Options::default())
            .map_err(|e| failed(e.to_string()))?;
        Ok(Some(LoadedGraphic::Svg(tree)))
    } else {
        let img = image::load_from_memory(&bytes).map_err(|e| failed(e.to_string()))?;
        Ok(Some(LoadedGraphic::Raster(img.to_rgba8())))
    }
}

// ============================================================================
// Pixel Conversion
// ============================================================================

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
pub(crate) fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (i, pixel) in pixmap.pixels().iter().enumerate() {
        let x = i as u32 % width;
        let y = i as u32 / width;
        // tiny_skia uses premultiplied alpha, we need to unpremultiply
        let (r, g, b, a) = unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
        img.put_pixel(x, y, Rgba([r, g, b, a]));
    }

    img
}

/// Converts straight-alpha RGBA into a premultiplied pixmap.
pub(crate) fn rgba_image_to_pixmap(img: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(img.width(), img.height())?;
    let data = img
        .pixels()
        .flat_map(|p| {
            let [r, g, b, a] = p.0;
            let (r, g, b) = premultiply(r, g, b, a);
            [r, g, b, a]
        })
        .collect();
    Pixmap::from_vec(data, size)
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

fn premultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8) {
    let scale = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
    (scale(r), scale(g), scale(b))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SIMPLE_SVG: &str = concat!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">"#,
        r##"<circle cx="50" cy="50" r="40" fill="#ff0000"/>"##,
        "</svg>",
    );

    fn file_url(path: &std::path::Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[test]
    fn loads_local_svg() {
        let mut file = tempfile::Builder::new().suffix(".svg").tempfile().unwrap();
        file.write_all(SIMPLE_SVG.as_bytes()).unwrap();

        let graphic = load_external(&file_url(file.path()), "image/svg+xml")
            .unwrap()
            .expect("local svg should load");
        assert_eq!(graphic.natural_size(), (100.0, 100.0));

        let pixmap = graphic.rasterize(20, 20).unwrap();
        let img = pixmap_to_rgba_image(&pixmap);
        let center = img.get_pixel(10, 10);
        assert_eq!(center.0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn loads_local_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        RgbaImage::from_pixel(8, 4, Rgba([0, 0, 255, 255]))
            .save(&path)
            .unwrap();

        let graphic = load_external(&file_url(&path), "image/png").unwrap().unwrap();
        assert_eq!(graphic.natural_size(), (8.0, 4.0));
        let pixmap = graphic.rasterize(16, 8).unwrap();
        assert_eq!(pixmap.width(), 16);
        assert_eq!(pixmap.height(), 8);
    }

    #[test]
    fn remote_graphics_are_skipped() {
        let loaded = load_external("http://example.com/foo.png", "image/png").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let err = load_external(&file_url(&missing), "image/png");
        assert!(matches!(err, Err(IconError::ExternalGraphic { .. })));
    }

    #[test]
    fn premultiplied_round_trip() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 128]));
        let pixmap = rgba_image_to_pixmap(&img).unwrap();
        let back = pixmap_to_rgba_image(&pixmap);
        let [r, g, b, a] = back.get_pixel(1, 1).0;
        assert_eq!(a, 128);
        assert!(r.abs_diff(200) <= 2 && g.abs_diff(100) <= 2 && b.abs_diff(50) <= 2);
    }
}
