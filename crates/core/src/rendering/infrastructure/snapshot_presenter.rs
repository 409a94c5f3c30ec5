use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::rendering::domain::overlay::{Overlay, OverlayRect};
use crate::rendering::domain::presenter::Presenter;
use crate::shared::frame::Frame;

/// Edge length of the status swatch drawn when no font is loaded.
const SWATCH_SIZE: u32 = 24;

/// Glyph height in pixels at font scale 1.
const TEXT_PX_PER_SCALE: f32 = 30.0;

/// Headless presenter that writes every annotated image as a PNG.
///
/// Files are named `<window>_<NNNNNN>.png` after the frame's loop iteration.
/// No font file ships with the crate. The status text is rasterized with a
/// font loaded through [`SnapshotPresenter::with_font`]; without one, a
/// filled swatch in the status color stands in for it.
pub struct SnapshotPresenter {
    dir: PathBuf,
    display_size: (u32, u32),
    written: usize,
    font: Option<FontVec>,
}

impl SnapshotPresenter {
    pub fn new(dir: &Path, display_size: (u32, u32)) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            display_size,
            written: 0,
            font: None,
        })
    }

    /// Loads a TrueType/OpenType font for the status text.
    pub fn with_font(mut self, path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| format!("invalid font {}: {e}", path.display()))?;
        log::debug!("Loaded status font {}", path.display());
        self.font = Some(font);
        Ok(self)
    }

    fn path_for(&self, window: &str, index: usize) -> PathBuf {
        self.dir.join(format!("{window}_{index:06}.png"))
    }
}

/// Rasterizes the overlay onto a full-resolution RGB image.
pub fn render_overlay(
    frame: &Frame,
    overlay: &Overlay,
    font: Option<&FontVec>,
) -> Result<RgbImage, String> {
    if frame.channels() != 3 {
        return Err(format!(
            "expected a 3-channel frame, got {} channels",
            frame.channels()
        ));
    }
    let mut img = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;

    let color = Rgb(overlay.color.rgb());
    for rect in &overlay.rects {
        draw_outline(&mut img, rect, overlay.thickness, color);
    }

    // text_origin is the baseline-left corner, as OpenCV's put_text takes it
    let (x, y) = overlay.text_origin;
    match font {
        Some(font) => {
            let scale = PxScale::from(TEXT_PX_PER_SCALE * overlay.font_scale as f32);
            let top = (y - scale.y as i32).max(0);
            draw_text_mut(&mut img, color, x, top, scale, font, overlay.text);
        }
        None => {
            let swatch_y = (y - SWATCH_SIZE as i32).max(0);
            draw_filled_rect_mut(
                &mut img,
                Rect::at(x, swatch_y).of_size(SWATCH_SIZE, SWATCH_SIZE),
                color,
            );
        }
    }
    Ok(img)
}

/// Outline `thickness` pixels wide, growing inward from the box edge.
fn draw_outline(img: &mut RgbImage, rect: &OverlayRect, thickness: i32, color: Rgb<u8>) {
    for inset in 0..thickness.max(1) {
        let w = rect.width() - 2 * inset;
        let h = rect.height() - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            img,
            Rect::at(rect.x1 + inset, rect.y1 + inset).of_size(w as u32, h as u32),
            color,
        );
    }
}

impl Presenter for SnapshotPresenter {
    fn show(
        &mut self,
        window: &str,
        frame: &Frame,
        overlay: &Overlay,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let img = render_overlay(frame, overlay, self.font.as_ref())?;
        let (w, h) = self.display_size;
        let img = imageops::resize(&img, w, h, imageops::FilterType::Triangle);

        let path = self.path_for(window, frame.index());
        img.save(&path)?;
        self.written += 1;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn poll_key(&mut self, _delay_ms: i32) -> Result<Option<i32>, Box<dyn std::error::Error>> {
        Ok(None)
    }

    fn destroy_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::info!(
            "Wrote {} annotated images to {}",
            self.written,
            self.dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::presence_classifier::PresenceStatus;
    use crate::rendering::domain::overlay::Color;
    use crate::shared::detection_box::{DetectionBox, DetectionResult};

    fn gray_frame(width: u32, height: u32, index: usize) -> Frame {
        Frame::new(vec![128; (width * height * 3) as usize], width, height, 3, index)
    }

    fn person_overlay(status: PresenceStatus) -> Overlay {
        let result = DetectionResult::new(vec![DetectionBox::new(0, 0.9, (60.0, 60.0, 100.0, 120.0))]);
        Overlay::build(status, &result)
    }

    #[test]
    fn test_render_draws_two_pixel_outline_in_status_color() {
        let frame = gray_frame(160, 160, 0);
        let img = render_overlay(&frame, &person_overlay(PresenceStatus::NoHuman), None).unwrap();
        let red = Rgb(Color::RED.rgb());

        assert_eq!(*img.get_pixel(60, 80), red);
        assert_eq!(*img.get_pixel(61, 80), red);
        assert_eq!(*img.get_pixel(62, 80), Rgb([128, 128, 128]));
        assert_eq!(*img.get_pixel(80, 60), red);
        assert_eq!(*img.get_pixel(80, 90), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_render_draws_status_swatch() {
        let frame = gray_frame(100, 100, 0);
        let img = render_overlay(&frame, &person_overlay(PresenceStatus::HumanAvailable), None).unwrap();
        assert_eq!(*img.get_pixel(35, 10), Rgb(Color::GREEN.rgb()));
        assert_eq!(*img.get_pixel(35, 40), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_render_ignores_degenerate_and_offscreen_rects() {
        let frame = gray_frame(50, 50, 0);
        let result = DetectionResult::new(vec![
            DetectionBox::new(0, 0.9, (10.0, 10.0, 10.0, 30.0)),
            DetectionBox::new(0, 0.9, (40.0, 40.0, 90.0, 90.0)),
        ]);
        let overlay = Overlay::build(PresenceStatus::NoHuman, &result);
        let img = render_overlay(&frame, &overlay, None).unwrap();
        assert_eq!(*img.get_pixel(40, 45), Rgb(Color::RED.rgb()));
    }

    #[test]
    fn test_render_rejects_non_rgb_frame() {
        let frame = Frame::new(vec![0; 16], 4, 4, 1, 0);
        let overlay = person_overlay(PresenceStatus::NoHuman);
        assert!(render_overlay(&frame, &overlay, None).is_err());
    }

    #[test]
    fn test_show_writes_resized_png_named_after_window_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = SnapshotPresenter::new(dir.path(), (96, 60)).unwrap();
        let frame = gray_frame(320, 200, 7);

        presenter
            .show("Left", &frame, &person_overlay(PresenceStatus::NoHuman))
            .unwrap();

        let path = dir.path().join("Left_000007.png");
        assert!(path.exists());
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (96, 60));
        assert_eq!(presenter.written, 1);
        assert_eq!(presenter.poll_key(1).unwrap(), None);
        presenter.destroy_all().unwrap();
    }

    #[test]
    fn test_with_font_rejects_non_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let font_path = dir.path().join("status.ttf");
        std::fs::write(&font_path, b"not a font").unwrap();

        let presenter = SnapshotPresenter::new(dir.path(), (10, 10)).unwrap();
        let err = presenter.with_font(&font_path).err().unwrap();
        assert!(err.to_string().contains("invalid font"));
    }

    #[test]
    fn test_with_font_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let presenter = SnapshotPresenter::new(dir.path(), (10, 10)).unwrap();
        assert!(presenter.with_font(&dir.path().join("missing.ttf")).is_err());
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        SnapshotPresenter::new(&nested, (10, 10)).unwrap();
        assert!(nested.is_dir());
    }
}
