//! On-screen display through OpenCV HighGUI windows.
use std::collections::HashSet;

use opencv::core::{self, Mat, Point, Rect, Scalar, Size};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::rendering::domain::overlay::{Color, Overlay};
use crate::rendering::domain::presenter::Presenter;
use crate::shared::frame::Frame;

/// Shows each camera in its own HighGUI window, scaled to the display size.
pub struct HighguiPresenter {
    display_size: Size,
    windows: HashSet<String>,
}

impl HighguiPresenter {
    pub fn new(display_size: (u32, u32)) -> Self {
        Self {
            display_size: Size::new(display_size.0 as i32, display_size.1 as i32),
            windows: HashSet::new(),
        }
    }

    fn ensure_window(&mut self, window: &str) -> opencv::Result<()> {
        if !self.windows.contains(window) {
            highgui::named_window(window, highgui::WINDOW_AUTOSIZE)?;
            self.windows.insert(window.to_string());
        }
        Ok(())
    }
}

fn to_scalar(color: Color) -> Scalar {
    Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
}

/// Copies an RGB frame into a BGR `Mat`.
fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(&frame.to_bgr());
    Ok(mat)
}

fn draw_overlay(mat: &mut Mat, overlay: &Overlay) -> opencv::Result<()> {
    let color = to_scalar(overlay.color);
    let (x, y) = overlay.text_origin;
    imgproc::put_text(
        mat,
        overlay.text,
        Point::new(x, y),
        imgproc::FONT_HERSHEY_SIMPLEX,
        overlay.font_scale,
        color,
        overlay.thickness,
        imgproc::LINE_8,
        false,
    )?;
    for r in &overlay.rects {
        imgproc::rectangle(
            mat,
            Rect::new(r.x1, r.y1, r.width(), r.height()),
            color,
            overlay.thickness,
            imgproc::LINE_8,
            0,
        )?;
    }
    Ok(())
}

impl Presenter for HighguiPresenter {
    fn show(
        &mut self,
        window: &str,
        frame: &Frame,
        overlay: &Overlay,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("expected a 3-channel frame, got {}", frame.channels()).into());
        }
        let mut mat = frame_to_mat(frame)?;
        draw_overlay(&mut mat, overlay)?;

        let mut scaled = Mat::default();
        imgproc::resize(
            &mat,
            &mut scaled,
            self.display_size,
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        self.ensure_window(window)?;
        highgui::imshow(window, &scaled)?;
        Ok(())
    }

    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<i32>, Box<dyn std::error::Error>> {
        let key = highgui::wait_key(delay_ms)?;
        Ok((key >= 0).then_some(key & 0xFF))
    }

    fn destroy_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.windows.is_empty() {
            highgui::destroy_all_windows()?;
            self.windows.clear();
        }
        Ok(())
    }
}
