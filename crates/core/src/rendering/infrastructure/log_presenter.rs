use std::collections::HashMap;

use crate::rendering::domain::overlay::Overlay;
use crate::rendering::domain::presenter::Presenter;
use crate::shared::frame::Frame;

/// Headless presenter that logs the status shown in each window.
///
/// Only logs when a window's status changes, so a steady scene does not
/// flood the log at camera frame rate.
#[derive(Default)]
pub struct LogPresenter {
    last_status: HashMap<String, &'static str>,
    shown: usize,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for LogPresenter {
    fn show(
        &mut self,
        window: &str,
        frame: &Frame,
        overlay: &Overlay,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.shown += 1;
        let previous = self.last_status.insert(window.to_string(), overlay.text);
        if previous != Some(overlay.text) {
            log::info!(
                "[{window}] frame {}: {} ({} person boxes)",
                frame.index(),
                overlay.text,
                overlay.rects.len()
            );
        } else {
            log::trace!("[{window}] frame {}: {}", frame.index(), overlay.text);
        }
        Ok(())
    }

    fn poll_key(&mut self, _delay_ms: i32) -> Result<Option<i32>, Box<dyn std::error::Error>> {
        Ok(None)
    }

    fn destroy_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!(
            "Closing {} window(s) after {} image(s)",
            self.last_status.len(),
            self.shown
        );
        self.last_status.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::presence_classifier::PresenceStatus;
    use crate::shared::detection_box::DetectionResult;

    #[test]
    fn test_show_tracks_status_per_window() {
        let mut presenter = LogPresenter::new();
        let frame = Frame::new(vec![0; 12], 2, 2, 3, 0);
        let overlay = Overlay::build(PresenceStatus::NoHuman, &DetectionResult::default());

        presenter.show("Left", &frame, &overlay).unwrap();
        presenter.show("Right", &frame, &overlay).unwrap();
        presenter.show("Left", &frame, &overlay).unwrap();

        assert_eq!(presenter.shown, 3);
        assert_eq!(presenter.last_status.get("Left"), Some(&"NO HUMAN"));
        assert_eq!(presenter.poll_key(1).unwrap(), None);

        presenter.destroy_all().unwrap();
        assert!(presenter.last_status.is_empty());
    }
}
