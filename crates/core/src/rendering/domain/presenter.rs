use crate::rendering::domain::overlay::Overlay;
use crate::shared::frame::Frame;

/// Shows annotated camera images and reports key presses.
pub trait Presenter {
    /// Draws `overlay` on a copy of `frame` at full resolution, downscales
    /// it to the display size and shows it in the named window.
    fn show(
        &mut self,
        window: &str,
        frame: &Frame,
        overlay: &Overlay,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Waits up to `delay_ms` for a key press. `None` when nothing was pressed.
    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<i32>, Box<dyn std::error::Error>>;

    /// Tears down every window this presenter created.
    fn destroy_all(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
