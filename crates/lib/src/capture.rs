//! Full-screen capture encoded as PNG in memory.

use anyhow::{Context, Result};
use screenshots::image::ImageOutputFormat;
use screenshots::Screen;
use std::io::Cursor;

/// Source of screenshots for the report pipeline.
pub trait ScreenCapturer: Send + Sync {
    /// PNG bytes of the current display, or `None` when nothing could be captured.
    fn capture(&self) -> Option<Vec<u8>>;
}

/// Captures the primary display (first display when none is marked primary).
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayCapturer;

impl ScreenCapturer for DisplayCapturer {
    fn capture(&self) -> Option<Vec<u8>> {
        match capture_primary_png() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("capture: screenshot failed: {:#}", e);
                None
            }
        }
    }
}

fn capture_primary_png() -> Result<Vec<u8>> {
    let screens = Screen::all().context("listing displays")?;
    let screen = screens
        .iter()
        .find(|s| s.display_info.is_primary)
        .or_else(|| screens.first())
        .context("no display available")?;
    let image = screen.capture().context("capturing display")?;
    let (width, height) = (image.width(), image.height());

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageOutputFormat::Png)
        .context("encoding png")?;
    let bytes = png.into_inner();
    log::debug!(
        "capture: {}x{} display, {} png bytes",
        width,
        height,
        bytes.len()
    );
    Ok(bytes)
}
