//! Primary display capture for the takeScreenshot operation

use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use screenshots::Screen;
use std::io::Cursor;

use crate::error::{HostError, HostResult};
use crate::traits::{ScreenCapture, Screenshot};
use shared::{DisplayBounds, ScreenshotData};

pub struct ScreenshotsCapture {
    max_width: u32,
    max_height: u32,
}

impl ScreenshotsCapture {
    pub fn new() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
        }
    }
}

impl Default for ScreenshotsCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenCapture for ScreenshotsCapture {
    fn capture_primary(&self) -> HostResult<Screenshot> {
        let screens = Screen::all().map_err(HostError::capture)?;
        let screen = screens
            .iter()
            .find(|screen| screen.display_info.is_primary)
            .or_else(|| screens.first())
            .ok_or_else(|| HostError::capture("no display found"))?;

        let frame = screen.capture().map_err(HostError::capture)?;
        let png = encode_png(fit_within(frame, self.max_width, self.max_height))?;

        Ok(Screenshot {
            png,
            display: DisplayBounds {
                width: screen.display_info.width,
                height: screen.display_info.height,
            },
        })
    }
}

/// Scale down (never up) so the frame fits, keeping the aspect ratio
fn fit_within(frame: RgbaImage, max_width: u32, max_height: u32) -> DynamicImage {
    let image = DynamicImage::ImageRgba8(frame);
    if image.width() <= max_width && image.height() <= max_height {
        image
    } else {
        image.resize(max_width, max_height, FilterType::Triangle)
    }
}

fn encode_png(image: DynamicImage) -> HostResult<Vec<u8>> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(HostError::capture)?;
    Ok(png)
}

/// Shape a capture into the control-channel response
pub fn screenshot_response(shot: &Screenshot) -> ScreenshotData {
    ScreenshotData {
        success: true,
        data: general_purpose::STANDARD.encode(&shot.png),
        size: shot.png.len(),
        display: shot.display,
    }
}
