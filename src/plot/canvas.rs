//! Minimal RGB raster canvas for in-process simulation units.

use png::{BitDepth, ColorType, Encoder};
use thiserror::Error;

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const BLACK: Rgb = [0, 0, 0];
pub const BLUE: Rgb = [31, 119, 180];
pub const ORANGE: Rgb = [255, 127, 14];

/// Resolution at which one canvas unit maps to one output pixel.
pub const BASE_DPI: u32 = 100;
/// Highest resolution a figure is rasterized at.
pub const MAX_DPI: u32 = 1200;

/// Padding kept around the drawn area when cropping to the tight bounding box.
const TIGHT_PAD: u32 = 4;

/// Inset between the canvas edge and the plot frame drawn by `plot_series`.
const PLOT_MARGIN: u32 = 12;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("canvas has zero area")]
    ZeroArea,

    #[error(transparent)]
    Encode(#[from] png::EncodingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    background: Rgb,
    pixels: Vec<Rgb>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: WHITE,
            pixels: vec![WHITE; width as usize * height as usize],
        }
    }

    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = color;
        self.pixels.iter_mut().for_each(|p| *p = color);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgb) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = color;
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgb) {
        for dy in 0..h as i64 {
            for dx in 0..w as i64 {
                self.set_pixel(x + dx, y + dy, color);
            }
        }
    }

    /// Bresenham line, endpoints inclusive.
    pub fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled disc marker.
    pub fn point(&mut self, cx: i64, cy: i64, radius: u32, color: Rgb) {
        let r = radius as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Draw a framed, auto-scaled polyline of `(x, y)` data points.
    ///
    /// Non-finite points break the line instead of being drawn.
    pub fn plot_series(&mut self, points: &[(f64, f64)], color: Rgb) {
        if self.width <= 2 * PLOT_MARGIN || self.height <= 2 * PLOT_MARGIN {
            return;
        }
        let finite = points.iter().filter(|(x, y)| x.is_finite() && y.is_finite());
        let (mut xmin, mut xmax, mut ymin, mut ymax) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in finite {
            xmin = xmin.min(x);
            xmax = xmax.max(x);
            ymin = ymin.min(y);
            ymax = ymax.max(y);
        }
        if !xmin.is_finite() {
            return;
        }
        if xmax == xmin {
            xmin -= 0.5;
            xmax += 0.5;
        }
        if ymax == ymin {
            ymin -= 0.5;
            ymax += 0.5;
        }

        let left = PLOT_MARGIN as i64;
        let top = PLOT_MARGIN as i64;
        let right = (self.width - PLOT_MARGIN - 1) as i64;
        let bottom = (self.height - PLOT_MARGIN - 1) as i64;
        self.line(left, top, right, top, BLACK);
        self.line(right, top, right, bottom, BLACK);
        self.line(right, bottom, left, bottom, BLACK);
        self.line(left, bottom, left, top, BLACK);

        let span_x = (right - left - 2) as f64;
        let span_y = (bottom - top - 2) as f64;
        let to_px = |x: f64, y: f64| -> (i64, i64) {
            let px = left + 1 + ((x - xmin) / (xmax - xmin) * span_x).round() as i64;
            let py = bottom - 1 - ((y - ymin) / (ymax - ymin) * span_y).round() as i64;
            (px, py)
        };

        let mut prev: Option<(i64, i64)> = None;
        for &(x, y) in points {
            if !(x.is_finite() && y.is_finite()) {
                prev = None;
                continue;
            }
            let p = to_px(x, y);
            match prev {
                Some(q) => self.line(q.0, q.1, p.0, p.1, color),
                None => self.set_pixel(p.0, p.1, color),
            }
            prev = Some(p);
        }
    }

    /// Smallest rectangle `(x, y, w, h)` covering every non-background pixel.
    pub fn tight_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
        let mut any = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixels[(y * self.width + x) as usize] != self.background {
                    any = true;
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x);
                    y1 = y1.max(y);
                }
            }
        }
        any.then(|| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    /// Encode as PNG, cropped to the tight bounding box and scaled to `dpi`.
    ///
    /// A canvas with nothing drawn on it is encoded whole.
    pub fn rasterize(&self, dpi: u32) -> Result<Vec<u8>, RasterError> {
        if self.is_empty() {
            return Err(RasterError::ZeroArea);
        }
        let (cx, cy, cw, ch) = match self.tight_bounds() {
            Some((x, y, w, h)) => {
                let x0 = x.saturating_sub(TIGHT_PAD);
                let y0 = y.saturating_sub(TIGHT_PAD);
                let x1 = (x + w + TIGHT_PAD).min(self.width);
                let y1 = (y + h + TIGHT_PAD).min(self.height);
                (x0, y0, x1 - x0, y1 - y0)
            }
            None => (0, 0, self.width, self.height),
        };

        let scale = dpi.clamp(1, MAX_DPI) as f64 / BASE_DPI as f64;
        let out_w = ((cw as f64 * scale).round() as u32).max(1);
        let out_h = ((ch as f64 * scale).round() as u32).max(1);

        let mut data = Vec::with_capacity(out_w as usize * out_h as usize * 3);
        for oy in 0..out_h {
            let sy = cy + ((oy as f64 / scale) as u32).min(ch - 1);
            for ox in 0..out_w {
                let sx = cx + ((ox as f64 / scale) as u32).min(cw - 1);
                data.extend_from_slice(&self.pixels[(sy * self.width + sx) as usize]);
            }
        }

        let mut out = Vec::new();
        {
            let mut encoder = Encoder::new(&mut out, out_w, out_h);
            encoder.set_color(ColorType::Rgb);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&data)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Width and height from a PNG's IHDR chunk.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let w = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let h = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Some((w, h))
}
