use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use qrcode::render::svg;
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::constants;

/// Modules of blank border required around a QR symbol
const QUIET_ZONE_MODULES: u32 = 4;

/// The URL a product's QR code encodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrPayload {
    pub url: String,
}

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("QR encoding failed: {0}")]
    Encode(String),
}

/// Build the tracking URL for a product: `{origin}/track-product?id={productId}`.
///
/// Pure: the same `(product_id, origin)` always yields the same URL.
pub fn build(product_id: &str, origin: &str) -> Result<QrPayload, QrError> {
    let product_id = product_id.trim();
    if product_id.is_empty() {
        return Err(QrError::InvalidInput("Product ID is required".to_string()));
    }

    let origin = origin.trim().trim_end_matches('/');
    let parsed = Url::parse(origin)
        .map_err(|e| QrError::InvalidInput(format!("Invalid origin '{origin}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(QrError::InvalidInput(format!(
            "Origin '{origin}' must be an absolute http(s) URL"
        )));
    }

    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("id", product_id)
        .finish();

    Ok(QrPayload {
        url: format!("{origin}{}?{query}", constants::QR_TRACKING_PATH),
    })
}

/// Error correction level; roughly 7/15/25/30 % of the symbol may be damaged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl FromStr for ErrorCorrection {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l" | "low" => Ok(ErrorCorrection::L),
            "m" | "medium" => Ok(ErrorCorrection::M),
            "q" | "quartile" => Ok(ErrorCorrection::Q),
            "h" | "high" => Ok(ErrorCorrection::H),
            other => Err(QrError::InvalidInput(format!(
                "Unknown error correction level '{other}', expected L, M, Q or H"
            ))),
        }
    }
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    pub level: ErrorCorrection,
    /// Largest edge length in pixels, quiet zone included. The symbol is
    /// drawn at the biggest whole module size that fits.
    pub size: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            level: ErrorCorrection::default(),
            size: constants::DEFAULT_QR_SIZE_PX,
        }
    }
}

impl QrOptions {
    pub fn new(level: Option<&str>, size: Option<u32>) -> Result<Self, QrError> {
        let level = match level {
            Some(l) => l.parse()?,
            None => ErrorCorrection::default(),
        };
        let size = size.unwrap_or(constants::DEFAULT_QR_SIZE_PX);
        if !(constants::MIN_QR_SIZE_PX..=constants::MAX_QR_SIZE_PX).contains(&size) {
            return Err(QrError::InvalidInput(format!(
                "QR size must be between {} and {} pixels",
                constants::MIN_QR_SIZE_PX,
                constants::MAX_QR_SIZE_PX
            )));
        }
        Ok(Self { level, size })
    }
}

/// Encoded QR symbol ready to be rendered
pub struct QrImage {
    code: QrCode,
    size: u32,
}

impl std::fmt::Debug for QrImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrImage")
            .field("modules", &self.code.width())
            .field("size", &self.size)
            .finish()
    }
}

/// Encode arbitrary text (tracking URL, preset link, free text)
pub fn encode(data: &str, options: &QrOptions) -> Result<QrImage, QrError> {
    if data.trim().is_empty() {
        return Err(QrError::InvalidInput("QR data must not be empty".to_string()));
    }
    let code = QrCode::with_error_correction_level(data.as_bytes(), options.level.into())
        .map_err(|e| match e {
            qrcode::types::QrError::DataTooLong => QrError::InvalidInput(format!(
                "QR data is too long ({} bytes) for error correction level {:?}",
                data.len(),
                options.level
            )),
            other => QrError::Encode(other.to_string()),
        })?;

    let edge = code.width() as u32 + 2 * QUIET_ZONE_MODULES;
    if edge > options.size {
        return Err(QrError::InvalidInput(format!(
            "QR symbol needs at least {edge} pixels, requested size is {}",
            options.size
        )));
    }
    Ok(QrImage {
        code,
        size: options.size,
    })
}

impl QrImage {
    /// Modules per side, quiet zone excluded
    pub fn modules(&self) -> u32 {
        self.code.width() as u32
    }

    /// Pixels per module so the symbol fits in `size`; `encode` guarantees at least one
    fn module_px(&self) -> u32 {
        let total = self.modules() + 2 * QUIET_ZONE_MODULES;
        self.size / total
    }

    /// Edge length in pixels of both renderings
    pub fn pixel_size(&self) -> u32 {
        (self.modules() + 2 * QUIET_ZONE_MODULES) * self.module_px()
    }

    pub fn to_svg(&self) -> String {
        let px = self.pixel_size();
        self.code
            .render()
            .min_dimensions(px, px)
            .quiet_zone(true)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build()
    }

    /// Rasterize the module matrix to a grayscale PNG at native pixel size
    pub fn to_png(&self) -> Result<Vec<u8>, QrError> {
        let modules = self.modules();
        let scale = self.module_px();
        let dim = self.pixel_size();
        let colors = self.code.to_colors();

        let raster = GrayImage::from_fn(dim, dim, |x, y| {
            let mx = (x / scale) as i64 - QUIET_ZONE_MODULES as i64;
            let my = (y / scale) as i64 - QUIET_ZONE_MODULES as i64;
            let inside = mx >= 0 && my >= 0 && mx < modules as i64 && my < modules as i64;
            let dark = inside && colors[(my as usize) * modules as usize + mx as usize] == Color::Dark;
            Luma([if dark { 0 } else { 255 }])
        });

        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(raster)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(|e| QrError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_deterministic() {
        let first = build("PR-2024-001", "https://example.com").unwrap();
        let second = build("PR-2024-001", "https://example.com").unwrap();
        assert_eq!(first.url, "https://example.com/track-product?id=PR-2024-001");
        assert_eq!(first, second);
    }

    #[test]
    fn build_rejects_blank_product_id() {
        assert!(matches!(build("", "https://example.com"), Err(QrError::InvalidInput(_))));
        assert!(matches!(build("   ", "https://example.com"), Err(QrError::InvalidInput(_))));
    }

    #[test]
    fn build_encodes_query_and_trims_origin() {
        let payload = build("Coffee & Tea #1", "https://trace.example.com/").unwrap();
        assert_eq!(
            payload.url,
            "https://trace.example.com/track-product?id=Coffee+%26+Tea+%231"
        );
    }

    #[test]
    fn build_requires_absolute_origin() {
        assert!(build("PRD1", "example.com").is_err());
        assert!(build("PRD1", "ftp://example.com").is_err());
    }

    #[test]
    fn error_correction_parsing() {
        assert_eq!("h".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::H);
        assert_eq!("Quartile".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::Q);
        assert!("X".parse::<ErrorCorrection>().is_err());
    }

    #[test]
    fn options_validate_size() {
        assert!(QrOptions::new(None, Some(32)).is_err());
        assert!(QrOptions::new(None, Some(4096)).is_err());
        assert_eq!(QrOptions::new(Some("L"), Some(512)).unwrap().size, 512);
    }

    #[test]
    fn renders_png_and_svg() {
        let payload = build("PRD123456", "https://example.com").unwrap();
        let symbol = encode(&payload.url, &QrOptions::default()).unwrap();

        let png = symbol.to_png().unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), symbol.pixel_size());
        assert!(symbol.pixel_size() <= 256);

        let svg = symbol.to_svg();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn higher_correction_needs_more_modules() {
        let data = "https://example.com/track-product?id=PRD123456";
        let low = encode(data, &QrOptions::new(Some("L"), None).unwrap()).unwrap();
        let high = encode(data, &QrOptions::new(Some("H"), None).unwrap()).unwrap();
        assert!(high.modules() >= low.modules());
    }

    #[test]
    fn oversized_payload_is_invalid_input() {
        let data = "x".repeat(8000);
        assert!(matches!(encode(&data, &QrOptions::default()), Err(QrError::InvalidInput(_))));
    }

    #[test]
    fn dense_symbol_must_fit_requested_size() {
        let data = format!("https://example.com/track-product?id={}", "A".repeat(600));
        let small = QrOptions::new(Some("H"), Some(64)).unwrap();
        assert!(matches!(encode(&data, &small), Err(QrError::InvalidInput(_))));

        let large = QrOptions::new(Some("H"), Some(1024)).unwrap();
        let symbol = encode(&data, &large).unwrap();
        assert!(symbol.pixel_size() <= 1024);
    }

    #[test]
    fn empty_payload_is_invalid() {
        assert!(matches!(encode(" ", &QrOptions::default()), Err(QrError::InvalidInput(_))));
    }
}
