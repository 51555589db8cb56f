use image::{DynamicImage, GenericImageView};

use crate::models::report::{ExportError, PageLayout};

/// One page worth of a tall bitmap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitmapSlice {
    pub page: usize,
    /// First source row of the slice
    pub source_y: u32,
    pub source_height: u32,
    /// Height on the page once scaled to the page width
    pub placed_height: f32,
}

/// Cut a `width_px` x `height_px` image into page-height bands.
///
/// The image is scaled to the full page width; each page shows the next
/// `page_height` of scaled height. The last page holds the remainder and
/// there is never a trailing empty page.
pub fn slice_plan(
    width_px: u32,
    height_px: u32,
    page_width: f32,
    page_height: f32,
) -> Result<Vec<BitmapSlice>, ExportError> {
    if width_px == 0 || height_px == 0 {
        return Err(ExportError::InvalidInput("Rendered view is empty".to_string()));
    }
    if page_width <= 0.0 || page_height <= 0.0 {
        return Err(ExportError::InvalidInput(format!(
            "Invalid page size {page_width}x{page_height}"
        )));
    }

    let scale = page_width / width_px as f32;
    let rows_per_page = ((page_height / scale).floor() as u32).max(1);

    let mut slices = Vec::new();
    let mut source_y = 0;
    while source_y < height_px {
        let source_height = rows_per_page.min(height_px - source_y);
        slices.push(BitmapSlice {
            page: slices.len() + 1,
            source_y,
            source_height,
            placed_height: source_height as f32 * scale,
        });
        source_y += source_height;
    }
    Ok(slices)
}

/// Bitmap band cropped out of the source, ready for one page
#[derive(Debug, Clone)]
pub struct BitmapPage {
    pub slice: BitmapSlice,
    pub image: DynamicImage,
}

pub fn paginate(canvas: &DynamicImage, layout: &PageLayout) -> Result<Vec<BitmapPage>, ExportError> {
    let (width, height) = canvas.dimensions();
    let slices = slice_plan(width, height, layout.page_width, layout.page_height)?;
    Ok(slices
        .into_iter()
        .map(|slice| BitmapPage {
            image: canvas.crop_imm(0, slice.source_y, width, slice.source_height),
            slice,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn tall_view_spans_three_pages() {
        // 1000 px wide on a 210 wide page: 3000 px tall becomes 630 tall
        let slices = slice_plan(1000, 3000, 210.0, 297.0).unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].source_y, 0);
        assert_eq!(slices[1].source_y, slices[0].source_height);
        let covered: u32 = slices.iter().map(|s| s.source_height).sum();
        assert_eq!(covered, 3000);
        assert!(slices.iter().all(|s| s.placed_height <= 297.0 + f32::EPSILON));
    }

    #[test]
    fn exact_multiple_has_no_trailing_blank_page() {
        let slices = slice_plan(210, 594, 210.0, 297.0).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[1].source_height, 297);
    }

    #[test]
    fn short_view_fits_one_page() {
        let slices = slice_plan(800, 200, 210.0, 297.0).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].page, 1);
        assert!((slices[0].placed_height - 52.5).abs() < 0.01);
    }

    #[test]
    fn empty_view_is_rejected() {
        assert!(matches!(slice_plan(0, 100, 210.0, 297.0), Err(ExportError::InvalidInput(_))));
        assert!(matches!(slice_plan(100, 0, 210.0, 297.0), Err(ExportError::InvalidInput(_))));
    }

    #[test]
    fn paginate_crops_bands_in_order() {
        let canvas = DynamicImage::ImageRgb8(RgbImage::from_fn(210, 400, |_, y| {
            if y < 297 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        }));
        let pages = paginate(&canvas, &PageLayout::a4()).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].image.dimensions(), (210, 297));
        assert_eq!(pages[1].image.dimensions(), (210, 103));
        assert_eq!(pages[1].image.get_pixel(0, 0).0[0], 0);
    }
}
