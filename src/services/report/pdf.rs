use image::DynamicImage;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfPageIndex,
};
use std::io::BufWriter;

use super::bitmap::BitmapPage;
use crate::models::report::{ExportError, LineKind, Page, PageLayout};

const MM_PER_INCH: f32 = 25.4;

/// Output back end for paginated reports
pub trait ReportRenderer: Send + Sync {
    fn render_pages(&self, title: &str, pages: &[Page], layout: &PageLayout) -> Result<Vec<u8>, ExportError>;

    fn render_bitmap(
        &self,
        title: &str,
        pages: &[BitmapPage],
        layout: &PageLayout,
    ) -> Result<Vec<u8>, ExportError>;
}

/// PDF output through printpdf's built-in Helvetica
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

fn render_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Render(e.to_string())
}

/// Create the document and hand out one (page, layer) pair per requested page
fn open_document(
    title: &str,
    page_count: usize,
    layout: &PageLayout,
) -> (PdfDocumentReference, Vec<(PdfPageIndex, PdfLayerIndex)>) {
    let width = Mm(layout.page_width);
    let height = Mm(layout.page_height);
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");

    let mut targets = vec![(first_page, first_layer)];
    for number in 2..=page_count {
        targets.push(doc.add_page(width, height, format!("Page {number}")));
    }
    (doc, targets)
}

fn finish(doc: PdfDocumentReference) -> Result<Vec<u8>, ExportError> {
    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer).map_err(render_error)?;
    writer.into_inner().map_err(render_error)
}

impl ReportRenderer for PdfRenderer {
    fn render_pages(&self, title: &str, pages: &[Page], layout: &PageLayout) -> Result<Vec<u8>, ExportError> {
        if pages.is_empty() {
            return Err(ExportError::InvalidInput("Nothing to render".to_string()));
        }

        let (doc, targets) = open_document(title, pages.len(), layout);
        let regular: IndirectFontRef = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?;
        let bold: IndirectFontRef = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;

        for (page, (page_index, layer_index)) in pages.iter().zip(targets) {
            let layer = doc.get_page(page_index).get_layer(layer_index);
            for line in &page.lines {
                let font = match line.kind {
                    LineKind::Title | LineKind::Heading => &bold,
                    LineKind::Summary | LineKind::Body => &regular,
                };
                // PDF origin is bottom-left
                layer.use_text(
                    line.text.clone(),
                    line.size,
                    Mm(line.x),
                    Mm(layout.page_height - line.y),
                    font,
                );
            }
        }

        finish(doc)
    }

    fn render_bitmap(
        &self,
        title: &str,
        pages: &[BitmapPage],
        layout: &PageLayout,
    ) -> Result<Vec<u8>, ExportError> {
        if pages.is_empty() {
            return Err(ExportError::InvalidInput("Nothing to render".to_string()));
        }

        let (doc, targets) = open_document(title, pages.len(), layout);
        for (page, (page_index, layer_index)) in pages.iter().zip(targets) {
            let layer = doc.get_page(page_index).get_layer(layer_index);
            let band = DynamicImage::ImageRgb8(page.image.to_rgb8());
            // dpi chosen so the band spans exactly the page width
            let dpi = band.width() as f32 * MM_PER_INCH / layout.page_width;

            Image::from_dynamic_image(&band).add_to_layer(
                layer,
                ImageTransform {
                    translate_x: Some(Mm(0.0)),
                    translate_y: Some(Mm(layout.page_height - page.slice.placed_height)),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
        }

        finish(doc)
    }
}
