pub mod assemble;
pub mod bitmap;
pub mod layout;
pub mod pdf;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

use crate::models::report::{ExportError, PageLayout, ReportDocument, ReportEntity, ReportType};
use crate::models::tracking::TrackingRecord;
use crate::utils::filenames;

pub use assemble::ReportAssembler;
pub use pdf::{PdfRenderer, ReportRenderer};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Finished download; produced whole or not at all
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Assembles, paginates and renders report downloads
#[derive(Clone)]
pub struct ReportExporter {
    assembler: ReportAssembler,
    layout: PageLayout,
    renderer: Arc<dyn ReportRenderer>,
}

impl std::fmt::Debug for ReportExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportExporter")
            .field("assembler", &self.assembler)
            .field("layout", &self.layout)
            .finish()
    }
}

impl ReportExporter {
    pub fn new(tz: Tz) -> Self {
        Self::with_renderer(tz, PageLayout::a4(), Arc::new(PdfRenderer))
    }

    pub fn with_renderer(tz: Tz, layout: PageLayout, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self {
            assembler: ReportAssembler::new(tz),
            layout,
            renderer,
        }
    }

    fn render_document(&self, doc: &ReportDocument) -> Result<Vec<u8>, ExportError> {
        let pages = layout::render(doc, &self.layout);
        info!("📄 Rendering '{}' across {} page(s)", doc.title, pages.len());
        self.renderer.render_pages(&doc.title, &pages, &self.layout)
    }

    /// `tracking-{productId}.pdf` with one section per event
    pub fn tracking_report(
        &self,
        record: &TrackingRecord,
        generated_at: DateTime<Utc>,
    ) -> Result<ExportArtifact, ExportError> {
        let doc = self.assembler.tracking(record, generated_at);
        Ok(ExportArtifact {
            file_name: filenames::tracking_report(&record.product_id),
            content_type: PDF_CONTENT_TYPE,
            bytes: self.render_document(&doc)?,
        })
    }

    /// `{reportType}-report-{unixMillis}.pdf`
    pub fn bulk_report(
        &self,
        report_type: ReportType,
        entities: &[ReportEntity],
        generated_at: DateTime<Utc>,
    ) -> Result<ExportArtifact, ExportError> {
        let doc = self
            .assembler
            .bulk(report_type.title(), entities, generated_at);
        Ok(ExportArtifact {
            file_name: filenames::bulk_report(report_type.as_str(), generated_at.timestamp_millis()),
            content_type: PDF_CONTENT_TYPE,
            bytes: self.render_document(&doc)?,
        })
    }

    /// Bitmap mode: a captured view (PNG/JPEG bytes) scaled to page width and
    /// sliced across as many pages as its height needs
    pub fn view_report(
        &self,
        capture: &[u8],
        file_stem: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<ExportArtifact, ExportError> {
        let canvas = image::load_from_memory(capture)
            .map_err(|e| ExportError::InvalidInput(format!("Unreadable view capture: {e}")))?;
        let pages = bitmap::paginate(&canvas, &self.layout)?;
        info!(
            "🖼️ Rendering {}x{} view capture across {} page(s)",
            canvas.width(),
            canvas.height(),
            pages.len()
        );

        Ok(ExportArtifact {
            file_name: filenames::bulk_report(file_stem, generated_at.timestamp_millis()),
            content_type: PDF_CONTENT_TYPE,
            bytes: self.renderer.render_bitmap(file_stem, &pages, &self.layout)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::seed;
    use crate::models::report::Page;
    use bitmap::BitmapPage;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Records what reached the back end instead of drawing it
    #[derive(Default)]
    struct Recorder {
        text_pages: Mutex<Vec<usize>>,
        bitmap_pages: Mutex<Vec<usize>>,
    }

    impl ReportRenderer for Recorder {
        fn render_pages(&self, _: &str, pages: &[Page], _: &PageLayout) -> Result<Vec<u8>, ExportError> {
            self.text_pages.lock().unwrap().push(pages.len());
            Ok(b"text".to_vec())
        }

        fn render_bitmap(&self, _: &str, pages: &[BitmapPage], _: &PageLayout) -> Result<Vec<u8>, ExportError> {
            self.bitmap_pages.lock().unwrap().push(pages.len());
            Ok(b"bitmap".to_vec())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn tracking_report_is_named_after_the_product() {
        let record = seed::demo_products().unwrap().remove(0);
        let exporter = ReportExporter::new(Tz::UTC);
        let artifact = exporter.tracking_report(&record, Utc::now()).unwrap();

        assert_eq!(artifact.file_name, format!("tracking-{}.pdf", record.product_id));
        assert_eq!(artifact.content_type, PDF_CONTENT_TYPE);
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn bulk_report_goes_through_the_renderer() {
        let recorder = Arc::new(Recorder::default());
        let exporter = ReportExporter::with_renderer(Tz::UTC, PageLayout::a4(), recorder.clone());
        let entities: Vec<ReportEntity> = seed::demo_products().unwrap().iter().map(ReportEntity::from).collect();

        let artifact = exporter
            .bulk_report(ReportType::Products, &entities, Utc::now())
            .unwrap();
        assert!(artifact.file_name.starts_with("products-report-"));
        assert_eq!(artifact.bytes, b"text");
        assert_eq!(*recorder.text_pages.lock().unwrap(), vec![1]);
    }

    #[test]
    fn view_report_slices_the_capture() {
        let recorder = Arc::new(Recorder::default());
        let exporter = ReportExporter::with_renderer(Tz::UTC, PageLayout::a4(), recorder.clone());

        // 210 px wide maps 1:1 onto an A4 width, so 600 px is three pages
        exporter.view_report(&png(210, 600), "tracking-view", Utc::now()).unwrap();
        assert_eq!(*recorder.bitmap_pages.lock().unwrap(), vec![3]);
    }

    #[test]
    fn garbage_capture_is_invalid_input() {
        let exporter = ReportExporter::new(Tz::UTC);
        assert!(matches!(
            exporter.view_report(b"not an image", "view", Utc::now()),
            Err(ExportError::InvalidInput(_))
        ));
    }
}
