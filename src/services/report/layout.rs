use crate::models::report::{LineKind, Page, PageLayout, PlacedLine, ReportDocument};

/// Indent of section body lines relative to their heading
const BODY_INDENT: f32 = 5.0;

/// Page footers print smaller than body text
const FOOTER_FONT_SIZE: f32 = 8.0;

/// Paginate a document.
///
/// A running cursor starts at `top_margin`. A section moves to a fresh page
/// when it would cross `page_height - bottom_margin`; sections are never
/// split. A section taller than a whole page still gets its own page.
/// Placed `y` values are baselines measured down from the page top.
pub fn render(doc: &ReportDocument, layout: &PageLayout) -> Vec<Page> {
    let mut finished = Vec::new();
    let mut page = start_page(1, doc, layout);
    let mut cursor = layout.top_margin;

    for line in &doc.summary {
        cursor += layout.line_height;
        page.lines.push(PlacedLine::new(
            line.text(),
            layout.left_margin,
            cursor,
            LineKind::Summary,
        ));
    }
    if !doc.summary.is_empty() {
        cursor += layout.section_spacing;
    }

    for section in &doc.sections {
        let height = section.height(layout);
        let page_has_content = cursor > layout.top_margin;
        if page_has_content && cursor + height > layout.usable_bottom() {
            let next = start_page(page.number + 1, doc, layout);
            finished.push(std::mem::replace(&mut page, next));
            cursor = layout.top_margin;
        }

        cursor += layout.line_height;
        page.lines.push(PlacedLine::new(
            section.heading.clone(),
            layout.left_margin,
            cursor,
            LineKind::Heading,
        ));
        for line in &section.lines {
            cursor += layout.line_height;
            page.lines.push(PlacedLine::new(
                line.text(),
                layout.left_margin + BODY_INDENT,
                cursor,
                LineKind::Body,
            ));
        }
        cursor += layout.section_spacing;
        page.sections += 1;
    }
    finished.push(page);

    let total = finished.len();
    for page in &mut finished {
        let footer = PlacedLine::new(
            format!("Page {} of {}", page.number, total),
            layout.left_margin,
            layout.page_height - layout.bottom_margin / 2.0,
            LineKind::Body,
        );
        page.lines.push(PlacedLine {
            size: FOOTER_FONT_SIZE,
            ..footer
        });
    }
    finished
}

fn start_page(number: usize, doc: &ReportDocument, layout: &PageLayout) -> Page {
    // running title sits inside the top margin
    let title_y = (layout.top_margin - layout.line_height).max(layout.line_height);
    Page {
        number,
        lines: vec![PlacedLine::new(
            doc.title.clone(),
            layout.left_margin,
            title_y,
            LineKind::Title,
        )],
        sections: 0,
    }
}
