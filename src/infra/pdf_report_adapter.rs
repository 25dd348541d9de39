use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use lopdf::{dictionary, Document, Object, Stream};
use tracing::info;

use crate::app::ports::{ReportContext, ReportSink};
use crate::error::{AuditError, Result};

// US Letter, in points
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const LEFT_MARGIN: f32 = 30.0;
const TOP_MARGIN: f32 = 40.0;
const BOTTOM_LIMIT: f32 = 40.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;
const DATE_GAP: f32 = 15.0;
const FIRST_LINE_GAP: f32 = 30.0;
const LINE_PITCH: f32 = 15.0;

fn lopdf_err(err: lopdf::Error) -> AuditError {
    AuditError::Pdf(err.to_string())
}

/// Renders one line per record under a title and generation date.
#[derive(Debug, Clone)]
pub struct PdfReportSink {
    path: PathBuf,
}

impl PdfReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for PdfReportSink {
    fn kind(&self) -> &'static str {
        "pdf"
    }

    fn write_report(&self, ctx: &ReportContext<'_>) -> Result<PathBuf> {
        let mut doc = build_document(ctx)?;
        let mut out = BufWriter::new(File::create(&self.path)?);
        doc.save_to(&mut out).map_err(|e| AuditError::Pdf(e.to_string()))?;
        info!(path = %self.path.display(), records = ctx.table.len(), "wrote PDF report");
        Ok(self.path.clone())
    }
}

/// Baselines for `count` body lines, grouped by page.
///
/// The first page always exists, even with no lines. Its body starts
/// 30pt below the title; continuation pages start at the top margin.
pub fn paginate(count: usize) -> Vec<Vec<f32>> {
    let title_y = PAGE_HEIGHT - TOP_MARGIN;
    let mut pages = vec![Vec::new()];
    let mut y = title_y - FIRST_LINE_GAP;
    for _ in 0..count {
        if y < BOTTOM_LIMIT {
            pages.push(Vec::new());
            y = PAGE_HEIGHT - TOP_MARGIN;
        }
        if let Some(page) = pages.last_mut() {
            page.push(y);
        }
        y -= LINE_PITCH;
    }
    pages
}

/// Encode text for a WinAnsi Type1 font inside a PDF literal string.
fn pdf_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            '→' => out.extend_from_slice(b"->"),
            '←' => out.extend_from_slice(b"<-"),
            '\u{2013}' | '\u{2014}' => out.push(b'-'),
            '\u{2018}' | '\u{2019}' => out.push(b'\''),
            '\u{201C}' | '\u{201D}' => out.push(b'"'),
            '\t' => out.push(b' '),
            c if (' '..='~').contains(&c) => out.push(c as u8),
            c if ('\u{A0}'..='\u{FF}').contains(&c) => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn show_text(content: &mut Vec<u8>, font: &str, size: f32, y: f32, text: &str) {
    content.extend_from_slice(format!("BT /{font} {size} Tf {LEFT_MARGIN} {y} Td (").as_bytes());
    content.extend_from_slice(&pdf_text(text));
    content.extend_from_slice(b") Tj ET\n");
}

pub fn build_document(ctx: &ReportContext<'_>) -> Result<Document> {
    let lines: Vec<String> = ctx.table.records.iter().map(|r| r.report_line()).collect();
    let layout = paginate(lines.len());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => regular_id, "F2" => bold_id },
    });

    let title_y = PAGE_HEIGHT - TOP_MARGIN;
    let mut kids = Vec::with_capacity(layout.len());
    let mut next_line = lines.iter();
    for (page_no, baselines) in layout.iter().enumerate() {
        let mut content = Vec::new();
        if page_no == 0 {
            show_text(&mut content, "F2", TITLE_SIZE, title_y, ctx.title);
            let stamp = format!(
                "Generated {} from {}",
                ctx.generated_at.format("%Y-%m-%d %H:%M UTC"),
                ctx.source_name
            );
            show_text(&mut content, "F1", BODY_SIZE, title_y - DATE_GAP, &stamp);
        }
        for y in baselines {
            if let Some(line) = next_line.next() {
                show_text(&mut content, "F1", BODY_SIZE, *y, line);
            }
        }

        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Render the report to an in-memory PDF.
pub fn render_pdf(ctx: &ReportContext<'_>) -> Result<Vec<u8>> {
    let mut doc = build_document(ctx)?;
    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| AuditError::Pdf(e.to_string()))?;
    // sanity check that the writer produced something lopdf can read back
    Document::load_mem(&buf).map_err(lopdf_err)?;
    Ok(buf)
}
