//! Text-layout PDF of an inspection report via `printpdf`.
//!
//! A4 portrait, builtin Helvetica. Sections are laid out top to bottom and
//! a new page is started whenever the next line would cross the bottom
//! margin. A branding logo, when supplied, sits in the top-right corner of
//! the first page.

use std::io::BufWriter;

use printpdf::*;

use super::renderer::{artifact_file_name, RenderedArtifact, ReportRenderer};
use super::RenderError;
use crate::models::{ChecklistCategory, ImagePayload, ReportDocument};
use crate::pipeline::photo::resize_to_max_edge;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: f32 = 280.0;
const BOTTOM: f32 = 18.0;
const LEFT: Mm = Mm(20.0);
const INDENT: Mm = Mm(25.0);

/// Header box the logo is scaled into, in mm.
const LOGO_MAX_WIDTH: f32 = 40.0;
const LOGO_MAX_HEIGHT: f32 = 15.0;
const LOGO_TOP_MARGIN: f32 = 8.0;
/// Long-edge cap for the embedded logo bitmap.
const LOGO_MAX_PX: u32 = 600;

pub const REPORT_TITLE: &str = "Daily/Weekly Inspection Report";

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(
        &self,
        doc: &ReportDocument,
        branding: Option<&ImagePayload>,
    ) -> Result<RenderedArtifact, RenderError> {
        let (bytes, pages) = render_pdf(doc, branding)?;
        tracing::info!(pages, bytes = bytes.len(), "Report PDF rendered");

        Ok(RenderedArtifact {
            file_name: artifact_file_name(doc, "pdf"),
            mime_type: "application/pdf".into(),
            bytes,
        })
    }
}

/// Tracks the cursor and starts new pages as content flows down.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: Mm,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page1, layer1) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Font(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: Mm(TOP),
            pages: 1,
        })
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y.0 - height < BOTTOM {
            self.pages += 1;
            let (page, layer) =
                self.doc
                    .add_page(PAGE_WIDTH, PAGE_HEIGHT, format!("Page {}", self.pages));
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = Mm(TOP);
        }
    }

    /// Draw `bitmap` right-aligned at the top of the current page.
    fn logo(&self, bitmap: ::image::RgbImage) {
        let (px_w, px_h) = bitmap.dimensions();
        let dpi = (px_h as f32 * 25.4 / LOGO_MAX_HEIGHT).max(px_w as f32 * 25.4 / LOGO_MAX_WIDTH);
        let width = px_w as f32 * 25.4 / dpi;
        let height = px_h as f32 * 25.4 / dpi;

        let xobject = ImageXObject {
            width: Px(px_w as usize),
            height: Px(px_h as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: bitmap.into_raw(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };
        Image::from(xobject).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(PAGE_WIDTH.0 - LEFT.0 - width)),
                translate_y: Some(Mm(PAGE_HEIGHT.0 - LOGO_TOP_MARGIN - height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    fn title(&mut self, text: &str) {
        self.layer.use_text(text, 14.0, LEFT, self.y, &self.bold);
        self.y -= Mm(8.0);
    }

    fn heading(&mut self, text: &str) {
        // Keep a heading on the same page as its first line
        self.ensure_room(14.0);
        self.y -= Mm(3.0);
        self.layer.use_text(text, 11.0, LEFT, self.y, &self.bold);
        self.y -= Mm(6.0);
    }

    fn line(&mut self, text: &str) {
        self.ensure_room(4.5);
        self.layer.use_text(text, 9.0, INDENT, self.y, &self.font);
        self.y -= Mm(4.5);
    }

    fn wrapped(&mut self, text: &str, max_chars: usize) {
        for line in wrap_text(text, max_chars) {
            self.line(&line);
        }
    }

    fn field(&mut self, label: &str, value: &str) {
        self.ensure_room(4.5);
        self.layer
            .use_text(format!("{label}:"), 9.0, LEFT, self.y, &self.bold);
        self.layer
            .use_text(or_dash(value), 9.0, Mm(65.0), self.y, &self.font);
        self.y -= Mm(4.5);
    }

    fn finish(self) -> Result<(Vec<u8>, usize), RenderError> {
        let pages = self.pages;
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| RenderError::Pdf(format!("PDF buffer error: {e}")))?;
        Ok((bytes, pages))
    }
}

fn or_dash(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// Decode a branding asset to 8-bit RGB flattened onto white, with the
/// long edge capped at `LOGO_MAX_PX`.
fn logo_bitmap(payload: &ImagePayload) -> Result<::image::RgbImage, ::image::ImageError> {
    let rgba = ::image::load_from_memory(payload.bytes())?.to_rgba8();
    let flat = ::image::RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over_white = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        ::image::Rgb([over_white(r), over_white(g), over_white(b)])
    });
    Ok(resize_to_max_edge(&flat, LOGO_MAX_PX))
}

/// Render the report; returns PDF bytes and page count. An undecodable
/// logo is skipped.
pub fn render_pdf(
    doc: &ReportDocument,
    branding: Option<&ImagePayload>,
) -> Result<(Vec<u8>, usize), RenderError> {
    let mut w = PageWriter::new(REPORT_TITLE)?;

    if let Some(logo) = branding {
        match logo_bitmap(logo) {
            Ok(bitmap) => w.logo(bitmap),
            Err(e) => tracing::warn!(
                mime = logo.mime_type(),
                error = %e,
                "Branding asset could not be decoded, rendering without logo"
            ),
        }
    }

    w.title(REPORT_TITLE);
    w.field("Project", &doc.project_name);
    w.field("Operator / Contractor", &doc.operator);
    w.field("Operator/Contractor Rep", &doc.operator_rep);
    w.field("Inspector", &doc.inspector);
    w.field("Date", &doc.date);
    w.field("Location", &doc.location);

    w.heading("WEATHER");
    w.line(&format!(
        "Weather: {}   Temp: {}   Wind: {}   Precip: {}",
        or_dash(&doc.weather),
        or_dash(&doc.temperature),
        or_dash(&doc.wind),
        or_dash(&doc.precipitation)
    ));

    w.heading("CREW");
    if doc.crew.is_empty() {
        w.line("None recorded");
    }
    for member in &doc.crew {
        w.line(&format!(
            "- {} | {} | {}",
            or_dash(&member.name),
            or_dash(&member.company),
            or_dash(&member.role)
        ));
    }

    w.heading("EQUIPMENT USED");
    if doc.equipment.is_empty() {
        w.line("None recorded");
    }
    for entry in &doc.equipment {
        w.line(&format!("- {} (qty {})", or_dash(&entry.kind), or_dash(&entry.quantity)));
    }

    w.heading("WORK SUMMARY");
    w.wrapped(or_dash(&doc.work_summary), 95);

    w.heading("PIPE INSTALLED");
    if doc.pipes.is_empty() {
        w.line("None recorded");
    }
    for pipe in &doc.pipes {
        w.line(&format!(
            "- {} {} | {} ft | Serial {}",
            or_dash(&pipe.size),
            or_dash(&pipe.kind),
            or_dash(&pipe.footage),
            or_dash(&pipe.serial)
        ));
    }

    w.heading("MATERIALS / FITTINGS USED");
    if doc.materials.is_empty() {
        w.line("None recorded");
    }
    for item in &doc.materials {
        let mut text = format!(
            "- {} | {} | qty {}",
            or_dash(&item.item),
            or_dash(&item.spec),
            or_dash(&item.quantity)
        );
        if !item.notes.trim().is_empty() {
            text.push_str(&format!(" | {}", item.notes.trim()));
        }
        w.wrapped(&text, 95);
    }

    for (number, category) in (2..).zip(ChecklistCategory::ALL) {
        w.heading(&format!("{number}. {}", category.title().to_uppercase()));
        for item in doc.section(category).items() {
            let answer = item.answer.map_or("___", |a| a.label());
            let text = match item.reference {
                Some(reference) => format!("[{answer}] {} ({reference})", item.label),
                None => format!("[{answer}] {}", item.label),
            };
            w.wrapped(&text, 95);
        }
    }

    w.heading("PHOTOS");
    if doc.photos.is_empty() {
        w.line("None attached");
    }
    for (index, photo) in doc.photos.iter().enumerate() {
        let mut text = format!("{}. {} ({}x{})", index + 1, photo.name, photo.width, photo.height);
        if !photo.caption.trim().is_empty() {
            text.push_str(&format!(" - {}", photo.caption.trim()));
        }
        w.wrapped(&text, 95);
    }

    w.finish()
}

/// Simple word-wrap helper for PDF text rendering.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0;

    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if width + word_width + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            width = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            width += 1;
        }
        current.push_str(word);
        width += word_width;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
