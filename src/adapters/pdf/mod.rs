//! PDF adapter: Implementation of ReportRenderer.
//!
//! Renders the report on A4 pages with printpdf's builtin Helvetica fonts.
//! The document is assembled in two passes: `layout_report` produces the
//! ordered block model (pure, inspectable in tests), then the draw pass
//! turns blocks into page content. Eye photographs are decoded up front so
//! a damaged attachment fails the export before anything is drawn.

use std::io::BufWriter;

use image::GenericImageView;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};

use crate::domain::Patient;
use crate::ports::ReportRenderer;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const TOP_START: f32 = 280.0;
const BOTTOM_MARGIN: f32 = 20.0;

const LINE_HEIGHT: f32 = 4.5;
const BOX_PADDING: f32 = 3.0;
const WRAP_COLUMNS: usize = 90;

// Eye image band: right eye on the left half, left eye on the right half
const SLOT_WIDTH: f32 = 80.0;
const SLOT_HEIGHT: f32 = 55.0;
const RIGHT_EYE_X: f32 = MARGIN;
const LEFT_EYE_X: f32 = PAGE_WIDTH - MARGIN - SLOT_WIDTH;
const IMAGE_DPI: f32 = 300.0;

/// Error type for render operations.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Cannot decode the {eye} eye photograph: {source}")]
    ImageDecode {
        eye: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Document assembly failed: {0}")]
    Assembly(String),
}

/// One photograph slot in the eye image band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageSlot {
    pub caption: &'static str,
    pub present: bool,
}

/// One logical block of the report, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReportBlock {
    /// Document title
    Title(&'static str),
    /// Generation date line under the title
    Subtitle(String),
    /// One demographic `label: value` row
    Field { label: &'static str, value: String },
    /// Section heading outside a box
    Heading(&'static str),
    /// Word-wrapped free text inside a ruled box
    BoxedText {
        heading: &'static str,
        lines: Vec<String>,
    },
    /// Side-by-side photograph band
    EyeImages { right: ImageSlot, left: ImageSlot },
    /// Labeled blank line for handwriting
    SignatureLine { label: &'static str },
}

/// Assemble the ordered block model for one patient report.
///
/// The content is taken verbatim from the record; only line wrapping is
/// applied. Absent photographs still get their slot so the captions always
/// appear.
pub(crate) fn layout_report(patient: &Patient, report_text: &str) -> Vec<ReportBlock> {
    let record = &patient.record;

    let mut blocks = vec![
        ReportBlock::Title("Patient Medical Report"),
        ReportBlock::Subtitle(format!(
            "Generated on {}",
            chrono::Utc::now().format("%Y-%m-%d")
        )),
        ReportBlock::Field {
            label: "Name",
            value: record.name.clone(),
        },
        ReportBlock::Field {
            label: "Age",
            value: record.age.clone(),
        },
        ReportBlock::Field {
            label: "Sex",
            value: record.sex.clone(),
        },
        ReportBlock::Field {
            label: "Address",
            value: record.address.clone(),
        },
        ReportBlock::Field {
            label: "National ID",
            value: record.national_id.clone(),
        },
        ReportBlock::Field {
            label: "Phone",
            value: record.phone.clone(),
        },
    ];

    blocks.push(ReportBlock::BoxedText {
        heading: "Prior Symptoms",
        lines: wrap_text(&record.prior_symptoms, WRAP_COLUMNS),
    });
    blocks.push(ReportBlock::BoxedText {
        heading: "Medical Report",
        lines: wrap_text(report_text, WRAP_COLUMNS),
    });

    blocks.push(ReportBlock::Heading("Eye Images"));
    blocks.push(ReportBlock::EyeImages {
        right: ImageSlot {
            caption: "Right Eye",
            present: record.right_eye_image.is_some(),
        },
        left: ImageSlot {
            caption: "Left Eye",
            present: record.left_eye_image.is_some(),
        },
    });

    blocks.push(ReportBlock::SignatureLine { label: "Specialist" });
    blocks.push(ReportBlock::SignatureLine { label: "Signature" });

    blocks
}

/// Word-wrap free text for PDF rendering, keeping author line breaks.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        if raw_line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Writing position on the current page, with page-break handling.
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: Mm,
}

impl PageCursor<'_> {
    /// Break to a fresh page unless `needed` millimeters still fit.
    fn ensure_room(&mut self, needed: f32) {
        if self.y.0 - needed < BOTTOM_MARGIN {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = Mm(TOP_START);
    }
}

/// Stroke a rectangle outline with the layer's current line settings.
fn stroke_rect(layer: &PdfLayerReference, x: f32, y_bottom: f32, width: f32, height: f32) {
    let rect = Line {
        points: vec![
            (Point::new(Mm(x), Mm(y_bottom)), false),
            (Point::new(Mm(x + width), Mm(y_bottom)), false),
            (Point::new(Mm(x + width), Mm(y_bottom + height)), false),
            (Point::new(Mm(x), Mm(y_bottom + height)), false),
        ],
        is_closed: true,
    };
    layer.add_line(rect);
}

/// Stroke a horizontal rule.
fn stroke_rule(layer: &PdfLayerReference, x_start: f32, x_end: f32, y: f32) {
    let rule = Line {
        points: vec![
            (Point::new(Mm(x_start), Mm(y)), false),
            (Point::new(Mm(x_end), Mm(y)), false),
        ],
        is_closed: false,
    };
    layer.add_line(rule);
}

/// PDF renderer for patient reports.
#[derive(Debug, Default)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    /// Create a new PDF renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Decode one attached photograph, stripping any alpha channel.
fn decode_eye(
    bytes: Option<&[u8]>,
    eye: &'static str,
) -> Result<Option<image::DynamicImage>, RenderError> {
    match bytes {
        Some(data) => {
            let decoded = image::load_from_memory(data)
                .map_err(|source| RenderError::ImageDecode { eye, source })?;
            Ok(Some(image::DynamicImage::ImageRgb8(decoded.to_rgb8())))
        }
        None => Ok(None),
    }
}

/// Place one photograph (or its placeholder) inside a slot.
fn draw_slot(
    layer: &PdfLayerReference,
    bitmap: Option<&image::DynamicImage>,
    x: f32,
    top_y: f32,
    font: &IndirectFontRef,
) {
    match bitmap {
        Some(img) => {
            let (px_w, px_h) = img.dimensions();
            let natural_w = px_w as f32 * 25.4 / IMAGE_DPI;
            let natural_h = px_h as f32 * 25.4 / IMAGE_DPI;
            let scale = (SLOT_WIDTH / natural_w).min(SLOT_HEIGHT / natural_h);
            let fitted_w = natural_w * scale;
            let fitted_h = natural_h * scale;

            let pdf_image = Image::from_dynamic_image(img);
            pdf_image.add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(x + (SLOT_WIDTH - fitted_w) / 2.0)),
                    translate_y: Some(Mm(top_y - fitted_h)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(IMAGE_DPI),
                    ..Default::default()
                },
            );
        }
        None => {
            stroke_rect(layer, x, top_y - SLOT_HEIGHT, SLOT_WIDTH, SLOT_HEIGHT);
            layer.use_text(
                "(no image attached)",
                9.0,
                Mm(x + 18.0),
                Mm(top_y - SLOT_HEIGHT / 2.0),
                font,
            );
        }
    }
}

/// Draw a ruled box of wrapped text, splitting the box across pages when
/// the content runs past the bottom margin.
fn draw_boxed_text(
    cursor: &mut PageCursor<'_>,
    heading: &str,
    lines: &[String],
    font: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let mut index = 0;
    let mut first_chunk = true;

    loop {
        let lead = BOX_PADDING + 4.0 + if first_chunk { 6.0 } else { 0.0 };
        cursor.ensure_room(lead + LINE_HEIGHT + BOX_PADDING);

        let box_top = cursor.y.0;
        cursor.y -= Mm(BOX_PADDING + 4.0);

        if first_chunk {
            cursor
                .layer
                .use_text(heading, 10.0, Mm(MARGIN + BOX_PADDING), cursor.y, bold);
            cursor.y -= Mm(6.0);
            first_chunk = false;
        }

        while index < lines.len() {
            cursor.layer.use_text(
                &lines[index],
                9.0,
                Mm(MARGIN + BOX_PADDING),
                cursor.y,
                font,
            );
            index += 1;
            if index == lines.len() {
                break;
            }
            if cursor.y.0 - LINE_HEIGHT < BOTTOM_MARGIN + BOX_PADDING {
                break;
            }
            cursor.y -= Mm(LINE_HEIGHT);
        }

        cursor.y -= Mm(BOX_PADDING + 1.5);
        stroke_rect(
            &cursor.layer,
            MARGIN,
            cursor.y.0,
            CONTENT_WIDTH,
            box_top - cursor.y.0,
        );

        if index >= lines.len() {
            break;
        }
        cursor.break_page();
    }

    cursor.y -= Mm(6.0);
}

/// Draw the block model into a fresh document.
fn draw_document(
    blocks: &[ReportBlock],
    right_eye: Option<&image::DynamicImage>,
    left_eye: Option<&image::DynamicImage>,
) -> Result<Vec<u8>, RenderError> {
    let (doc, page, layer) = PdfDocument::new(
        "Patient Medical Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Assembly(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Assembly(format!("font error: {e}")))?;

    let mut cursor = PageCursor {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        y: Mm(TOP_START),
    };
    cursor.layer.set_outline_thickness(0.4);

    for block in blocks {
        match block {
            ReportBlock::Title(text) => {
                cursor.ensure_room(12.0);
                cursor.layer.use_text(*text, 16.0, Mm(MARGIN), cursor.y, &bold);
                cursor.y -= Mm(7.0);
            }
            ReportBlock::Subtitle(text) => {
                cursor.ensure_room(8.0);
                cursor.layer.use_text(text, 9.0, Mm(MARGIN), cursor.y, &font);
                cursor.y -= Mm(9.0);
            }
            ReportBlock::Field { label, value } => {
                cursor.ensure_room(6.0);
                cursor
                    .layer
                    .use_text(format!("{label}:"), 10.0, Mm(MARGIN), cursor.y, &bold);
                cursor.layer.use_text(value, 10.0, Mm(MARGIN + 38.0), cursor.y, &font);
                cursor.y -= Mm(6.0);
            }
            ReportBlock::Heading(text) => {
                cursor.ensure_room(10.0);
                cursor.layer.use_text(*text, 12.0, Mm(MARGIN), cursor.y, &bold);
                cursor.y -= Mm(7.0);
            }
            ReportBlock::BoxedText { heading, lines } => {
                draw_boxed_text(&mut cursor, heading, lines, &font, &bold);
            }
            ReportBlock::EyeImages { right, left } => {
                cursor.ensure_room(6.0 + SLOT_HEIGHT + 8.0);
                cursor
                    .layer
                    .use_text(right.caption, 10.0, Mm(RIGHT_EYE_X), cursor.y, &bold);
                cursor
                    .layer
                    .use_text(left.caption, 10.0, Mm(LEFT_EYE_X), cursor.y, &bold);
                cursor.y -= Mm(6.0);

                let slot_top = cursor.y.0;
                draw_slot(&cursor.layer, right_eye, RIGHT_EYE_X, slot_top, &font);
                draw_slot(&cursor.layer, left_eye, LEFT_EYE_X, slot_top, &font);
                cursor.y -= Mm(SLOT_HEIGHT + 10.0);
            }
            ReportBlock::SignatureLine { label } => {
                cursor.ensure_room(14.0);
                cursor
                    .layer
                    .use_text(format!("{label}:"), 10.0, Mm(MARGIN), cursor.y, &font);
                stroke_rule(
                    &cursor.layer,
                    MARGIN + 28.0,
                    MARGIN + 110.0,
                    cursor.y.0 - 1.0,
                );
                cursor.y -= Mm(12.0);
            }
        }
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer)
        .map_err(|e| RenderError::Assembly(format!("save error: {e}")))?;
    buffer
        .into_inner()
        .map_err(|e| RenderError::Assembly(format!("buffer error: {e}")))
}

impl ReportRenderer for PdfReportRenderer {
    type Error = RenderError;

    fn render(&self, patient: &Patient, report_text: &str) -> Result<Vec<u8>, Self::Error> {
        // Decode first so a damaged attachment aborts before any drawing
        let right_eye = decode_eye(patient.record.right_eye_image.as_deref(), "right")?;
        let left_eye = decode_eye(patient.record.left_eye_image.as_deref(), "left")?;

        let blocks = layout_report(patient, report_text);
        let bytes = draw_document(&blocks, right_eye.as_ref(), left_eye.as_ref())?;

        tracing::debug!(
            "Rendered report for patient {}: {} blocks, {} bytes",
            patient.id,
            blocks.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}
