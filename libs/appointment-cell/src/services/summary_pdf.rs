use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use tracing::debug;

use shared_models::error::AppError;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: Mm = Mm(280.0);
const BOTTOM: Mm = Mm(20.0);
const LINE_CHARS: usize = 90;

/// Printable summary of a completed visit, as handed to the patient.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryDocument {
    pub patient_name: String,
    pub doctor: String,
    pub scheduled_for: String,
    pub summary: String,
}

impl SummaryDocument {
    pub const TITLE: &'static str = "Appointment Summary";
    pub const FILENAME: &'static str = "appointment_summary.pdf";

    /// Header lines printed above the summary body.
    pub fn header_lines(&self) -> [String; 3] {
        [
            format!("Patient Name: {}", self.patient_name),
            format!("Doctor: {}", self.doctor),
            format!("Date: {}", self.scheduled_for),
        ]
    }

    /// Renders a single-column A4 document, continuing onto new pages as needed.
    pub fn render(&self) -> Result<Vec<u8>, AppError> {
        let (doc, page, layer) = PdfDocument::new(Self::TITLE, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Internal(format!("PDF font error: {}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Internal(format!("PDF font error: {}", e)))?;

        {
            let mut cursor = Cursor {
                doc: &doc,
                layer: doc.get_page(page).get_layer(layer),
                y: TOP,
            };

            cursor.line(Self::TITLE, 16.0, &bold, Mm(12.0));
            for line in self.header_lines() {
                cursor.line(&line, 11.0, &font, Mm(7.0));
            }

            cursor.y -= Mm(5.0);
            cursor.line("Summary:", 12.0, &bold, Mm(7.0));
            for paragraph in self.summary.lines() {
                for line in wrap_text(paragraph, LINE_CHARS) {
                    cursor.line(&line, 10.0, &font, Mm(5.0));
                }
            }
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| AppError::Internal(format!("PDF save error: {}", e)))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| AppError::Internal(format!("PDF buffer error: {}", e)))?;

        debug!("Rendered appointment summary PDF ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: Mm,
}

impl Cursor<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef, advance: Mm) {
        if self.y < BOTTOM {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
        self.layer.use_text(text, size, Mm(20.0), self.y, font);
        self.y -= advance;
    }
}

/// Greedy word wrap. Always yields at least one line so blank paragraphs keep their space.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
