/// Page rendering — the `PageRenderer` seam plus PDF and transcript backends.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use thiserror::Error;

/// A4 portrait, in millimetres.
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
/// Left, right and top margin.
pub const MARGIN: f32 = 10.0;
/// Distance from the bottom edge at which content breaks to a new page.
pub const BREAK_MARGIN: f32 = 15.0;
/// Height of one text line.
pub const LINE_HEIGHT: f32 = 10.0;

pub const HEADING_SIZE: f32 = 14.0;
pub const BODY_SIZE: f32 = 12.0;

const PT_TO_MM: f32 = 0.352_778;
/// Width available to a line between the side margins.
pub const PRINTABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

// Advance widths from the Adobe core-font AFM files, in 1/1000 em, for
// printable ASCII (0x20..=0x7E) in WinAnsi order.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Advance used for characters outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

/// The two builtin faces the renderer sets text in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    fn advance(self, c: char) -> u16 {
        let table = match self {
            Face::Regular => &HELVETICA_WIDTHS,
            Face::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match c {
            ' '..='~' => table[c as usize - 0x20],
            _ => FALLBACK_WIDTH,
        }
    }
}

/// Set width of `text` in millimetres at `font_size` points.
pub fn text_width(text: &str, face: Face, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(face.advance(c))).sum();
    units as f32 / 1000.0 * font_size * PT_TO_MM
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Something that lays out headed blocks of text across pages.
pub trait PageRenderer {
    /// Start a new logical page.
    fn add_page(&mut self);
    /// A bold heading line.
    fn add_heading(&mut self, text: &str);
    /// Body lines, each starting on a new line.
    fn add_text_block(&mut self, lines: &[String]);
    /// Vertical space in millimetres.
    fn add_gap(&mut self, height: f32);
}

/// Greedy word wrap so that every line fits the printable width when set
/// in `face` at `font_size`. Words wider than a line are split.
pub fn wrap(text: &str, face: Face, font_size: f32) -> Vec<String> {
    wrap_to(text, PRINTABLE_WIDTH, |s| text_width(s, face, font_size))
}

fn wrap_to(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() {
            let joined = format!("{} {}", current, word);
            if measure(&joined) <= max_width {
                current = joined;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }

        if measure(word) <= max_width {
            current.push_str(word);
            continue;
        }
        for c in word.chars() {
            current.push(c);
            if measure(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// PDF backend using printpdf's builtin Helvetica faces.
///
/// Pages break automatically when the next line would cross the bottom
/// break margin, so one logical page may span several physical pages.
pub struct PdfRenderer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Distance from the top edge to the top of the next line.
    cursor: f32,
    physical_pages: usize,
    started: bool,
}

impl PdfRenderer {
    pub fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor: MARGIN,
            physical_pages: 1,
            started: false,
        })
    }

    /// Physical pages emitted so far, overflow pages included.
    pub fn page_count(&self) -> usize {
        self.physical_pages
    }

    /// Serialize the finished document.
    pub fn into_bytes(self) -> Result<Vec<u8>, RenderError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))
    }

    fn new_physical_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = MARGIN;
        self.physical_pages += 1;
    }

    fn write_line(&mut self, text: &str, size: f32, face: Face) {
        if self.cursor + LINE_HEIGHT > PAGE_HEIGHT - BREAK_MARGIN {
            self.new_physical_page();
        }
        self.started = true;

        // text sits vertically centred in its line box
        let baseline = self.cursor + LINE_HEIGHT / 2.0 + 0.3 * size * PT_TO_MM;
        let font = match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
        };
        self.layer
            .use_text(text, size, Mm(MARGIN), Mm(PAGE_HEIGHT - baseline), font);
        self.cursor += LINE_HEIGHT;
    }

    fn write_wrapped(&mut self, text: &str, size: f32, face: Face) {
        for line in wrap(text, face, size) {
            self.write_line(&line, size, face);
        }
    }
}

impl PageRenderer for PdfRenderer {
    fn add_page(&mut self) {
        // the document is created with one blank page already
        if self.started {
            self.new_physical_page();
        }
        self.started = true;
    }

    fn add_heading(&mut self, text: &str) {
        self.write_wrapped(text, HEADING_SIZE, Face::Bold);
    }

    fn add_text_block(&mut self, lines: &[String]) {
        for line in lines {
            self.write_wrapped(line, BODY_SIZE, Face::Regular);
        }
    }

    fn add_gap(&mut self, height: f32) {
        self.cursor += height;
    }
}

/// One recorded line of a transcript page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    Heading(String),
    Text(String),
    Gap,
}

/// Plain-text backend that records what was laid out, page by page.
#[derive(Debug, Clone, Default)]
pub struct TranscriptRenderer {
    pages: Vec<Vec<TranscriptLine>>,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Vec<TranscriptLine>] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Headings in the order they were laid out.
    pub fn headings(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flatten()
            .filter_map(|line| match line {
                TranscriptLine::Heading(h) => Some(h.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Render as text with a rule between pages.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push_str(&format!("\n---------------- page {} ----------------\n\n", i + 1));
            }
            for line in page {
                match line {
                    TranscriptLine::Heading(h) => {
                        out.push_str(h);
                        out.push('\n');
                    }
                    TranscriptLine::Text(t) => {
                        out.push_str("  ");
                        out.push_str(t);
                        out.push('\n');
                    }
                    TranscriptLine::Gap => out.push('\n'),
                }
            }
        }
        out
    }

    fn current_page(&mut self) -> &mut Vec<TranscriptLine> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}

impl PageRenderer for TranscriptRenderer {
    fn add_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn add_heading(&mut self, text: &str) {
        self.current_page()
            .push(TranscriptLine::Heading(text.to_string()));
    }

    fn add_text_block(&mut self, lines: &[String]) {
        let page = self.current_page();
        page.extend(lines.iter().cloned().map(TranscriptLine::Text));
    }

    fn add_gap(&mut self, _height: f32) {
        self.current_page().push(TranscriptLine::Gap);
    }
}
