//! A4 report documents drawn directly with `lopdf`.
//!
//! [`TableDocument`] lays out a header block, a paginated table and a totals
//! block; the report modules only decide columns, rows and styling.

mod fidelity;
mod inventory;

pub use fidelity::FidelityPdf;
pub use inventory::InventoryPdf;

use chrono::NaiveDateTime;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use image::{ImageReader, ImageResult, Limits};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::error::Result;
use crate::format::format_datetime;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
/// Lowest y a table row may reach; the page footer lives below it.
const BOTTOM_LIMIT: f32 = MARGIN + 30.0;

const LOGO_SIZE: f32 = 60.0;
const MAX_LOGO_BYTES: u64 = 5 * 1024 * 1024;
/// Largest logo side, in pixels, accepted by the decoder.
const MAX_LOGO_DIMENSION: u32 = 2048;

const ROW_HEIGHT: f32 = 16.0;
const HEADER_ROW_HEIGHT: f32 = 18.0;
const BODY_SIZE: f32 = 8.5;
const CELL_PADDING: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rgb(pub f32, pub f32, pub f32);

pub(crate) const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
pub(crate) const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
pub(crate) const GRAY: Rgb = Rgb(0.45, 0.45, 0.45);
pub(crate) const RED: Rgb = Rgb(0.75, 0.1, 0.1);
pub(crate) const HEADER_FILL: Rgb = Rgb(0.16, 0.38, 0.55);
pub(crate) const STRIPE_FILL: Rgb = Rgb(0.94, 0.95, 0.97);
pub(crate) const BANNER_FILL: Rgb = Rgb(0.85, 0.9, 0.94);
pub(crate) const LOW_FILL: Rgb = Rgb(0.99, 0.87, 0.87);
pub(crate) const MEDIUM_FILL: Rgb = Rgb(1.0, 0.95, 0.8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Column {
    pub header: &'static str,
    pub width: f32,
    pub align: Align,
}

impl Column {
    pub const fn left(header: &'static str, width: f32) -> Self {
        Self { header, width, align: Align::Left }
    }

    pub const fn right(header: &'static str, width: f32) -> Self {
        Self { header, width, align: Align::Right }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RowStyle {
    pub fill: Option<Rgb>,
    pub text: Rgb,
    pub bold: bool,
}

impl RowStyle {
    /// Plain row, shaded on every other index.
    pub fn striped(index: usize) -> Self {
        Self {
            fill: (index % 2 == 1).then_some(STRIPE_FILL),
            text: BLACK,
            bold: false,
        }
    }

    pub fn fill(self, fill: Rgb) -> Self {
        Self { fill: Some(fill), ..self }
    }

    pub fn text(self, text: Rgb) -> Self {
        Self { text, ..self }
    }

    pub fn bold(self) -> Self {
        Self { bold: true, ..self }
    }
}

/// First-page header block content.
#[derive(Debug, Clone)]
pub(crate) struct Header<'a> {
    pub title: &'a str,
    pub organization: &'a str,
    pub generated_by: &'a str,
    pub generated_at: NaiveDateTime,
    pub logo_path: Option<&'a Path>,
    pub details: Vec<String>,
}

/// Decoded logo ready to embed as an RGB image XObject.
struct Logo {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

/// Load the logo, or `None` when it is missing, oversized or undecodable.
/// A bad logo never fails the report.
fn load_logo(path: Option<&Path>) -> Option<Logo> {
    let path = path?;
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            log::warn!("logo {} unavailable: {e}", path.display());
            return None;
        }
    };
    if size > MAX_LOGO_BYTES {
        log::warn!(
            "logo {} is {size} bytes, over the {MAX_LOGO_BYTES} byte limit",
            path.display()
        );
        return None;
    }
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("failed to read logo {}: {e}", path.display());
            return None;
        }
    };
    match decode_logo(&bytes) {
        Ok(logo) => Some(logo),
        Err(e) => {
            log::warn!("failed to decode logo {}: {e}", path.display());
            None
        }
    }
}

/// Decode within [`MAX_LOGO_DIMENSION`] and flatten any transparency onto
/// the white page.
fn decode_logo(bytes: &[u8]) -> ImageResult<Logo> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_LOGO_DIMENSION);
    limits.max_image_height = Some(MAX_LOGO_DIMENSION);

    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits);
    let rgba = reader.decode()?.to_rgba8();

    let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    Ok(Logo {
        width: rgba.width(),
        height: rgba.height(),
        rgb,
    })
}

/// Paginated table document. Rows are drawn top to bottom; a new page is
/// started whenever the next block would cross [`BOTTOM_LIMIT`], and the
/// column headers are repeated on every page.
pub(crate) struct TableDocument<'a> {
    header: Header<'a>,
    columns: Vec<Column>,
    logo: Option<Logo>,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl<'a> TableDocument<'a> {
    pub fn new(header: Header<'a>, columns: Vec<Column>) -> Self {
        let logo = load_logo(header.logo_path);
        let mut doc = Self {
            header,
            columns,
            logo,
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        };
        doc.draw_header_block();
        doc.draw_column_headers();
        doc
    }

    fn draw_header_block(&mut self) {
        let top = PAGE_HEIGHT - MARGIN;
        let logo_y = top - LOGO_SIZE;
        if self.logo.is_some() {
            self.ops.push(Operation::new("q", vec![]));
            self.ops.push(Operation::new(
                "cm",
                vec![
                    LOGO_SIZE.into(),
                    0.into(),
                    0.into(),
                    LOGO_SIZE.into(),
                    MARGIN.into(),
                    logo_y.into(),
                ],
            ));
            self.ops.push(Operation::new("Do", vec![Object::Name(b"Logo".to_vec())]));
            self.ops.push(Operation::new("Q", vec![]));
        } else {
            self.stroke_rect(MARGIN, logo_y, LOGO_SIZE, LOGO_SIZE, GRAY);
            let label = "LOGO";
            let w = text_width(label, 9.0, true);
            self.text(
                MARGIN + (LOGO_SIZE - w) / 2.0,
                logo_y + LOGO_SIZE / 2.0 - 3.0,
                label,
                9.0,
                true,
                GRAY,
            );
        }

        let x = MARGIN + LOGO_SIZE + 14.0;
        let title = self.header.title.to_string();
        self.text(x, top - 16.0, &title, 16.0, true, BLACK);

        let mut lines = Vec::new();
        if !self.header.organization.is_empty() {
            lines.push(self.header.organization.to_string());
        }
        lines.push(format!("Generated by: {}", self.header.generated_by));
        lines.push(format!("Generated: {}", format_datetime(self.header.generated_at)));

        let mut line_y = top - 32.0;
        for line in &lines {
            self.text(x, line_y, line, 9.0, false, GRAY);
            line_y -= 12.0;
        }

        self.y = line_y.min(logo_y) - 16.0;
        let details = self.header.details.clone();
        for line in &details {
            self.text(MARGIN, self.y, line, 9.0, false, BLACK);
            self.y -= 12.0;
        }
        self.y -= 6.0;
    }

    fn draw_column_headers(&mut self) {
        let top = self.y;
        self.fill_rect(
            MARGIN,
            top - HEADER_ROW_HEIGHT,
            CONTENT_WIDTH,
            HEADER_ROW_HEIGHT,
            HEADER_FILL,
        );
        let cells: Vec<String> = self.columns.iter().map(|c| c.header.to_string()).collect();
        self.draw_cells(&cells, top - HEADER_ROW_HEIGHT + 5.5, WHITE, true);
        self.y = top - HEADER_ROW_HEIGHT;
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = PAGE_HEIGHT - MARGIN;

        let title = format!("{} (continued)", self.header.title);
        self.text(MARGIN, self.y - 10.0, &title, 10.0, true, GRAY);
        self.y -= 22.0;
        self.draw_column_headers();
    }

    /// Start a new page unless `height` more points fit on this one.
    pub fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM_LIMIT {
            self.new_page();
        }
    }

    pub fn row(&mut self, cells: &[String], style: RowStyle) {
        self.ensure_space(ROW_HEIGHT);
        let bottom = self.y - ROW_HEIGHT;
        if let Some(fill) = style.fill {
            self.fill_rect(MARGIN, bottom, CONTENT_WIDTH, ROW_HEIGHT, fill);
        }
        self.draw_cells(cells, bottom + 5.0, style.text, style.bold);
        self.y = bottom;
    }

    /// Full-width line of text, e.g. a group heading or an empty-table note.
    pub fn banner(&mut self, text: &str, style: RowStyle) {
        // keep a heading together with at least one following row
        self.ensure_space(ROW_HEIGHT * 2.0);
        let bottom = self.y - ROW_HEIGHT;
        if let Some(fill) = style.fill {
            self.fill_rect(MARGIN, bottom, CONTENT_WIDTH, ROW_HEIGHT, fill);
        }
        let text = fit_text(text, CONTENT_WIDTH - 2.0 * CELL_PADDING, BODY_SIZE, style.bold);
        self.text(MARGIN + CELL_PADDING, bottom + 5.0, &text, BODY_SIZE, style.bold, style.text);
        self.y = bottom;
    }

    /// Label/value pairs drawn right-aligned under the table, kept together
    /// on one page.
    pub fn totals(&mut self, lines: &[(String, String)]) {
        let height = 14.0 * lines.len() as f32 + 16.0;
        self.ensure_space(height);

        self.y -= 6.0;
        self.line(MARGIN, self.y, MARGIN + CONTENT_WIDTH, self.y, GRAY);
        self.y -= 4.0;

        let right = MARGIN + CONTENT_WIDTH - CELL_PADDING;
        for (label, value) in lines {
            self.y -= 14.0;
            let vw = text_width(value, 9.5, true);
            self.text(right - vw, self.y, value, 9.5, true, BLACK);
            let lw = text_width(label, 9.5, false);
            self.text(right - 110.0 - lw, self.y, label, 9.5, false, BLACK);
        }
    }

    fn draw_cells(&mut self, cells: &[String], baseline: f32, color: Rgb, bold: bool) {
        let mut x = MARGIN;
        let columns = self.columns.clone();
        for (column, cell) in columns.iter().zip(cells) {
            let avail = column.width - 2.0 * CELL_PADDING;
            let text = fit_text(cell, avail, BODY_SIZE, bold);
            let tx = match column.align {
                Align::Left => x + CELL_PADDING,
                Align::Right => {
                    x + column.width - CELL_PADDING - text_width(&text, BODY_SIZE, bold)
                }
            };
            self.text(tx, baseline, &text, BODY_SIZE, bold, color);
            x += column.width;
        }
    }

    fn text(&mut self, x: f32, y: f32, text: &str, size: f32, bold: bool, color: Rgb) {
        let font = if bold { "F2" } else { "F1" };
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), size.into()],
        ));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.ops.push(Operation::new("rg", vec![color.0.into(), color.1.into(), color.2.into()]));
        self.ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("f", vec![]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.ops.push(Operation::new("RG", vec![color.0.into(), color.1.into(), color.2.into()]));
        self.ops.push(Operation::new("w", vec![0.8f32.into()]));
        self.ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb) {
        self.ops.push(Operation::new("RG", vec![color.0.into(), color.1.into(), color.2.into()]));
        self.ops.push(Operation::new("w", vec![0.6f32.into()]));
        self.ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        self.ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    /// Assemble the document. Page footers are added here, once the page
    /// count is known.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        let page_count = self.pages.len();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(font_dictionary("Helvetica"));
        let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        };
        if let Some(logo) = self.logo.take() {
            let logo_id = add_logo(&mut doc, logo);
            resources.set("XObject", dictionary! { "Logo" => logo_id });
        }
        let resources_id = doc.add_object(resources);

        let pages = std::mem::take(&mut self.pages);
        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        for (i, mut ops) in pages.into_iter().enumerate() {
            self.ops = std::mem::take(&mut ops);
            self.page_footer(i + 1, page_count);
            let content = Content {
                operations: std::mem::take(&mut self.ops),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> =
            vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "Resources" => resources_id,
                "MediaBox" => media_box,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(win_ansi(self.header.title), StringFormat::Literal),
            "Author" => Object::String(win_ansi(self.header.generated_by), StringFormat::Literal),
            "Producer" => Object::String(b"pharmacy".to_vec(), StringFormat::Literal),
            "CreationDate" => Object::String(
                self.header
                    .generated_at
                    .format("D:%Y%m%d%H%M%S")
                    .to_string()
                    .into_bytes(),
                StringFormat::Literal,
            ),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn page_footer(&mut self, page: usize, total: usize) {
        let y = MARGIN - 6.0;
        self.line(MARGIN, MARGIN + 8.0, MARGIN + CONTENT_WIDTH, MARGIN + 8.0, GRAY);
        if !self.header.organization.is_empty() {
            let org = self.header.organization.to_string();
            self.text(MARGIN, y, &org, 8.0, false, GRAY);
        }
        let label = format!("Page {page} of {total}");
        let w = text_width(&label, 8.0, false);
        self.text(MARGIN + CONTENT_WIDTH - w, y, &label, 8.0, false, GRAY);
    }
}

fn font_dictionary(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_logo(doc: &mut Document, logo: Logo) -> ObjectId {
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => logo.width as i64,
            "Height" => logo.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        logo.rgb,
    );
    doc.add_object(stream)
}

/// Encode text for a WinAnsi Type1 font. Latin-1 characters map directly;
/// anything else becomes `?`.
pub(crate) fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

pub(crate) fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let table = if bold { &HELVETICA_BOLD_WIDTHS } else { &HELVETICA_WIDTHS };
    let units: u32 = text
        .chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7e => table[(code - 0x20) as usize] as u32,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Shorten `text` with a trailing "..." until it fits in `max_width`.
pub(crate) fn fit_text(text: &str, max_width: f32, size: f32, bold: bool) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if text_width(&candidate, size, bold) <= max_width {
            return candidate;
        }
    }
    String::new()
}
