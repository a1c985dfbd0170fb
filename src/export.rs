//! Report exports: CSV spreadsheets and A4 landscape PDF tables

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Local};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::error::{AppError, AppResult};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const LINE_HEIGHT: f32 = 6.0;
const TITLE_SIZE: f32 = 14.0;
const TEXT_SIZE: f32 = 8.0;
/// Average glyph width of Helvetica relative to the font size
const GLYPH_WIDTH: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

/// A rendered report: heading lines followed by a table
#[derive(Debug, Clone)]
pub struct Table {
    pub title: String,
    /// `label: value` lines printed under the title
    pub info: Vec<(String, String)>,
    pub headings: Vec<&'static str>,
    /// Relative column widths, one per heading
    pub widths: Vec<f32>,
    pub rows: Vec<Vec<String>>,
}

/// `laporan-absensi-siswa-20240301093000.pdf`
pub fn filename(prefix: &str, ext: &str, now: DateTime<Local>) -> String {
    format!("{}-{}.{}", prefix, now.format("%Y%m%d%H%M%S"), ext)
}

/// Serve `bytes` as a download
pub fn attachment(filename: &str, content_type: &'static str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        bytes,
    )
        .into_response()
}

pub fn to_csv(table: &Table) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headings).map_err(csv_error)?;
    for row in &table.rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to write CSV: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("Failed to write CSV: {}", e))
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("Failed to render PDF: {}", e))
}

/// Cut `text` so it fits `width` millimetres at `size` points
fn fit(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * GLYPH_WIDTH * PT_TO_MM)).floor() as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(2);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("..");
    out
}

/// Absolute column widths in millimetres
fn column_widths(relative: &[f32], columns: usize) -> Vec<f32> {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    let weights: Vec<f32> = (0..columns)
        .map(|i| relative.get(i).copied().filter(|w| *w > 0.0).unwrap_or(1.0))
        .collect();
    let total: f32 = weights.iter().sum();
    weights.iter().map(|w| usable * w / total).collect()
}

struct Cursor<'a> {
    layer: PdfLayerReference,
    y: f32,
    font: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
}

impl Cursor<'_> {
    fn row(&mut self, cells: &[String], widths: &[f32], bold: bool) {
        let font = if bold { self.bold } else { self.font };
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            self.layer
                .use_text(fit(cell, *width - 1.0, TEXT_SIZE), TEXT_SIZE, Mm(x), Mm(self.y), font);
            x += width;
        }
        self.y -= LINE_HEIGHT;
    }
}

pub fn to_pdf(table: &Table) -> AppResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(table.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Laporan");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
    let widths = column_widths(&table.widths, table.headings.len());
    let headings: Vec<String> = table.headings.iter().map(|h| h.to_string()).collect();

    let mut cursor = Cursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
        font: &font,
        bold: &bold,
    };
    cursor
        .layer
        .use_text(table.title.as_str(), TITLE_SIZE, Mm(MARGIN), Mm(cursor.y), &bold);
    cursor.y -= LINE_HEIGHT * 1.5;
    for (label, value) in &table.info {
        cursor
            .layer
            .use_text(format!("{}: {}", label, value), TEXT_SIZE, Mm(MARGIN), Mm(cursor.y), &font);
        cursor.y -= LINE_HEIGHT * 0.8;
    }
    cursor.y -= LINE_HEIGHT * 0.5;
    cursor.row(&headings, &widths, true);

    if table.rows.is_empty() {
        cursor.row(&["Tidak ada data".to_string()], &[PAGE_WIDTH - 2.0 * MARGIN], false);
    }
    for row in &table.rows {
        if cursor.y < MARGIN {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Laporan");
            cursor.layer = doc.get_page(page).get_layer(layer);
            cursor.y = PAGE_HEIGHT - MARGIN;
            cursor.row(&headings, &widths, true);
        }
        cursor.row(row, &widths, false);
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(rows: usize) -> Table {
        Table {
            title: "Laporan Jurnal Guru".to_string(),
            info: vec![("Kelas".to_string(), "Semua Kelas".to_string())],
            headings: vec!["No", "Tanggal", "Tema"],
            widths: vec![0.5, 1.0, 3.0],
            rows: (1..=rows)
                .map(|i| vec![i.to_string(), "01/03/2024".to_string(), format!("Tema, \"{}\"", i)])
                .collect(),
        }
    }

    #[test]
    fn test_filename() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(
            filename("laporan-jurnal-guru", "csv", now),
            "laporan-jurnal-guru-20240301093005.csv"
        );
    }

    #[test]
    fn test_csv_quotes_fields() {
        let bytes = to_csv(&sample(1)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "No,Tanggal,Tema\n1,01/03/2024,\"Tema, \"\"1\"\"\"\n");
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("Hadir", 50.0, 8.0), "Hadir");
        let cut = fit(&"x".repeat(100), 10.0, 8.0);
        assert!(cut.ends_with(".."));
        assert!(cut.chars().count() < 100);
    }

    #[test]
    fn test_column_widths_fill_page() {
        let widths = column_widths(&[1.0, 3.0], 3);
        let total: f32 = widths.iter().sum();
        assert!((total - (PAGE_WIDTH - 2.0 * MARGIN)).abs() < 0.01);
        assert!(widths[1] > widths[0]);
    }

    #[test]
    fn test_pdf_spans_pages() {
        let bytes = to_pdf(&sample(80)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
