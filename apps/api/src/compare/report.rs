//! Downloadable renderings of a [`ComparisonReport`]: a paginated A4 PDF and Markdown.

use anyhow::{anyhow, Result};
use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::compare::ComparisonReport;

pub const PDF_EXPORT_FILENAME: &str = "resume_comparison.pdf";
pub const MARKDOWN_EXPORT_FILENAME: &str = "resume_comparison.md";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
/// Characters per line of 10pt Helvetica across the text block.
const WRAP_COLUMNS: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineStyle {
    Title,
    Heading,
    Body,
}

impl LineStyle {
    fn font_size(self) -> f32 {
        match self {
            Self::Title => 16.0,
            Self::Heading => 12.5,
            Self::Body => 10.0,
        }
    }

    /// Vertical space the line takes, in millimetres.
    fn leading_mm(self) -> f32 {
        match self {
            Self::Title => 10.0,
            Self::Heading => 7.5,
            Self::Body => 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PdfLine {
    style: LineStyle,
    text: String,
}

impl PdfLine {
    fn new(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(LineStyle::Body, "")
    }
}

/// Renders a comparison as an A4 PDF using the built-in Helvetica faces.
pub fn render_comparison_pdf(report: &ComparisonReport) -> Result<Vec<u8>> {
    let title = format!("Resume Comparison: {} vs {}", report.first, report.second);
    let (doc, first_page, first_layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("could not load Helvetica: {e}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("could not load Helvetica-Bold: {e}"))?;

    let lines = layout_lines(report);
    for (number, page) in paginate(&lines).into_iter().enumerate() {
        let layer = if number == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        for (y, line) in page {
            if line.text.is_empty() {
                continue;
            }
            let font = match line.style {
                LineStyle::Body => &regular,
                LineStyle::Title | LineStyle::Heading => &bold,
            };
            layer.use_text(
                line.text.clone(),
                line.style.font_size(),
                Mm(MARGIN_MM),
                Mm(y),
                font,
            );
        }
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow!("could not serialise comparison PDF: {e}"))
}

/// Flattens the report into styled, pre-wrapped lines.
fn layout_lines(report: &ComparisonReport) -> Vec<PdfLine> {
    let mut lines = vec![
        PdfLine::new(
            LineStyle::Title,
            format!("Resume Comparison: {} vs {}", report.first, report.second),
        ),
        PdfLine::new(
            LineStyle::Body,
            format!("Generated {}", report.generated_at.format("%Y-%m-%d %H:%M UTC")),
        ),
        PdfLine::blank(),
        PdfLine::new(LineStyle::Heading, "Summary"),
    ];
    lines.extend(
        wrap_text(&report.summary, WRAP_COLUMNS)
            .into_iter()
            .map(|text| PdfLine::new(LineStyle::Body, text)),
    );

    for row in &report.dimensions {
        lines.push(PdfLine::blank());
        lines.push(PdfLine::new(LineStyle::Heading, row.dimension.trim()));
        for (name, value) in [(&report.first, &row.first), (&report.second, &row.second)] {
            lines.extend(
                wrap_text(&format!("{name}: {}", value.trim()), WRAP_COLUMNS)
                    .into_iter()
                    .map(|text| PdfLine::new(LineStyle::Body, text)),
            );
        }
    }
    lines
}

/// Assigns each line a baseline (mm from the page bottom), starting a new page when the
/// next line would cross the bottom margin.
fn paginate(lines: &[PdfLine]) -> Vec<Vec<(f32, &PdfLine)>> {
    let top = PAGE_HEIGHT_MM - MARGIN_MM;
    let mut pages = vec![Vec::new()];
    let mut y = top;

    for line in lines {
        let next = y - line.style.leading_mm();
        if next < MARGIN_MM && pages.last().is_some_and(|p| !p.is_empty()) {
            pages.push(Vec::new());
            y = top;
        }
        y -= line.style.leading_mm();
        if let Some(page) = pages.last_mut() {
            page.push((y, line));
        }
    }
    pages
}

/// Greedy word wrap to `columns` characters. Line breaks in `text` are kept and words longer
/// than a line are split.
fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(columns);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > columns {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Renders a comparison as a standalone Markdown document.
pub fn render_comparison_md(report: &ComparisonReport) -> String {
    let mut md = format!(
        "# Resume Comparison: {} vs {}\n\n",
        report.first, report.second
    );
    md.push_str(&format!(
        "_Generated {}_\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    md.push_str("## Summary\n\n");
    md.push_str(&report.summary);
    md.push_str("\n\n");

    md.push_str(&format!(
        "| Dimension | {} | {} |\n|---|---|---|\n",
        table_cell(&report.first),
        table_cell(&report.second)
    ));
    for row in &report.dimensions {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            table_cell(&row.dimension),
            table_cell(&row.first),
            table_cell(&row.second)
        ));
    }
    md
}

/// Keeps a value on one table row: pipes are escaped and line breaks become `<br>`.
fn table_cell(value: &str) -> String {
    value
        .trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}
