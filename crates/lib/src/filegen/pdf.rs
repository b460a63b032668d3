//! PDF artifact rendering, built on `printpdf`'s `Op`-based v0.8.2 API:
//! a cover line, a light Markdown subset (headings, bullet/numbered
//! lists, paragraphs, inline `**bold**`), and a forced page break before
//! the quiz answer key.

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, FontId, Layer, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, Pt,
    TextItem, TextMatrix, TextRenderingMode,
};

use crate::errors::CoreError;
use crate::models::FileType;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const BODY_SIZE: f32 = 11.0;

enum Block {
    Heading(u8, String),
    Bullet(String),
    Numbered(u32, String),
    Paragraph(String),
    Blank,
}

/// Renders `body` (the model's Markdown output) into a PDF byte stream,
/// returning the bytes alongside the page count for the
/// `generated_file_versions.page_count` column.
pub fn render(
    display_name: &str,
    file_type: FileType,
    generated_at: DateTime<Utc>,
    project_name: &str,
    body: &str,
) -> Result<(Vec<u8>, u32), CoreError> {
    let blocks = parse_blocks(body);

    let mut doc = PdfDocument::new(display_name);
    let regular_bytes = BuiltinFont::Helvetica.get_subset_font().bytes;
    let bold_bytes = BuiltinFont::HelveticaBold.get_subset_font().bytes;
    let regular_font = ParsedFont::from_bytes(&regular_bytes, 0, &mut Vec::new())
        .ok_or_else(|| CoreError::from(anyhow::anyhow!("failed to parse built-in PDF font")))?;
    let bold_font = ParsedFont::from_bytes(&bold_bytes, 0, &mut Vec::new())
        .ok_or_else(|| CoreError::from(anyhow::anyhow!("failed to parse built-in bold PDF font")))?;
    let regular_id = doc.add_font(&regular_font);
    let bold_id = doc.add_font(&bold_font);

    let mut writer = PageWriter::new(doc, regular_id, bold_id);
    writer.write_line(display_name, 20.0, true);
    writer.write_line(
        &format!(
            "{project_name} • {} • Gerado em {}",
            type_label_pt(file_type),
            generated_at.format("%d/%m/%Y")
        ),
        9.0,
        false,
    );
    writer.advance(6.0);

    for block in blocks {
        match block {
            Block::Heading(level, text) => {
                if file_type == FileType::Quiz && text.to_lowercase().contains("gabarito") {
                    writer.force_page_break();
                }
                let size = match level {
                    1 => 18.0,
                    2 => 15.0,
                    _ => 13.0,
                };
                writer.advance(4.0);
                writer.write_wrapped_bold_runs(&text, size, true);
                writer.advance(2.0);
            }
            Block::Bullet(text) => writer.write_wrapped_bold_runs(&format!("•  {text}"), BODY_SIZE, false),
            Block::Numbered(n, text) => {
                writer.write_wrapped_bold_runs(&format!("{n}. {text}"), BODY_SIZE, false)
            }
            Block::Paragraph(text) => writer.write_wrapped_bold_runs(&text, BODY_SIZE, false),
            Block::Blank => writer.advance(BODY_SIZE * 0.35),
        }
    }

    let mut doc = writer.finish();
    let page_count = doc.pages.len() as u32;
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        tracing::warn!(?warnings, "pdf generation warnings");
    }
    Ok((bytes, page_count))
}

/// Portuguese display label for the cover metadata line.
fn type_label_pt(file_type: FileType) -> &'static str {
    match file_type {
        FileType::StudyGuide => "Guia de Estudos",
        FileType::Quiz => "Quiz",
        FileType::Summary => "Resumo",
        FileType::LessonPlan => "Plano de Aula",
        FileType::Custom => "Documento Personalizado",
    }
}

fn parse_blocks(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for raw_line in body.lines() {
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            blocks.push(Block::Blank);
        } else if let Some(rest) = line.trim_start().strip_prefix("### ") {
            blocks.push(Block::Heading(3, rest.to_string()));
        } else if let Some(rest) = line.trim_start().strip_prefix("## ") {
            blocks.push(Block::Heading(2, rest.to_string()));
        } else if let Some(rest) = line.trim_start().strip_prefix("# ") {
            blocks.push(Block::Heading(1, rest.to_string()));
        } else if let Some(rest) = line
            .trim_start()
            .strip_prefix("- ")
            .or_else(|| line.trim_start().strip_prefix("* "))
        {
            blocks.push(Block::Bullet(rest.to_string()));
        } else if let Some((prefix, rest)) = line.trim_start().split_once(". ") {
            if let Ok(n) = prefix.parse::<u32>() {
                blocks.push(Block::Numbered(n, rest.to_string()));
                continue;
            }
            blocks.push(Block::Paragraph(line.trim().to_string()));
        } else {
            blocks.push(Block::Paragraph(line.trim().to_string()));
        }
    }
    blocks
}

/// Accumulates text ops for the page currently being written and flushes
/// completed pages into `doc`, wrapping each page's ops in its own
/// `BeginLayer`/`EndLayer` pair.
struct PageWriter {
    doc: PdfDocument,
    regular_id: FontId,
    bold_id: FontId,
    pending_ops: Vec<Op>,
    y_mm: f32,
}

impl PageWriter {
    fn new(doc: PdfDocument, regular_id: FontId, bold_id: FontId) -> Self {
        Self {
            doc,
            regular_id,
            bold_id,
            pending_ops: Vec::new(),
            y_mm: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn flush_page(&mut self) {
        let layer_def = Layer::new("Content");
        let layer_id = self.doc.add_layer(&layer_def);
        let mut ops = vec![Op::BeginLayer {
            layer_id: layer_id.clone(),
        }];
        ops.append(&mut self.pending_ops);
        ops.push(Op::EndLayer { layer_id });

        let mut page = PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), vec![]);
        page.ops = ops;
        self.doc.pages.push(page);
        self.y_mm = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn force_page_break(&mut self) {
        self.flush_page();
    }

    fn advance(&mut self, mm: f32) {
        self.y_mm -= mm;
        if self.y_mm < MARGIN_MM {
            self.force_page_break();
        }
    }

    fn line_height(size: f32) -> f32 {
        size * 0.45
    }

    fn chars_per_line(size: f32) -> usize {
        let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
        let avg_char_width_mm = size * 0.21;
        ((usable_mm / avg_char_width_mm).floor() as usize).max(10)
    }

    fn write_line(&mut self, text: &str, size: f32, bold: bool) {
        if self.y_mm < MARGIN_MM + Self::line_height(size) {
            self.force_page_break();
        }
        let font = if bold { self.bold_id.clone() } else { self.regular_id.clone() };
        self.pending_ops.push(Op::SetFontSize { size: Pt(size), font: font.clone() });
        self.pending_ops.push(Op::StartTextSection);
        self.pending_ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(Mm(MARGIN_MM).into(), Mm(self.y_mm).into()),
        });
        self.pending_ops.push(Op::SetTextRenderingMode { mode: TextRenderingMode::Fill });
        self.pending_ops.push(Op::WriteText {
            items: vec![TextItem::Text(text.to_string())],
            font,
        });
        self.pending_ops.push(Op::EndTextSection);
        self.advance(Self::line_height(size));
    }

    /// Word-wraps `text` to the page width, rendering `**bold**` runs with
    /// the bold font id while leaving surrounding text in the regular
    /// font; `**` markers themselves are stripped.
    fn write_wrapped_bold_runs(&mut self, text: &str, size: f32, force_bold: bool) {
        let max_chars = Self::chars_per_line(size);
        for line in wrap_text(text, max_chars) {
            if force_bold {
                self.write_line(&line, size, true);
                continue;
            }
            self.write_runs_line(&line, size);
        }
    }

    fn write_runs_line(&mut self, line: &str, size: f32) {
        let runs = split_bold_runs(line);
        if runs.len() == 1 && !runs[0].1 {
            self.write_line(&runs[0].0, size, false);
            return;
        }

        if self.y_mm < MARGIN_MM + Self::line_height(size) {
            self.force_page_break();
        }
        self.pending_ops.push(Op::StartTextSection);
        self.pending_ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(Mm(MARGIN_MM).into(), Mm(self.y_mm).into()),
        });
        self.pending_ops.push(Op::SetTextRenderingMode { mode: TextRenderingMode::Fill });
        for (run_text, bold) in runs {
            if run_text.is_empty() {
                continue;
            }
            let font = if bold { self.bold_id.clone() } else { self.regular_id.clone() };
            self.pending_ops.push(Op::SetFontSize { size: Pt(size), font: font.clone() });
            self.pending_ops.push(Op::WriteText {
                items: vec![TextItem::Text(run_text)],
                font,
            });
        }
        self.pending_ops.push(Op::EndTextSection);
        self.advance(Self::line_height(size));
    }

    fn finish(mut self) -> PdfDocument {
        self.flush_page();
        self.doc
    }
}

/// Greedy word wrap to `max_chars` per line.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Splits `line` on `**...**` delimiters into `(text, is_bold)` runs.
fn split_bold_runs(line: &str) -> Vec<(String, bool)> {
    let mut runs = Vec::new();
    let mut bold = false;
    for (index, part) in line.split("**").enumerate() {
        if index > 0 {
            bold = !bold;
        }
        if !part.is_empty() {
            runs.push((part.to_string(), bold));
        }
    }
    if runs.is_empty() {
        runs.push((String::new(), false));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headings_bullets_and_numbered_items() {
        let blocks = parse_blocks("# Title\n\n- one\n- two\n1. first\nplain text");
        assert!(matches!(blocks[0], Block::Heading(1, _)));
        assert!(matches!(blocks[1], Block::Blank));
        assert!(matches!(blocks[2], Block::Bullet(_)));
        assert!(matches!(blocks.last().unwrap(), Block::Paragraph(_)));
    }

    #[test]
    fn splits_inline_bold_runs() {
        let runs = split_bold_runs("plain **bold** plain again");
        assert_eq!(runs[0], ("plain ".to_string(), false));
        assert_eq!(runs[1], ("bold".to_string(), true));
        assert_eq!(runs[2], (" plain again".to_string(), false));
    }

    #[test]
    fn wraps_long_text_within_char_budget() {
        let long = "word ".repeat(40);
        let lines = wrap_text(&long, 30);
        assert!(lines.iter().all(|l| l.chars().count() <= 30));
        assert!(lines.len() > 1);
    }
}
