//! DOCX text extraction via `docx-rs`, the dependency the wider example
//! pack reaches for when a RAG ingestion pipeline needs Word documents
//! (`other_examples/manifests/cuemap-dev-cuemap/Cargo.toml`,
//! `.../WeaveITMeta-SpatialVortex/Cargo.toml`). Walks paragraphs and table
//! cells, flattening runs into plain text with paragraph breaks preserved
//! so the splitter's `\n\n` separator still has something to key on.

use crate::errors::CoreError;
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};

pub fn extract(bytes: &[u8]) -> Result<String, CoreError> {
    let docx = read_docx(bytes).map_err(|e| CoreError::LoaderFailure(format!("docx parse failed: {e}")))?;

    let mut out = String::new();
    for child in &docx.document.children {
        push_document_child(child, &mut out);
    }
    Ok(out)
}

fn push_document_child(child: &DocumentChild, out: &mut String) {
    match child {
        DocumentChild::Paragraph(p) => {
            push_paragraph_text(&p.children, out);
            out.push_str("\n\n");
        }
        DocumentChild::Table(table) => {
            for row in &table.rows {
                let TableChild::TableRow(row) = row;
                for cell in &row.cells {
                    let TableRowChild::TableCell(cell) = cell;
                    for content in &cell.children {
                        if let TableCellContent::Paragraph(p) = content {
                            push_paragraph_text(&p.children, out);
                            out.push(' ');
                        }
                    }
                }
                out.push('\n');
            }
            out.push_str("\n\n");
        }
        _ => {}
    }
}

fn push_paragraph_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(text) = run_child {
                    out.push_str(&text.text);
                }
            }
        }
    }
}
