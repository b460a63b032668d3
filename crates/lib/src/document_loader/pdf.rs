//! PDF text extraction: walk every page's content stream and concatenate
//! `TextDraw`/`TextDrawAdjusted` operands.

use crate::errors::CoreError;
use ::pdf::content::{Op, TextDrawAdjusted};
use ::pdf::file::FileOptions;

pub fn extract(bytes: &[u8]) -> Result<String, CoreError> {
    let file = FileOptions::cached()
        .load(bytes)
        .map_err(|e| CoreError::LoaderFailure(format!("pdf parse failed: {e}")))?;
    let resolver = file.resolver();
    let mut full_text = String::new();

    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| CoreError::LoaderFailure(format!("pdf page {page_num} failed: {e}")))?;

        let Some(content) = &page.contents else {
            continue;
        };
        let operations = content
            .operations(&resolver)
            .map_err(|e| CoreError::LoaderFailure(format!("pdf ops {page_num} failed: {e}")))?;

        for op in operations.iter() {
            match op {
                Op::TextDraw { text } => full_text.push_str(&text.to_string_lossy()),
                Op::TextDrawAdjusted { array } => {
                    for item in array.iter() {
                        if let TextDrawAdjusted::Text(text) = item {
                            full_text.push_str(&text.to_string_lossy());
                        }
                    }
                }
                _ => {}
            }
        }
        full_text.push_str("\n\n");
    }

    Ok(full_text)
}
