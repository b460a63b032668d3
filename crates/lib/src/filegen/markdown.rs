//! Markdown artifact materialization: front-matter plus the model's raw
//! Markdown body, written out as UTF-8 bytes ready for
//! `ObjectStorage::put`.

use chrono::{DateTime, Utc};

use crate::models::FileType;

pub fn render(
    display_name: &str,
    file_type: FileType,
    generated_at: DateTime<Utc>,
    project_name: &str,
    version: u32,
    body: &str,
) -> Vec<u8> {
    let front_matter = format!(
        "---\ntitle: {display_name}\ntype: {}\nproject: {project_name}\nversion: {version}\ngenerated_at: {}\n---\n\n",
        file_type_label(file_type),
        generated_at.to_rfc3339(),
    );
    let mut out = String::with_capacity(front_matter.len() + body.len());
    out.push_str(&front_matter);
    out.push_str(body.trim_end());
    out.push('\n');
    out.into_bytes()
}

fn file_type_label(file_type: FileType) -> &'static str {
    match file_type {
        FileType::StudyGuide => "study_guide",
        FileType::Quiz => "quiz",
        FileType::Summary => "summary",
        FileType::LessonPlan => "lesson_plan",
        FileType::Custom => "custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_includes_title_type_project_and_version() {
        let rendered = render("Biology Quiz", FileType::Quiz, Utc::now(), "Biology 101", 2, "## Instructions\n...");
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.starts_with("---\ntitle: Biology Quiz\ntype: quiz\nproject: Biology 101\nversion: 2\n"));
        assert!(text.contains("## Instructions"));
    }

    #[test]
    fn body_is_trimmed_and_single_trailing_newline() {
        let rendered = render("X", FileType::Summary, Utc::now(), "Project", 1, "content\n\n\n");
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.ends_with("content\n"));
        assert!(!text.ends_with("content\n\n"));
    }
}
