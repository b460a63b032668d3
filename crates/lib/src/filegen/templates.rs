//! Prompt templates and search-term extraction for the File Generator.
//! Output is Brazilian Portuguese, matching the fixed-wording conventions
//! `rag.rs::educational_query` already follows for the same reason: this
//! assistant's user-facing copy is Portuguese throughout.

use crate::models::FileType;

const STOP_WORDS: &[&str] = &[
    "create", "generate", "make", "about", "with", "guide", "quiz", "crie", "sobre", "perguntas",
    "alternativas", "tema",
];

/// Lowercase, strip non-alphanumerics, drop short tokens and the stop
/// set, keep the first five remaining tokens.
pub fn extract_search_terms(prompt: &str) -> String {
    prompt
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| tok.chars().count() > 3)
        .filter(|tok| !STOP_WORDS.contains(tok))
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct TemplateInputs<'a> {
    pub prompt: &'a str,
    pub context: &'a str,
    pub project_name: &'a str,
    pub subject: &'a str,
    pub base_content: Option<&'a str>,
}

/// Builds the full chat-model prompt for `file_type`, choosing the edit
/// template when `base_content` is present and the fresh-generation
/// template otherwise.
pub fn render_template(file_type: FileType, inputs: &TemplateInputs) -> String {
    match inputs.base_content {
        Some(base_content) => render_edit_template(file_type, inputs, base_content),
        None => render_fresh_template(file_type, inputs),
    }
}

fn render_fresh_template(file_type: FileType, inputs: &TemplateInputs) -> String {
    let skeleton = match file_type {
        FileType::StudyGuide => {
            "Crie um guia de estudos completo e bem organizado em Markdown, com títulos (#), \
             subtítulos (##) e listas onde apropriado."
        }
        FileType::Quiz => {
            "Crie um quiz em Markdown com EXATAMENTE esta estrutura:\n\
             ## Instructions\n<instruções breves>\n\n\
             ## Questions\n### Question 1\n<enunciado>\nA. ...\nB. ...\nC. ...\nD. ...\n\
             (repita para cada questão)\n\n## Gabarito (Answer Key)\n<respostas corretas>"
        }
        FileType::Summary => "Crie um resumo detalhado e conciso em Markdown.",
        FileType::LessonPlan => {
            "Crie um plano de aula estruturado em Markdown, com objetivos, atividades e avaliação."
        }
        FileType::Custom => "Atenda ao pedido abaixo, produzindo saída em Markdown bem formatado.",
    };

    format!(
        "{skeleton}\n\n\
         Projeto: {}\n\
         Assunto: {}\n\
         Pedido do usuário: {}\n\n\
         Contexto dos documentos:\n{}\n",
        inputs.project_name, inputs.subject, inputs.prompt, inputs.context
    )
}

fn render_edit_template(file_type: FileType, inputs: &TemplateInputs, base_content: &str) -> String {
    let skeleton = match file_type {
        FileType::Quiz => {
            "Revise o quiz abaixo conforme o pedido, preservando a estrutura \
             '## Instructions / ## Questions / ### Question N / ## Gabarito (Answer Key)'."
        }
        _ => "Revise o conteúdo abaixo em Markdown conforme o pedido do usuário, mantendo o mesmo formato geral.",
    };

    format!(
        "{skeleton}\n\n\
         Projeto: {}\n\
         Assunto: {}\n\
         Pedido de edição: {}\n\n\
         Conteúdo atual:\n{}\n\n\
         Contexto adicional dos documentos:\n{}\n",
        inputs.project_name, inputs.subject, inputs.prompt, base_content, inputs.context
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stop_words_and_short_tokens_keeping_first_five() {
        let terms = extract_search_terms("Crie um quiz sobre fotossintese em plantas verdes rapido");
        assert_eq!(terms, "fotossintese plantas verdes rapido");
    }

    #[test]
    fn fresh_template_embeds_quiz_structure_markers() {
        let inputs = TemplateInputs {
            prompt: "ciclo da agua",
            context: "chunk text",
            project_name: "Biologia",
            subject: "ciclo da agua",
            base_content: None,
        };
        let rendered = render_template(FileType::Quiz, &inputs);
        assert!(rendered.contains("## Instructions"));
        assert!(rendered.contains("## Gabarito (Answer Key)"));
    }

    #[test]
    fn edit_template_includes_base_content() {
        let inputs = TemplateInputs {
            prompt: "adicione mais uma secao",
            context: "",
            project_name: "Biologia",
            subject: "ciclo da agua",
            base_content: Some("# Resumo anterior"),
        };
        let rendered = render_template(FileType::Summary, &inputs);
        assert!(rendered.contains("# Resumo anterior"));
    }
}
