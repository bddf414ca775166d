//! Prompt templates for summarization and question answering.

/// Summarization prompt for text and table chunks.
const TEXT_TABLE_SUMMARY_TEMPLATE: &str = "\
You are a school teaching assistant.
Summarize clearly with key facts, definitions, and explanations.

{content}";

/// Instruction sent with each extracted image.
pub const IMAGE_SUMMARY_INSTRUCTION: &str = "\
Describe this image for a school textbook. \
Focus on what is shown and its educational relevance.";

/// Question-answering prompt over retrieved context.
const QA_TEMPLATE: &str = "\
You are a school teaching assistant.

Use ONLY the provided context to answer the question.
If the answer is not present, say:
\"I don't have enough information from the book.\"

Context:
{context}

Question:
{question}

Answer clearly and concisely:";

/// Question-answering preamble for image context.
const VISION_QA_TEMPLATE: &str = "\
You are a vision-capable teacher AI.

Analyze the images below and answer the question.
Use only what is visible in the images.
{summaries}
Question:
{question}

Answer:";

pub fn text_table_summary_prompt(content: &str) -> String {
    TEXT_TABLE_SUMMARY_TEMPLATE.replace("{content}", content)
}

pub fn qa_prompt(context: &str, question: &str) -> String {
    QA_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Vision QA prompt. `fallback_summaries` carries numbered summaries for
/// images whose raw bytes are no longer on disk.
pub fn vision_qa_prompt(fallback_summaries: &[String], question: &str) -> String {
    let summaries = if fallback_summaries.is_empty() {
        String::new()
    } else {
        let mut block = String::from("\nImage summaries:\n");
        for (i, s) in fallback_summaries.iter().enumerate() {
            block.push_str(&format!("[Image {}]: {}\n", i + 1, s));
        }
        block
    };
    VISION_QA_TEMPLATE
        .replace("{summaries}", &summaries)
        .replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_embeds_content() {
        let p = text_table_summary_prompt("The mitochondria is the powerhouse of the cell.");
        assert!(p.contains("mitochondria"));
        assert!(p.contains("teaching assistant"));
        assert!(!p.contains("{content}"));
    }

    #[test]
    fn test_qa_prompt_embeds_context_and_question() {
        let p = qa_prompt("Chapter 3 summary.", "What is refraction?");
        assert!(p.contains("Chapter 3 summary."));
        assert!(p.contains("What is refraction?"));
        assert!(p.contains("I don't have enough information from the book."));
    }

    #[test]
    fn test_vision_prompt_numbers_fallback_summaries() {
        let p = vision_qa_prompt(
            &["A prism splitting light.".to_string(), "A ray diagram.".to_string()],
            "What does the figure show?",
        );
        assert!(p.contains("[Image 1]: A prism splitting light."));
        assert!(p.contains("[Image 2]: A ray diagram."));
    }

    #[test]
    fn test_vision_prompt_without_summaries_has_no_block() {
        let p = vision_qa_prompt(&[], "What does the figure show?");
        assert!(!p.contains("Image summaries:"));
    }
}
