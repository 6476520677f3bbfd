//! Prompt budgeting: turn retrieved chunks into a bounded request body.

use crate::processing::Chunk;

/// Default character cap for the paper text embedded in a prompt.
pub const DEFAULT_CONTEXT_MAX_CHARS: usize = 10_000;

const SEPARATOR: &str = "\n\n";

const SUMMARY_INSTRUCTIONS: &str = "\
Provide a detailed, structured summary of this research paper. For each section, include the key points and findings:

1. Abstract: Summarize the main objectives and key findings
2. Introduction: Key background information and research goals
3. Methodology: Main approaches and techniques used
4. Results/Findings: Key outcomes and discoveries
5. Discussion: Main interpretations and implications
6. Conclusions: Final takeaways and future work

Please maintain the section headers in the summary and organize the information clearly under each section. Include any significant technical details, methodologies, or findings specific to each section.";

/// Chunks selected to fit within a character budget, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    sections: Vec<String>,
    total_chars: usize,
    dropped: usize,
}

impl PromptContext {
    /// Select the longest prefix of `chunks` whose formatted text fits in `max_chars`.
    ///
    /// Each chunk renders as `(Page N): content`, and sections are joined by a blank line.
    /// Separators count toward the budget. Selection stops at the first chunk that does not
    /// fit; later chunks are never considered even if they are shorter.
    pub fn from_chunks(chunks: &[Chunk], max_chars: usize) -> Self {
        let separator_chars = SEPARATOR.chars().count();
        let mut sections = Vec::new();
        let mut total_chars = 0usize;

        for chunk in chunks {
            let section = format!("(Page {}): {}", chunk.page, chunk.content);
            let section_chars = section.chars().count();
            let joined = if sections.is_empty() {
                section_chars
            } else {
                section_chars + separator_chars
            };
            if total_chars + joined > max_chars {
                break;
            }
            total_chars += joined;
            sections.push(section);
        }

        let dropped = chunks.len() - sections.len();
        Self {
            sections,
            total_chars,
            dropped,
        }
    }

    /// Formatted sections in selection order.
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Number of chunks that fit.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no chunk fit in the budget.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Characters of the joined context, separators included.
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Chunks left out because the budget ran out.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// The selected sections joined with blank lines.
    pub fn text(&self) -> String {
        self.sections.join(SEPARATOR)
    }

    /// Render the full instruction prompt around the selected paper text.
    pub fn to_prompt(&self) -> String {
        format!(
            "{SUMMARY_INSTRUCTIONS}\n\nPaper text:\n{}\n",
            self.text()
        )
    }
}
