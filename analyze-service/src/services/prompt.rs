//! Instruction prompts sent alongside the image.

use std::fmt;
use std::str::FromStr;

const NOTES_PROMPT: &str = r#"Analyze this image containing handwritten or typed notes/text.

Respond appropriately based on the content:

1. If it's a question (any subject including general knowledge, science, math, history, etc.), provide a detailed answer.
2. If it's a statement or fact, provide additional context or related information.
3. If it's a mathematical expression or equation, explain it and provide the solution if applicable.
4. If it's related to chemistry, biology, physics, or any other science, provide relevant explanations.
5. If it's a simple greeting or casual text, respond conversationally.
6. If it contains multiple topics, address each one separately.

Format your response using Markdown for better readability:
- Use headings (##) for main sections
- Use bullet points or numbered lists where appropriate
- Use **bold** for emphasis on important points
- Use mathematical notation with LaTeX where appropriate (e.g., $E=mc^2$)
- Include relevant examples to illustrate concepts

If diagrams or images would help explain the concept, describe them clearly."#;

const DETAILED_PROMPT: &str = r#"Analyze this handwritten content and provide a detailed explanation. Consider the following aspects:

1. If it's a mathematical expression or equation:
   - Explain the mathematical concepts involved
   - Break down the steps if it's a calculation
   - Provide the solution if applicable
   - Explain any formulas or theorems used

2. If it's a chemical formula or equation:
   - Identify the elements and compounds
   - Explain the chemical reaction if present
   - Describe the properties and significance
   - Explain any chemical principles involved

3. If it's a physics formula or concept:
   - Explain the physical principles
   - Describe the variables and their meanings
   - Explain the applications and significance
   - Provide relevant examples

4. If it's a general note or text:
   - Summarize the main points
   - Explain key concepts
   - Provide context and significance
   - Suggest related topics or further reading

Provide a clear, detailed explanation that would help someone understand the content thoroughly."#;

/// Which instruction text accompanies the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Answers questions, explains any subject, replies in Markdown with LaTeX.
    #[default]
    Notes,
    /// Structured explanation for math, chemistry, physics and general notes.
    Detailed,
}

impl PromptStyle {
    pub fn text(self) -> &'static str {
        match self {
            PromptStyle::Notes => NOTES_PROMPT,
            PromptStyle::Detailed => DETAILED_PROMPT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PromptStyle::Notes => "notes",
            PromptStyle::Detailed => "detailed",
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notes" => Ok(PromptStyle::Notes),
            "detailed" => Ok(PromptStyle::Detailed),
            other => Err(anyhow::anyhow!(
                "unknown prompt style '{}' (expected 'notes' or 'detailed')",
                other
            )),
        }
    }
}
