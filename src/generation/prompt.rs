//! Prompt variants and rendering.
//!
//! Every variant shares the same grounding rules and differs only in how it asks the model
//! to lay out the answer.

use std::fmt::{self, Write as _};

use crate::processing::types::RetrievedPassage;

/// Reply the model is told to give when the context does not cover the question.
pub const INSUFFICIENT_CONTEXT_REPLY: &str =
    "I do not have enough medical information to answer with certainty.";

const SYSTEM_PROMPT: &str = "\
You are a medical assistant specialised in first aid and general medicine. Answer ONLY with \
information found in the medical guides provided as context.

Rules:
- Use only the information in the context; never invent or assume facts.
- Search the whole context actively, including passages where the topic is mixed with others.
- Use partial information when it is relevant and include every important detail.
- Only when nothing in the context is relevant, reply exactly: \"{fallback}\"";

const STRUCTURED_SECTIONS: &str = "\
**Assessment:** how to recognise or assess the condition.
**First aid steps:** every step mentioned in the context, numbered.
**Warning signs / when to seek help:** danger signs and emergencies.
**Treatment and recommendations:** aftercare and treatment.
**Important notes:** precautions and contraindications.";

const FEW_SHOT_EXAMPLES: &str = "\
Example 1
Question: What should I do if someone has a burn?
Answer: **Assessment:** Determine the depth of the burn as described in the context.
**First aid steps:** 1. Cool the area with running water. 2. Cover with sterile gauze. 3. Do not apply creams.
**Warning signs:** Seek medical help if the burn is large or deep.

Example 2
Question: How do I treat a bleeding wound?
Answer: **First aid steps:** 1. Press directly on the wound with sterile gauze. 2. Raise the limb if possible. 3. Keep pressure until the bleeding stops.
**Warning signs:** If bleeding continues after 10 minutes, seek medical help immediately.";

const CHAIN_OF_THOUGHT_STEPS: &str = "\
Work through these steps:
1. Context analysis: identify which passages relate to the question and cite them by number.
2. Evaluation: decide whether the information is complete or partial and what it covers.
3. Answer: write a structured answer covering assessment, first aid steps, warning signs, \
recommendations and precautions.
4. Verification: check that every statement comes from the context.";

const STRICT_SECTIONS: &str = "\
Answer using EXACTLY this format. Write \"Not specified in the context\" for any section the \
context does not cover.

=== ASSESSMENT ===
=== FIRST AID STEPS ===
=== WARNING SIGNS / WHEN TO SEEK HELP ===
=== TREATMENT AND RECOMMENDATIONS ===
=== IMPORTANT NOTES ===";

/// Prompt engineering style requested for an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptVariant {
    /// Sectioned answer with assessment, steps, warnings, and notes.
    #[default]
    Default,
    /// Sectioned answer guided by worked examples.
    FewShot,
    /// Step-by-step reasoning before the answer.
    ChainOfThought,
    /// Rigid fixed-heading format.
    Structured,
    /// Short, direct answer.
    Direct,
}

impl PromptVariant {
    /// Every variant, in declaration order.
    pub const ALL: [PromptVariant; 5] = [
        PromptVariant::Default,
        PromptVariant::FewShot,
        PromptVariant::ChainOfThought,
        PromptVariant::Structured,
        PromptVariant::Direct,
    ];

    /// Parse a variant name case-insensitively. Unknown or missing names yield `Default`.
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name.map(str::trim).filter(|value| !value.is_empty()) else {
            return Self::Default;
        };

        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                tracing::debug!(prompt_type = name, "Unknown prompt type; using default");
                Self::Default
            })
    }

    /// Wire name of the variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::FewShot => "few_shot",
            Self::ChainOfThought => "chain_of_thought",
            Self::Structured => "structured",
            Self::Direct => "direct",
        }
    }

    /// Render the full prompt for `question` grounded on `passages`.
    pub fn render(self, question: &str, passages: &[RetrievedPassage]) -> String {
        let system = SYSTEM_PROMPT.replace("{fallback}", INSUFFICIENT_CONTEXT_REPLY);
        let context = render_context(passages);
        let instructions = match self {
            Self::Default => format!(
                "Review the whole context carefully and give a complete, detailed answer. \
                 Include every step or procedure mentioned. Use the sections that apply:\n\n\
                 {STRUCTURED_SECTIONS}"
            ),
            Self::FewShot => format!(
                "Give a complete, detailed answer using only the context. Follow the format and \
                 level of detail of these examples:\n\n{FEW_SHOT_EXAMPLES}\n\n\
                 Now answer the user's question in the same way."
            ),
            Self::ChainOfThought => CHAIN_OF_THOUGHT_STEPS.to_string(),
            Self::Structured => STRICT_SECTIONS.to_string(),
            Self::Direct => "Answer directly and concisely using only the context. Include \
                             the steps, symptoms, treatments or recommendations it mentions."
                .to_string(),
        };

        format!(
            "{system}\n\n<context>\n{context}\n</context>\n\nQuestion: {question}\n\n{instructions}"
        )
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number passages and label each with its source and page range.
pub fn render_context(passages: &[RetrievedPassage]) -> String {
    let mut context = String::new();
    for (index, passage) in passages.iter().enumerate() {
        if index > 0 {
            context.push_str("\n\n");
        }
        let source = &passage.source;
        let _ = write!(context, "[{}] {}", index + 1, source.source);
        match (source.page_start, source.page_end) {
            (Some(start), Some(end)) if start != end => {
                let _ = write!(context, " (pages {start}-{end})");
            }
            (Some(page), _) | (None, Some(page)) => {
                let _ = write!(context, " (page {page})");
            }
            (None, None) => {}
        }
        context.push('\n');
        context.push_str(passage.text.trim());
    }
    context
}

/// Prompt asking the model to rewrite a follow-up as a standalone question.
pub fn condense_question_prompt(history: &[(String, String)], question: &str) -> String {
    let mut transcript = String::new();
    for (asked, answered) in history {
        let _ = writeln!(transcript, "User: {asked}");
        let _ = writeln!(transcript, "Assistant: {answered}");
    }

    format!(
        "Given the following conversation and a follow-up question, rephrase the follow-up \
         question to be a standalone question, in its original language.\n\n\
         Chat history:\n{transcript}\nFollow-up question: {question}\nStandalone question:"
    )
}
