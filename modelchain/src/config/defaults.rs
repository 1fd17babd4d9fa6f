//! Built-in stage definitions.

use crate::core::{GenerationParams, StageDefinition, StageRole};

const IDEAS_SYSTEM: &str =
    "You generate brief, topical article ideas. Be creative and diverse in your suggestions.";

const RESEARCHER_SYSTEM: &str = "You are a structured researcher creating outlines with clear \
thesis, supporting arguments, and evidence.";

const DRAFT_SYSTEM: &str = "You rewrite text for tone, persuasion, and human readability. Focus \
on creating a coherent flow between paragraphs.";

const FINAL_SYSTEM: &str = "You are a seasoned editorial writer producing fully polished \
articles. Your articles must be concise (maximum 750 words), persuasive, and have excellent \
structure with a clear thesis, supporting arguments, and memorable conclusion.";

const IDEAS_TEMPLATE: &str = "List 5 angles for an article on: {topic}";

const OUTLINE_TEMPLATE: &str = "Pick one of the following ideas and create a structured outline \
with key arguments and examples:\n{previous}";

const DRAFT_TEMPLATE: &str = "Transform this outline into a persuasive op-ed with emotional \
clarity and logical flow:\n{previous}";

const FINAL_TEMPLATE: &str = "You are a seasoned editorial writer.

Write an engaging op-ed based on the draft below. Improve clarity, structure, and tone. The final \
piece must:
- Be **no more than 750 words**
- Have a clear thesis and three supporting arguments
- End with a memorable conclusion
- Use persuasive language throughout
- Use proper markdown formatting with headings, emphasis, and well-structured paragraphs

Rewrite the following:

{previous}";

const QUALITY_TEMPLATE: &str = "You are a quality assurance editor. Evaluate the following \
article on \"{topic}\" for:
1. Clarity and coherence
2. Structure and organization
3. Persuasiveness
4. Grammar and style

Provide a brief (2-3 sentence) assessment of the article's strengths and any areas for \
improvement.

Article:
{previous}";

/// Returns the default ideas, outline, draft, final and quality stages.
#[must_use]
pub fn default_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new(StageRole::Ideas, "gemma:2b", IDEAS_SYSTEM, IDEAS_TEMPLATE)
            .with_params(GenerationParams::new(0.6, 256)),
        StageDefinition::new(
            StageRole::Outline,
            "mistral:latest",
            RESEARCHER_SYSTEM,
            OUTLINE_TEMPLATE,
        )
        .with_params(GenerationParams::new(0.7, 512)),
        StageDefinition::new(StageRole::Draft, "zephyr-7b:latest", DRAFT_SYSTEM, DRAFT_TEMPLATE)
            .with_params(GenerationParams::new(0.75, 768)),
        StageDefinition::new(StageRole::Final, "llama3:latest", FINAL_SYSTEM, FINAL_TEMPLATE)
            .with_params(GenerationParams::new(0.7, 1536)),
        StageDefinition::new(
            StageRole::Quality,
            "mistral:latest",
            RESEARCHER_SYSTEM,
            QUALITY_TEMPLATE,
        )
        .with_params(GenerationParams::new(0.7, 512)),
    ]
}
