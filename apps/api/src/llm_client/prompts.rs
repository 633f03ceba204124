// Prompt fragments shared across features.
// Each feature that calls the LLM keeps its own prompts.rs alongside it.

/// Keeps answers tied to the resume text that was supplied.
pub const GROUNDING_INSTRUCTION: &str = "\
    Base every statement on the resume text provided. \
    Do NOT infer, interpolate, or invent details. \
    If the resume does not contain the information, say so plainly.";
