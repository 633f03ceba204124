// Prompt constants for side-by-side resume comparison.

/// Axes every comparison covers, in report order.
pub const COMPARISON_DIMENSIONS: [&str; 5] = [
    "Total experience",
    "Skills",
    "Projects",
    "Technical expertise",
    "Education",
];

pub const COMPARE_SYSTEM: &str = "You are an experienced technical recruiter comparing two \
    candidates from their resumes. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Expected shape of the model's reply.
const COMPARE_SCHEMA: &str = r#"Return a JSON object with this EXACT schema:
{
  "summary": "two or three sentences on how the candidates differ overall",
  "dimensions": [
    {"dimension": "Total experience", "first": "what resume 1 shows", "second": "what resume 2 shows"}
  ]
}

Include one entry per dimension, using the dimension names exactly as given."#;

pub fn build_compare_prompt(
    grounding_instruction: &str,
    first_name: &str,
    first_text: &str,
    second_name: &str,
    second_text: &str,
) -> String {
    let dimensions = COMPARISON_DIMENSIONS.join(", ");
    format!(
        "{grounding_instruction}\n\n\
         Compare the following two resumes.\n\n\
         Resume 1 ({first_name}):\n{first_text}\n\n\
         Resume 2 ({second_name}):\n{second_text}\n\n\
         Summarize and compare them along these dimensions: {dimensions}.\n\n\
         {COMPARE_SCHEMA}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_both_resumes_and_every_dimension() {
        let prompt = build_compare_prompt("Be factual.", "a.pdf", "Python {x}", "b.pdf", "Java");
        assert!(prompt.starts_with("Be factual.\n\nCompare the following two resumes."));
        assert!(prompt.contains("Resume 1 (a.pdf):\nPython {x}\n\n"));
        assert!(prompt.contains("Resume 2 (b.pdf):\nJava\n\n"));
        for dimension in COMPARISON_DIMENSIONS {
            assert!(prompt.contains(dimension));
        }
    }
}
