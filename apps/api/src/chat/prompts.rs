use crate::llm_client::prompts::GROUNDING_INSTRUCTION;

const CHAT_ROLE: &str = "You are a recruiting assistant answering questions about one candidate's resume.";

pub fn chat_system_prompt() -> String {
    format!("{CHAT_ROLE} {GROUNDING_INSTRUCTION}")
}

pub fn build_chat_prompt(resume_text: &str, question: &str) -> String {
    format!("Given the following resume:\n\n{resume_text}\n\nAnswer this question:\n{question}")
}
