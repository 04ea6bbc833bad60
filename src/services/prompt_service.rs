//! Prompt text sent to the model service. Pure string building.

pub fn mcq_batch_prompt(instruction: &str, topic: &str) -> String {
    format!(
        "{}  Generate 5 distinct MCQs on '{}'. \
         Provide A-D options, correct letter and one-sentence explanation. \
         Format:\n1. Question: ... A) ... B) ... C) ... D) ... \
         Answer: X Explanation: ... ---",
        instruction, topic
    )
}

pub fn conceptual_prompt(instruction: &str, topic: &str, asked: &[String]) -> String {
    format!(
        "{}  Topic:{}. Do NOT repeat: {}",
        instruction,
        topic,
        render_asked(asked)
    )
}

pub fn grading_prompt(instruction: &str, question: &str, student_answer: &str) -> String {
    format!(
        "{}\nQuestion:\"{}\"\nStudent:\"{}\"\nReturn: SCORE:[0-5] MODEL:[model]",
        instruction, question, student_answer
    )
}

fn render_asked(asked: &[String]) -> String {
    let quoted: Vec<String> = asked.iter().map(|q| format!("'{}'", q)).collect();
    format!("[{}]", quoted.join(", "))
}
