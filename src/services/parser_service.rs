use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::models::question::{McqRecord, OptionLetter};
use crate::models::quiz_session::{CONCEPTUAL_MAX_POINTS, MCQ_QUESTIONS};

static MCQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\d+\.\s*Question:\s*(.*?)\s*A\)\s*(.*?)\s*B\)\s*(.*?)\s*C\)\s*(.*?)\s*D\)\s*(.*?)\s*Answer:\s*([A-D])\s*Explanation:\s*([\s\S]*?)(?:---|$)",
    )
    .expect("MCQ pattern compiles")
});

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SCORE:\s*(\d+)").expect("score pattern compiles"));

const MODEL_MARKER: &str = "MODEL:";

/// Best-effort extraction; blocks that do not match the format are skipped.
pub fn parse_mcq_batch(text: &str) -> Vec<McqRecord> {
    MCQ_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let letter: OptionLetter = caps[6].parse().ok()?;
            Some(McqRecord {
                question: caps[1].trim().to_string(),
                options: [
                    caps[2].trim().to_string(),
                    caps[3].trim().to_string(),
                    caps[4].trim().to_string(),
                    caps[5].trim().to_string(),
                ],
                correct_letter: letter,
                explanation: caps[7].trim().to_string(),
            })
        })
        .collect()
}

/// Exactly five records, or a parse error when the reply held fewer.
pub fn require_mcq_batch(text: &str) -> Result<Vec<McqRecord>> {
    let mut records = parse_mcq_batch(text);
    if records.len() < MCQ_QUESTIONS {
        return Err(Error::Parse(format!(
            "expected {} multiple-choice questions, found {}",
            MCQ_QUESTIONS,
            records.len()
        )));
    }
    records.truncate(MCQ_QUESTIONS);
    Ok(records)
}

/// Returns `(raw points 0..=5, model answer)`.
pub fn parse_grade_reply(text: &str) -> Result<(u32, String)> {
    let caps = SCORE_RE
        .captures(text)
        .ok_or_else(|| Error::Parse("grading reply has no SCORE: field".to_string()))?;
    let points: u32 = caps[1]
        .parse()
        .map_err(|_| Error::Parse(format!("SCORE value '{}' is not a number", &caps[1])))?;
    if points > CONCEPTUAL_MAX_POINTS {
        return Err(Error::Parse(format!(
            "SCORE {} is outside 0..={}",
            points, CONCEPTUAL_MAX_POINTS
        )));
    }

    let model_answer = match text.split_once(MODEL_MARKER) {
        Some((_, rest)) => rest.trim(),
        None => text.trim(),
    };
    Ok((points, model_answer.to_string()))
}
