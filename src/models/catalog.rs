use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Chapter {
    pub name: &'static str,
    pub topics: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DifficultyBand {
    pub id: &'static str,
    pub label: &'static str,
    pub instruction: &'static str,
}

impl DifficultyBand {
    /// Display form used by the setup screen, e.g. `3 – IGCSE 9-10`.
    pub fn display_name(&self) -> String {
        format!("{}{}{}", self.id, BAND_SEPARATOR, self.label)
    }
}

pub const BAND_SEPARATOR: &str = " – ";

pub static CHAPTERS: &[Chapter] = &[
    Chapter {
        name: "Mechanics",
        topics: &["Kinematics", "Dynamics", "Work/Energy", "Momentum", "Circular Motion"],
    },
    Chapter {
        name: "Waves",
        topics: &["Wave Basics", "Interference", "Doppler Effect"],
    },
    Chapter {
        name: "Thermal Physics",
        topics: &["Temperature & Heat", "Ideal Gases"],
    },
    Chapter {
        name: "Electricity & Magnetism",
        topics: &["Electric Fields", "Circuits", "Induction"],
    },
    Chapter {
        name: "Modern Physics",
        topics: &["Quantum Theory", "Relativity"],
    },
];

pub static DIFFICULTY_BANDS: &[DifficultyBand] = &[
    DifficultyBand {
        id: "1",
        label: "IGCSE 6-8",
        instruction: "Checkpoint-style one-sentence conceptual question (no maths).",
    },
    DifficultyBand {
        id: "2",
        label: "MYP 5",
        instruction: "Real-world conceptual question that needs critical thinking.",
    },
    DifficultyBand {
        id: "3",
        label: "IGCSE 9-10",
        instruction: "Short, straightforward core-paper question. Avoid algebra.",
    },
    DifficultyBand {
        id: "4",
        label: "IB DP 11-12",
        instruction: "Quantitative IB DP problem requiring calculation and units.",
    },
    DifficultyBand {
        id: "5",
        label: "CBSE 10",
        instruction: "CBSE Class-10 board-paper style conceptual/numerical question.",
    },
    DifficultyBand {
        id: "6",
        label: "CBSE 11",
        instruction: "CBSE Class-11 question – mostly conceptual with light maths.",
    },
    DifficultyBand {
        id: "7",
        label: "CBSE 12",
        instruction: "CBSE Class-12 board-style numerical / reasoning question.",
    },
    DifficultyBand {
        id: "8",
        label: "ICSE 10",
        instruction: "ICSE Class-10 physics past-paper style conceptual question.",
    },
    DifficultyBand {
        id: "9",
        label: "AS Level",
        instruction: "Cambridge AS-Level structured calculation question.",
    },
    DifficultyBand {
        id: "10",
        label: "A Level",
        instruction: "Full A-Level Paper-2 multi-step question with explanation.",
    },
];

pub fn chapters() -> &'static [Chapter] {
    CHAPTERS
}

pub fn topics_for(chapter: &str) -> Option<&'static [&'static str]> {
    CHAPTERS.iter().find(|c| c.name == chapter).map(|c| c.topics)
}

/// Looks a band up by id. Accepts the display form (`"3 – IGCSE 9-10"`) too.
pub fn band(selection: &str) -> Option<&'static DifficultyBand> {
    let id = selection
        .split(BAND_SEPARATOR)
        .next()
        .unwrap_or(selection)
        .trim();
    DIFFICULTY_BANDS.iter().find(|b| b.id == id)
}

pub fn validate_selection(
    chapter: &str,
    topic: &str,
    band_selection: &str,
) -> Result<&'static DifficultyBand> {
    let topics = topics_for(chapter)
        .ok_or_else(|| Error::BadRequest(format!("Unknown chapter: {}", chapter)))?;
    if !topics.contains(&topic) {
        return Err(Error::BadRequest(format!(
            "Topic '{}' does not belong to chapter '{}'",
            topic, chapter
        )));
    }
    band(band_selection)
        .ok_or_else(|| Error::BadRequest(format!("Unknown difficulty band: {}", band_selection)))
}
