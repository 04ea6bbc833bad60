use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [OptionLetter::A, OptionLetter::B, OptionLetter::C, OptionLetter::D];

    pub fn index(self) -> usize {
        match self {
            OptionLetter::A => 0,
            OptionLetter::B => 1,
            OptionLetter::C => 2,
            OptionLetter::D => 3,
        }
    }

    pub fn as_char(self) -> char {
        (b'A' + self.index() as u8) as char
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parses `"B"`, `"b"` or the radio display form `"B) 12 N"`.
impl FromStr for OptionLetter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next();
        let rest = chars.as_str();
        if !(rest.is_empty() || rest.starts_with(')')) {
            return Err(Error::BadRequest(format!("Not an option letter: {}", s)));
        }
        match letter.map(|c| c.to_ascii_uppercase()) {
            Some('A') => Ok(OptionLetter::A),
            Some('B') => Ok(OptionLetter::B),
            Some('C') => Ok(OptionLetter::C),
            Some('D') => Ok(OptionLetter::D),
            _ => Err(Error::BadRequest(format!("Not an option letter: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqRecord {
    pub question: String,
    pub options: [String; 4],
    pub correct_letter: OptionLetter,
    pub explanation: String,
}

impl McqRecord {
    pub fn option(&self, letter: OptionLetter) -> &str {
        &self.options[letter.index()]
    }

    /// `"C) text"` labels in A-D order, as shown to the student.
    pub fn labelled_options(&self) -> Vec<String> {
        OptionLetter::ALL
            .iter()
            .map(|l| format!("{}) {}", l, self.option(*l)))
            .collect()
    }
}
