use super::trait_belief::TraitId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a catalog question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// An askable question bound to exactly one trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(rename = "trait")]
    pub trait_id: TraitId,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        trait_id: impl Into<String>,
    ) -> Self {
        Self {
            id: QuestionId::new(id),
            text: text.into(),
            trait_id: TraitId::new(trait_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Question;

    #[test]
    fn serializes_trait_under_short_key() {
        let question = Question::new("q_flies", "Does your character fly?", "flies");
        let json = serde_json::to_string(&question).unwrap();
        assert!(json.contains("\"trait\":\"flies\""));
        let parsed: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, question);
    }
}
