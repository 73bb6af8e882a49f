use serde::{Deserialize, Serialize};
use std::fmt;

/// A graded reply to a catalog question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AnswerGrade {
    Yes,
    ProbablyYes,
    Unknown,
    ProbablyNo,
    No,
}

impl AnswerGrade {
    pub const ALL: [AnswerGrade; 5] = [
        AnswerGrade::Yes,
        AnswerGrade::ProbablyYes,
        AnswerGrade::Unknown,
        AnswerGrade::ProbablyNo,
        AnswerGrade::No,
    ];

    /// Target agreement with a trait mean: 1.0 for a flat "yes" down to 0.0 for "no".
    pub const fn agreement(self) -> f64 {
        match self {
            AnswerGrade::Yes => 1.0,
            AnswerGrade::ProbablyYes => 0.75,
            AnswerGrade::Unknown => 0.5,
            AnswerGrade::ProbablyNo => 0.25,
            AnswerGrade::No => 0.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AnswerGrade::Yes => "yes",
            AnswerGrade::ProbablyYes => "probably_yes",
            AnswerGrade::Unknown => "unknown",
            AnswerGrade::ProbablyNo => "probably_no",
            AnswerGrade::No => "no",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|grade| grade.as_str() == label)
    }
}

impl fmt::Display for AnswerGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::AnswerGrade;

    #[test]
    fn agreement_descends_from_yes_to_no() {
        let values: Vec<f64> = AnswerGrade::ALL.iter().map(|g| g.agreement()).collect();
        assert_eq!(values, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn label_roundtrip() {
        for grade in AnswerGrade::ALL {
            assert_eq!(AnswerGrade::from_label(grade.as_str()), Some(grade));
        }
        assert_eq!(AnswerGrade::from_label("maybe"), None);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&AnswerGrade::ProbablyNo).unwrap();
        assert_eq!(json, "\"probably_no\"");
        let parsed: AnswerGrade = serde_json::from_str("\"probably_yes\"").unwrap();
        assert_eq!(parsed, AnswerGrade::ProbablyYes);
    }
}
