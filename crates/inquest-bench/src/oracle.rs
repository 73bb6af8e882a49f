use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use inquest_core::model::{AnswerGrade, Catalog};

use crate::config::OracleConfig;

/// Answers questions on behalf of a hidden character.
///
/// The honest grade comes from the character's trait mean through fixed
/// bands. Noise degrades it: with `lie_rate` the mean is read inverted, and
/// with `unknown_rate` the oracle shrugs regardless of the trait.
pub struct Oracle {
    unknown_rate: f64,
    lie_rate: f64,
    rng: StdRng,
}

impl Oracle {
    pub fn new(config: &OracleConfig, seed: u64) -> Self {
        Self {
            unknown_rate: config.unknown_rate,
            lie_rate: config.lie_rate,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Grades `question` for the hidden character at index `hidden`.
    pub fn grade(&mut self, catalog: &Catalog, hidden: usize, question: usize) -> AnswerGrade {
        let roll: f64 = self.rng.gen_range(0.0..1.0);
        let mean = catalog.question_mean(hidden, question);
        if roll < self.lie_rate {
            grade_for_mean(1.0 - mean)
        } else if roll < self.lie_rate + self.unknown_rate {
            AnswerGrade::Unknown
        } else {
            grade_for_mean(mean)
        }
    }
}

/// Bands are centered on the five agreement targets (0.9, 0.7, 0.5, 0.3, 0.1).
fn grade_for_mean(mean: f64) -> AnswerGrade {
    if mean >= 0.8 {
        AnswerGrade::Yes
    } else if mean >= 0.6 {
        AnswerGrade::ProbablyYes
    } else if mean > 0.4 {
        AnswerGrade::Unknown
    } else if mean > 0.2 {
        AnswerGrade::ProbablyNo
    } else {
        AnswerGrade::No
    }
}

#[cfg(test)]
mod tests {
    use super::{Oracle, grade_for_mean};
    use crate::config::OracleConfig;
    use inquest_core::model::{AnswerGrade, Catalog, Character, Question};

    fn banded_catalog() -> Catalog {
        Catalog::new(
            vec![
                Character::new("char_probe", "Probe")
                    .with_trait("strong_yes", 9.0, 1.0)
                    .with_trait("lean_yes", 7.0, 3.0)
                    .with_trait("coin", 1.0, 1.0)
                    .with_trait("lean_no", 3.0, 7.0)
                    .with_trait("strong_no", 1.0, 9.0),
                Character::new("char_other", "Other"),
            ],
            vec![
                Question::new("q0", "Strong yes?", "strong_yes"),
                Question::new("q1", "Lean yes?", "lean_yes"),
                Question::new("q2", "Coin?", "coin"),
                Question::new("q3", "Lean no?", "lean_no"),
                Question::new("q4", "Strong no?", "strong_no"),
            ],
        )
        .unwrap()
    }

    fn silent(unknown_rate: f64, lie_rate: f64) -> OracleConfig {
        OracleConfig {
            unknown_rate,
            lie_rate,
        }
    }

    #[test]
    fn noise_free_grades_follow_the_trait_means() {
        let catalog = banded_catalog();
        let mut oracle = Oracle::new(&silent(0.0, 0.0), 1);

        assert_eq!(oracle.grade(&catalog, 0, 0), AnswerGrade::Yes);
        assert_eq!(oracle.grade(&catalog, 0, 1), AnswerGrade::ProbablyYes);
        assert_eq!(oracle.grade(&catalog, 0, 2), AnswerGrade::Unknown);
        assert_eq!(oracle.grade(&catalog, 0, 3), AnswerGrade::ProbablyNo);
        assert_eq!(oracle.grade(&catalog, 0, 4), AnswerGrade::No);
    }

    #[test]
    fn unscored_traits_read_as_unknown() {
        let catalog = banded_catalog();
        let mut oracle = Oracle::new(&silent(0.0, 0.0), 1);
        assert_eq!(oracle.grade(&catalog, 1, 0), AnswerGrade::Unknown);
    }

    #[test]
    fn a_certain_liar_inverts_the_reading() {
        let catalog = banded_catalog();
        let mut oracle = Oracle::new(&silent(0.0, 1.0), 1);
        assert_eq!(oracle.grade(&catalog, 0, 0), AnswerGrade::No);
        assert_eq!(oracle.grade(&catalog, 0, 4), AnswerGrade::Yes);
    }

    #[test]
    fn a_full_unknown_rate_always_shrugs() {
        let catalog = banded_catalog();
        let mut oracle = Oracle::new(&silent(1.0, 0.0), 1);
        for question in 0..catalog.question_count() {
            assert_eq!(oracle.grade(&catalog, 0, question), AnswerGrade::Unknown);
        }
    }

    #[test]
    fn draws_are_deterministic_per_seed() {
        let catalog = banded_catalog();
        let config = silent(0.3, 0.1);

        let a: Vec<AnswerGrade> = {
            let mut oracle = Oracle::new(&config, 77);
            (0..20).map(|_| oracle.grade(&catalog, 0, 0)).collect()
        };
        let b: Vec<AnswerGrade> = {
            let mut oracle = Oracle::new(&config, 77);
            (0..20).map(|_| oracle.grade(&catalog, 0, 0)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn band_edges_round_toward_certainty() {
        assert_eq!(grade_for_mean(0.8), AnswerGrade::Yes);
        assert_eq!(grade_for_mean(0.6), AnswerGrade::ProbablyYes);
        assert_eq!(grade_for_mean(0.4), AnswerGrade::ProbablyNo);
        assert_eq!(grade_for_mean(0.2), AnswerGrade::No);
    }
}
