//! Likelihood of a graded answer given a character's trait mean.

use crate::config::DEFAULT_LIKELIHOOD_FLOOR;
use crate::model::grade::AnswerGrade;

/// Agreement-distance likelihood model.
///
/// A "yes" fits a character whose trait mean sits near 1.0 and contradicts one
/// near 0.0; intermediate grades land in between. The floor keeps any single
/// answer from zeroing a character out permanently.
#[derive(Debug, Clone, Copy)]
pub struct LikelihoodModel {
    floor: f64,
}

impl LikelihoodModel {
    pub fn new(floor: f64) -> Self {
        Self {
            floor: floor.clamp(1e-6, 0.5),
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// P(answer | character) = 1 - |target - mean|, clamped to the floor.
    pub fn answer_weight(&self, grade: AnswerGrade, trait_mean: f64) -> f64 {
        let raw = 1.0 - (grade.agreement() - trait_mean).abs();
        raw.clamp(self.floor, 1.0)
    }
}

impl Default for LikelihoodModel {
    fn default() -> Self {
        Self::new(DEFAULT_LIKELIHOOD_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::LikelihoodModel;
    use crate::model::grade::AnswerGrade;

    #[test]
    fn perfect_agreement_scores_one() {
        let model = LikelihoodModel::default();
        assert_eq!(model.answer_weight(AnswerGrade::Yes, 1.0), 1.0);
        assert_eq!(model.answer_weight(AnswerGrade::No, 0.0), 1.0);
        assert_eq!(model.answer_weight(AnswerGrade::Unknown, 0.5), 1.0);
    }

    #[test]
    fn contradiction_clamps_to_floor() {
        let model = LikelihoodModel::new(0.01);
        assert_eq!(model.answer_weight(AnswerGrade::Yes, 0.0), 0.01);
        assert_eq!(model.answer_weight(AnswerGrade::No, 1.0), 0.01);
    }

    #[test]
    fn weight_decreases_with_distance() {
        let model = LikelihoodModel::default();
        let near = model.answer_weight(AnswerGrade::Yes, 0.9);
        let mid = model.answer_weight(AnswerGrade::Yes, 0.6);
        let far = model.answer_weight(AnswerGrade::Yes, 0.2);
        assert!(near > mid && mid > far);
    }

    #[test]
    fn graded_answers_interpolate() {
        let model = LikelihoodModel::default();
        // A 0.75 mean matches "probably_yes" exactly.
        assert_eq!(model.answer_weight(AnswerGrade::ProbablyYes, 0.75), 1.0);
        assert!((model.answer_weight(AnswerGrade::ProbablyNo, 0.75) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn floor_construction_is_clamped() {
        assert_eq!(LikelihoodModel::new(-1.0).floor(), 1e-6);
        assert_eq!(LikelihoodModel::new(0.9).floor(), 0.5);
    }
}
