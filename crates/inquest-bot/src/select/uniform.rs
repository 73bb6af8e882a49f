use super::{Choice, QuestionSelector, SelectContext};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Baseline selector: a seeded uniform draw over the unasked questions.
///
/// Exists for harness comparisons, so it skips the entropy bookkeeping and
/// reports zero gain.
#[derive(Debug)]
pub struct UniformSelector {
    rng: SmallRng,
}

impl UniformSelector {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl QuestionSelector for UniformSelector {
    fn choose(&mut self, ctx: &SelectContext) -> Option<Choice> {
        let unasked: Vec<usize> = (0..ctx.catalog.question_count())
            .filter(|q| !ctx.session.has_asked(*q))
            .collect();
        if unasked.is_empty() {
            return None;
        }

        let question = unasked[self.rng.gen_range(0..unasked.len())];
        Some(Choice {
            question,
            expected_entropy_bits: ctx.session.posterior().entropy_bits(),
            gain_bits: 0.0,
        })
    }
}
