use super::{Choice, QuestionSelector, SelectContext};
use inquest_core::belief::{LikelihoodModel, Posterior};
use inquest_core::model::{AnswerGrade, Catalog};
use tracing::{Level, event};

/// Weight totals below this are treated as ties.
const TIE_EPSILON: f64 = 1e-12;

/// Picks the question whose answer is expected to shrink posterior entropy
/// the most, marginalizing over all five graded answers.
///
/// Zero-gain questions still rank; stopping is the guess policy's call, not
/// the selector's. Ties break to the lowest question id so runs stay
/// reproducible regardless of catalog file order.
#[derive(Debug, Default)]
pub struct EntropySelector;

impl EntropySelector {
    pub fn new() -> Self {
        Self
    }
}

impl QuestionSelector for EntropySelector {
    fn choose(&mut self, ctx: &SelectContext) -> Option<Choice> {
        let posterior = ctx.session.posterior();
        let prior_entropy = posterior.entropy_bits();
        let mut best: Option<Choice> = None;

        for question in 0..ctx.catalog.question_count() {
            if ctx.session.has_asked(question) {
                continue;
            }

            let expected = expected_entropy_bits(ctx.catalog, posterior, ctx.model, question);
            let replaces = match &best {
                None => true,
                Some(current) => {
                    expected + TIE_EPSILON < current.expected_entropy_bits
                        || ((expected - current.expected_entropy_bits).abs() <= TIE_EPSILON
                            && ctx.catalog.question(question).id
                                < ctx.catalog.question(current.question).id)
                }
            };
            if replaces {
                best = Some(Choice {
                    question,
                    expected_entropy_bits: expected,
                    gain_bits: (prior_entropy - expected).max(0.0),
                });
            }
        }

        if let Some(choice) = &best {
            log_choice(ctx, choice, prior_entropy);
        }
        best
    }
}

/// Expected posterior entropy after asking `question`, in bits.
///
/// The predictive answer distribution is the posterior-weighted likelihood of
/// each grade, normalized across the five grades.
fn expected_entropy_bits(
    catalog: &Catalog,
    posterior: &Posterior,
    model: &LikelihoodModel,
    question: usize,
) -> f64 {
    let n = catalog.character_count();
    let means: Vec<f64> = (0..n).map(|i| catalog.question_mean(i, question)).collect();

    let mut products = vec![0.0; n];
    let mut weighted_entropy = 0.0;
    let mut total_mass = 0.0;

    for grade in AnswerGrade::ALL {
        let mut mass = 0.0;
        for (i, slot) in products.iter_mut().enumerate() {
            *slot = posterior.probability(i) * model.answer_weight(grade, means[i]);
            mass += *slot;
        }
        if mass <= f64::MIN_POSITIVE {
            continue;
        }

        let mut entropy = 0.0;
        for p in &products {
            if *p > 0.0 {
                let q = *p / mass;
                entropy -= q * q.log2();
            }
        }
        weighted_entropy += mass * entropy;
        total_mass += mass;
    }

    if total_mass <= f64::MIN_POSITIVE {
        return posterior.entropy_bits();
    }
    weighted_entropy / total_mass
}

fn log_choice(ctx: &SelectContext, choice: &Choice, prior_entropy: f64) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    event!(
        target: "inquest_bot::select",
        Level::DEBUG,
        question = %ctx.catalog.question(choice.question).id,
        asked = ctx.session.questions_taken(),
        entropy = prior_entropy,
        expected = choice.expected_entropy_bits,
        gain = choice.gain_bits,
    );
}
