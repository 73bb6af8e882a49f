use inquest_core::config::EngineConfig;
use inquest_core::game::AnswerEvent;
use inquest_core::model::{Catalog, Character, CharacterId, TraitId};
use std::collections::BTreeMap;
use tracing::{Level, event};

/// One confirmed game's Beta deltas for a single character.
///
/// Deltas for every touched trait travel together so the store can apply
/// them in one exclusive section per character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterUpdate {
    pub character: CharacterId,
    pub adjustments: Vec<TraitAdjustment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitAdjustment {
    pub trait_id: TraitId,
    pub d_alpha: f64,
    pub d_beta: f64,
}

impl CharacterUpdate {
    /// Applies the deltas to an owned catalog. Returns false when the
    /// character is no longer present.
    pub fn apply_to(&self, catalog: &mut Catalog) -> bool {
        let Some(idx) = catalog.index_of_character(&self.character) else {
            return false;
        };
        self.apply_to_character(catalog.character_mut(idx))
    }

    /// Applies the deltas to one character, e.g. under a store's exclusive
    /// cell. Returns false when the ids do not match.
    pub fn apply_to_character(&self, character: &mut Character) -> bool {
        if character.id != self.character {
            return false;
        }
        for adjustment in &self.adjustments {
            let belief = character.belief_mut(&adjustment.trait_id);
            belief.alpha += adjustment.d_alpha;
            belief.beta += adjustment.d_beta;
        }
        true
    }
}

/// Turns a confirmed-correct game into catalog evidence.
///
/// Only confirmed-correct outcomes reach this point; a rejected or abandoned
/// game teaches nothing, which keeps one misread session from polluting a
/// character's traits.
#[derive(Debug, Clone, Copy)]
pub struct OnlineLearner {
    rate: f64,
}

impl OnlineLearner {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.max(0.0),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.learn_rate)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Folds every answered question into per-trait deltas for the confirmed
    /// character. `None` when learning is off or nothing was answered.
    pub fn update_for(
        &self,
        catalog: &Catalog,
        character: usize,
        log: &[AnswerEvent],
    ) -> Option<CharacterUpdate> {
        if self.rate <= 0.0 || log.is_empty() {
            return None;
        }

        let mut per_trait: BTreeMap<TraitId, (f64, f64)> = BTreeMap::new();
        for event in log {
            let trait_id = &catalog.question(event.question).trait_id;
            let agreement = event.grade.agreement();
            let slot = per_trait.entry(trait_id.clone()).or_insert((0.0, 0.0));
            slot.0 += self.rate * agreement;
            slot.1 += self.rate * (1.0 - agreement);
        }

        let update = CharacterUpdate {
            character: catalog.character(character).id.clone(),
            adjustments: per_trait
                .into_iter()
                .map(|(trait_id, (d_alpha, d_beta))| TraitAdjustment {
                    trait_id,
                    d_alpha,
                    d_beta,
                })
                .collect(),
        };

        if tracing::enabled!(Level::INFO) {
            event!(
                target: "inquest_bot::learn",
                Level::INFO,
                character = %update.character,
                traits = update.adjustments.len(),
                events = log.len(),
                rate = self.rate,
            );
        }
        Some(update)
    }
}
