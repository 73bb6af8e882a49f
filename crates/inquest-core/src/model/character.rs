use super::trait_belief::{TraitBelief, TraitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier for a catalog character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
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

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// One guessable entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub quote: String,
    /// Relative weight before any question has been answered.
    #[serde(default = "default_prior")]
    pub prior: f64,
    #[serde(default)]
    pub beliefs: BTreeMap<TraitId, TraitBelief>,
}

fn default_prior() -> f64 {
    1.0
}

impl Character {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(id),
            name: name.into(),
            quote: String::new(),
            prior: default_prior(),
            beliefs: BTreeMap::new(),
        }
    }

    pub fn with_trait(mut self, trait_id: impl Into<String>, alpha: f64, beta: f64) -> Self {
        self.beliefs
            .insert(TraitId::new(trait_id), TraitBelief::new(alpha, beta));
        self
    }

    /// Mean of the Beta evidence for `trait_id`; unscored traits read as 0.5.
    pub fn trait_mean(&self, trait_id: &TraitId) -> f64 {
        self.beliefs
            .get(trait_id)
            .copied()
            .unwrap_or(TraitBelief::UNINFORMATIVE)
            .mean()
    }

    /// Mutable access to a trait's evidence, materializing the closed-world
    /// default the first time a trait is touched.
    pub fn belief_mut(&mut self, trait_id: &TraitId) -> &mut TraitBelief {
        self.beliefs
            .entry(trait_id.clone())
            .or_insert(TraitBelief::UNINFORMATIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::Character;
    use crate::model::trait_belief::TraitId;

    #[test]
    fn unscored_trait_reads_as_half() {
        let character = Character::new("char_owl", "Owl").with_trait("flies", 9.0, 1.0);
        assert!((character.trait_mean(&TraitId::from("flies")) - 0.9).abs() < 1e-12);
        assert_eq!(character.trait_mean(&TraitId::from("breathes_fire")), 0.5);
    }

    #[test]
    fn belief_mut_materializes_default() {
        let mut character = Character::new("char_owl", "Owl");
        character.belief_mut(&TraitId::from("flies")).observe(1.0, 1.0);
        assert!(character.trait_mean(&TraitId::from("flies")) > 0.5);
    }

    #[test]
    fn prior_defaults_when_missing_from_json() {
        let json = r#"{"id": "char_owl", "name": "Owl"}"#;
        let character: Character = serde_json::from_str(json).unwrap();
        assert_eq!(character.prior, 1.0);
        assert!(character.quote.is_empty());
        assert!(character.beliefs.is_empty());
    }
}
