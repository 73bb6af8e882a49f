use super::character::{Character, CharacterId};
use super::question::{Question, QuestionId};
use super::trait_belief::TraitId;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

pub const CATALOG_VERSION: u32 = 1;

/// On-disk shape of a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_version")]
    version: u32,
    characters: Vec<Character>,
    #[serde(default)]
    questions: Vec<Question>,
}

fn default_version() -> u32 {
    CATALOG_VERSION
}

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    version: u32,
    characters: &'a [Character],
    questions: &'a [Question],
}

/// Validated, index-backed catalog of characters and questions.
///
/// Construction always goes through [`Catalog::new`], so an instance in hand
/// has unique non-blank ids, positive finite priors, and valid Beta pairs.
#[derive(Debug, Clone)]
pub struct Catalog {
    characters: Vec<Character>,
    questions: Vec<Question>,
    character_index: HashMap<CharacterId, usize>,
    question_index: HashMap<QuestionId, usize>,
}

impl Catalog {
    pub fn new(characters: Vec<Character>, questions: Vec<Question>) -> Result<Self, CatalogError> {
        if characters.is_empty() {
            return Err(CatalogError::NoCharacters);
        }

        let mut character_index = HashMap::with_capacity(characters.len());
        for (idx, character) in characters.iter().enumerate() {
            if character.id.is_blank() {
                return Err(CatalogError::BlankId("character"));
            }
            if character.name.trim().is_empty() {
                return Err(CatalogError::BlankName(character.id.clone()));
            }
            if !character.prior.is_finite() || character.prior <= 0.0 {
                return Err(CatalogError::InvalidPrior(character.id.clone()));
            }
            for (trait_id, belief) in &character.beliefs {
                if trait_id.is_blank() {
                    return Err(CatalogError::BlankId("trait"));
                }
                if !belief.is_valid() {
                    return Err(CatalogError::InvalidBelief {
                        character: character.id.clone(),
                        trait_id: trait_id.clone(),
                    });
                }
            }
            if character_index.insert(character.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateCharacter(character.id.clone()));
            }
        }

        let mut question_index = HashMap::with_capacity(questions.len());
        for (idx, question) in questions.iter().enumerate() {
            if question.id.is_blank() {
                return Err(CatalogError::BlankId("question"));
            }
            if question.trait_id.is_blank() {
                return Err(CatalogError::BlankId("trait"));
            }
            if question_index.insert(question.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateQuestion(question.id.clone()));
            }
        }

        Ok(Self {
            characters,
            questions,
            character_index,
            question_index,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.version != CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion(file.version));
        }
        Self::new(file.characters, file.questions)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&CatalogFileRef {
            version: CATALOG_VERSION,
            characters: &self.characters,
            questions: &self.questions,
        })
    }

    /// Writes the catalog next to `path` and renames it into place, so a
    /// crash mid-write never leaves a truncated file behind.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let json = self.to_json()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn character(&self, idx: usize) -> &Character {
        &self.characters[idx]
    }

    pub fn character_mut(&mut self, idx: usize) -> &mut Character {
        &mut self.characters[idx]
    }

    pub fn question(&self, idx: usize) -> &Question {
        &self.questions[idx]
    }

    pub fn index_of_character(&self, id: &CharacterId) -> Option<usize> {
        self.character_index.get(id).copied()
    }

    pub fn index_of_question(&self, id: &QuestionId) -> Option<usize> {
        self.question_index.get(id).copied()
    }

    /// Trait mean of one character for the trait a question asks about.
    pub fn question_mean(&self, character: usize, question: usize) -> f64 {
        self.characters[character].trait_mean(&self.questions[question].trait_id)
    }

    pub fn trait_mean(&self, character: usize, trait_id: &TraitId) -> f64 {
        self.characters[character].trait_mean(trait_id)
    }

    pub fn prior_weights(&self) -> Vec<f64> {
        self.characters.iter().map(|c| c.prior).collect()
    }

    /// Generates a separable catalog for benches and simulated runs.
    ///
    /// The low traits carry a binary code over the character index, so any
    /// two characters disagree on at least one trait; the remaining traits
    /// are seeded coin flips. One question is emitted per trait.
    pub fn synthetic(spec: SyntheticSpec, seed: u64) -> Result<Self, CatalogError> {
        let code_bits = usize::BITS - spec.characters.max(2).next_power_of_two().leading_zeros() - 1;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut characters = Vec::with_capacity(spec.characters);
        for i in 0..spec.characters {
            let mut character = Character::new(format!("char_{i:03}"), format!("Character {i:03}"));
            for j in 0..spec.traits {
                let present = if (j as u32) < code_bits {
                    (i >> j) & 1 == 1
                } else {
                    rng.gen_bool(0.5)
                };
                let (alpha, beta) = if present { (9.0, 1.0) } else { (1.0, 9.0) };
                character = character.with_trait(format!("t_{j:03}"), alpha, beta);
            }
            characters.push(character);
        }

        let questions = (0..spec.traits)
            .map(|j| {
                Question::new(
                    format!("q_{j:03}"),
                    format!("Does your character have trait {j:03}?"),
                    format!("t_{j:03}"),
                )
            })
            .collect();

        Self::new(characters, questions)
    }
}

/// Parameters for [`Catalog::synthetic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub characters: usize,
    pub traits: usize,
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedVersion(u32),
    NoCharacters,
    DuplicateCharacter(CharacterId),
    DuplicateQuestion(QuestionId),
    InvalidPrior(CharacterId),
    InvalidBelief {
        character: CharacterId,
        trait_id: TraitId,
    },
    BlankId(&'static str),
    BlankName(CharacterId),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "catalog io error: {err}"),
            CatalogError::Parse(err) => write!(f, "catalog parse error: {err}"),
            CatalogError::UnsupportedVersion(version) => {
                write!(f, "unsupported catalog version {version}")
            }
            CatalogError::NoCharacters => write!(f, "catalog holds no characters"),
            CatalogError::DuplicateCharacter(id) => write!(f, "duplicate character id `{id}`"),
            CatalogError::DuplicateQuestion(id) => write!(f, "duplicate question id `{id}`"),
            CatalogError::InvalidPrior(id) => {
                write!(f, "character `{id}` has a non-positive prior")
            }
            CatalogError::InvalidBelief {
                character,
                trait_id,
            } => write!(
                f,
                "character `{character}` has an invalid Beta pair for trait `{trait_id}`"
            ),
            CatalogError::BlankId(entity) => write!(f, "blank {entity} id"),
            CatalogError::BlankName(id) => write!(f, "character `{id}` has a blank name"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{Catalog, CatalogError, SyntheticSpec};
    use crate::model::character::Character;
    use crate::model::question::{Question, QuestionId};
    use crate::model::trait_belief::TraitId;

    fn two_character_catalog() -> Catalog {
        Catalog::new(
            vec![
                Character::new("char_owl", "Owl").with_trait("flies", 9.0, 1.0),
                Character::new("char_mole", "Mole").with_trait("flies", 1.0, 9.0),
            ],
            vec![Question::new("q_flies", "Does your character fly?", "flies")],
        )
        .unwrap()
    }

    #[test]
    fn indexes_resolve_ids() {
        let catalog = two_character_catalog();
        assert_eq!(catalog.index_of_character(&"char_mole".into()), Some(1));
        assert_eq!(catalog.index_of_question(&"q_flies".into()), Some(0));
        assert_eq!(catalog.index_of_question(&"q_swims".into()), None);
    }

    #[test]
    fn question_mean_uses_bound_trait() {
        let catalog = two_character_catalog();
        assert!((catalog.question_mean(0, 0) - 0.9).abs() < 1e-12);
        assert!((catalog.question_mean(1, 0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn unscored_trait_reads_closed_world_default() {
        let catalog = two_character_catalog();
        assert_eq!(catalog.trait_mean(0, &TraitId::from("breathes_fire")), 0.5);
    }

    #[test]
    fn rejects_duplicate_character_ids() {
        let err = Catalog::new(
            vec![Character::new("char_owl", "Owl"), Character::new("char_owl", "Decoy")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCharacter(_)));
    }

    #[test]
    fn rejects_invalid_beta_pair() {
        let err = Catalog::new(
            vec![Character::new("char_owl", "Owl").with_trait("flies", 0.0, 1.0)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidBelief { .. }));
    }

    #[test]
    fn rejects_empty_catalog() {
        let err = Catalog::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, CatalogError::NoCharacters));
    }

    #[test]
    fn json_roundtrip_preserves_content() {
        let catalog = two_character_catalog();
        let json = catalog.to_json().unwrap();
        assert!(json.contains("\"version\": 1"));
        let restored = Catalog::from_json(&json).unwrap();
        assert_eq!(restored.characters(), catalog.characters());
        assert_eq!(restored.questions(), catalog.questions());
    }

    #[test]
    fn from_json_rejects_future_version() {
        let json = r#"{"version": 9, "characters": [{"id": "c", "name": "C"}], "questions": []}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedVersion(9)));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let catalog = two_character_catalog();
        catalog.save(&path).unwrap();
        let restored = Catalog::from_path(&path).unwrap();
        assert_eq!(restored.character_count(), 2);
    }

    #[test]
    fn synthetic_characters_are_separable() {
        let spec = SyntheticSpec {
            characters: 8,
            traits: 6,
        };
        let catalog = Catalog::synthetic(spec, 7).unwrap();
        assert_eq!(catalog.character_count(), 8);
        assert_eq!(catalog.question_count(), 6);

        // The binary-code traits force distinct signatures.
        for i in 0..8 {
            for j in (i + 1)..8 {
                let differs = (0..catalog.question_count()).any(|q| {
                    (catalog.question_mean(i, q) - catalog.question_mean(j, q)).abs() > 0.5
                });
                assert!(differs, "characters {i} and {j} share a signature");
            }
        }
    }

    #[test]
    fn synthetic_is_deterministic_per_seed() {
        let spec = SyntheticSpec {
            characters: 6,
            traits: 8,
        };
        let a = Catalog::synthetic(spec, 42).unwrap().to_json().unwrap();
        let b = Catalog::synthetic(spec, 42).unwrap().to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn question_id_lookup_is_typed() {
        let catalog = two_character_catalog();
        let id = QuestionId::from("q_flies");
        assert_eq!(catalog.question(catalog.index_of_question(&id).unwrap()).id, id);
    }
}
