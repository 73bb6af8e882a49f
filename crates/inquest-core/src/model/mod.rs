//! Catalog data model: characters, traits, questions.
//!
//! This module is composed of:
//! - `grade`: the five graded answers and their agreement targets.
//! - `trait_belief`: per-trait Beta evidence and trait identifiers.
//! - `character`: guessable catalog entries.
//! - `question`: askable questions bound to traits.
//! - `catalog`: the validated container plus JSON load/save.

pub mod catalog;
pub mod character;
pub mod grade;
pub mod question;
pub mod trait_belief;

pub use catalog::{Catalog, CatalogError, SyntheticSpec};
pub use character::{Character, CharacterId};
pub use grade::AnswerGrade;
pub use question::{Question, QuestionId};
pub use trait_belief::{TraitBelief, TraitId};
