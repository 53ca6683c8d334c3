//! Sentence analysis data model.
//!
//! The wire shape (camelCase) is the contract between the external analyzer,
//! the HTTP API and the diagram renderer. Payloads coming back from the
//! model are decoded strictly and validated with
//! [`SentenceAnalysis::from_tool_input`]; nothing downstream trusts raw JSON.

pub mod prompt;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{BunkaiError, Result};

/// A grammatical particle attached to exactly one owning word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedParticle {
    /// Particle surface text, e.g. `は`.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    /// Short HTML-bearing explanation of the particle's role in this sentence.
    pub description: String,
}

/// One lexical or phrasal unit of an analyzed sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordNode {
    pub id: String,
    /// Surface text, without the attached particle.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    pub part_of_speech: String,
    /// Ids of the words this one modifies, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifies: Vec<String>,
    /// Left-to-right display order. Not an identity.
    pub position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_particle: Option<AttachedParticle>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_topic: bool,
}

/// Full result for one input sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SentenceAnalysis {
    pub original_sentence: String,
    pub words: Vec<WordNode>,
    /// HTML-bearing explanation. Only ever exposed after sanitizing.
    pub explanation: String,
    pub is_fragment: bool,
}

impl SentenceAnalysis {
    /// Decode and validate the `input` of an `analyze_sentence` tool call.
    ///
    /// Shape errors and duplicate or empty word ids are upstream failures.
    /// Topic words have any `modifies` entries cleared; dangling ids are kept
    /// and left for the renderer to skip.
    pub fn from_tool_input(input: Value) -> Result<Self> {
        let mut analysis: Self = serde_json::from_value(input)
            .map_err(|e| BunkaiError::Upstream(format!("malformed analysis payload: {}", e)))?;
        analysis.validate()?;
        analysis.normalize();
        Ok(analysis)
    }

    /// Check invariants that the schema cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.words.len());
        for word in &self.words {
            if word.id.trim().is_empty() {
                return Err(BunkaiError::Upstream(format!(
                    "word '{}' has an empty id",
                    word.text
                )));
            }
            if !seen.insert(word.id.as_str()) {
                return Err(BunkaiError::Upstream(format!(
                    "duplicate word id '{}'",
                    word.id
                )));
            }
            if !word.position.is_finite() {
                return Err(BunkaiError::Upstream(format!(
                    "word '{}' has a non-finite position",
                    word.id
                )));
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        for word in self.words.iter_mut().filter(|w| w.is_topic) {
            if !word.modifies.is_empty() {
                debug!(id = %word.id, dropped = word.modifies.len(), "Clearing modifies on topic word");
                word.modifies.clear();
            }
        }
    }

    /// Look up a word by id.
    pub fn word(&self, id: &str) -> Option<&WordNode> {
        self.words.iter().find(|w| w.id == id)
    }

    /// All words sorted by `position`.
    pub fn words_in_order(&self) -> Vec<&WordNode> {
        sorted_by_position(self.words.iter())
    }

    /// Topic words sorted by `position`.
    pub fn topic_words(&self) -> Vec<&WordNode> {
        sorted_by_position(self.words.iter().filter(|w| w.is_topic))
    }

    /// Non-topic words sorted by `position`.
    pub fn main_words(&self) -> Vec<&WordNode> {
        sorted_by_position(self.words.iter().filter(|w| !w.is_topic))
    }

    /// Ids in `modifies` lists that do not resolve to any word.
    pub fn dangling_references(&self) -> Vec<(&str, &str)> {
        self.words
            .iter()
            .flat_map(|w| w.modifies.iter().map(move |t| (w.id.as_str(), t.as_str())))
            .filter(|(_, target)| self.word(target).is_none())
            .collect()
    }
}

// Stable sort keeps input order for equal positions.
fn sorted_by_position<'a>(words: impl Iterator<Item = &'a WordNode>) -> Vec<&'a WordNode> {
    let mut out: Vec<&WordNode> = words.collect();
    out.sort_by(|a, b| a.position.total_cmp(&b.position));
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Analysis of 私は美しい花を見ました。 as the model typically returns it.
    pub fn watashi_wa() -> SentenceAnalysis {
        SentenceAnalysis::from_tool_input(watashi_wa_json()).expect("fixture must validate")
    }

    pub fn watashi_wa_json() -> Value {
        serde_json::json!({
            "originalSentence": "私は美しい花を見ました。",
            "words": [
                {
                    "id": "w1", "text": "私", "reading": "わたし", "partOfSpeech": "pronoun",
                    "position": 0, "isTopic": true, "modifies": [],
                    "attachedParticle": {"text": "は", "reading": "わ", "description": "Marks the <strong>topic</strong>"}
                },
                {
                    "id": "w2", "text": "美しい", "reading": "うつくしい", "partOfSpeech": "i-adjective",
                    "position": 1, "modifies": ["w3"]
                },
                {
                    "id": "w3", "text": "花", "reading": "はな", "partOfSpeech": "noun",
                    "position": 2, "modifies": ["w4"],
                    "attachedParticle": {"text": "を", "description": "Marks the direct object"}
                },
                {
                    "id": "w4", "text": "見ました", "reading": "みました", "partOfSpeech": "verb",
                    "position": 3
                }
            ],
            "explanation": "<p>This sentence follows the <strong>SOV pattern</strong>.</p>",
            "isFragment": false
        })
    }
}
