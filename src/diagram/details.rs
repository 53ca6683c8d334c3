//! Per-word summary rows for the "Word Details" panel.

use crate::analysis::SentenceAnalysis;

/// Display strings for one word, in position order.
#[derive(Debug, Clone, PartialEq)]
pub struct WordDetail {
    pub id: String,
    pub is_topic: bool,
    pub text: String,
    /// Attached particle text, shown right after the word.
    pub particle: Option<String>,
    /// `(reading + particle reading)`; absent when the word has no reading.
    pub reading: Option<String>,
    /// `- partOfSpeech`
    pub part_of_speech: String,
    /// `Modifies: a, b`; absent when the word modifies nothing.
    pub modifies: Option<String>,
}

/// One row per word, sorted by position. `modifies` targets are shown by
/// their text; a target that is missing (or has no text) shows its raw id.
pub fn word_details(analysis: &SentenceAnalysis) -> Vec<WordDetail> {
    analysis
        .words_in_order()
        .into_iter()
        .map(|word| {
            let particle = word.attached_particle.as_ref();
            let reading = word
                .reading
                .as_deref()
                .filter(|r| !r.is_empty())
                .map(|r| {
                    match particle
                        .and_then(|p| p.reading.as_deref())
                        .filter(|pr| !pr.is_empty())
                    {
                        Some(pr) => format!("({r} + {pr})"),
                        None => format!("({r})"),
                    }
                });
            let modifies = (!word.modifies.is_empty()).then(|| {
                let targets: Vec<&str> = word
                    .modifies
                    .iter()
                    .map(|id| {
                        analysis
                            .word(id)
                            .map(|w| w.text.as_str())
                            .filter(|t| !t.is_empty())
                            .unwrap_or(id.as_str())
                    })
                    .collect();
                format!("Modifies: {}", targets.join(", "))
            });
            WordDetail {
                id: word.id.clone(),
                is_topic: word.is_topic,
                text: word.text.clone(),
                particle: particle.map(|p| p.text.clone()),
                reading,
                part_of_speech: format!("- {}", word.part_of_speech),
                modifies,
            }
        })
        .collect()
}
