//! Instruction prompt and `analyze_sentence` tool schema.
//!
//! The model is forced to answer through the tool, so the schema below is
//! the real output contract. Keep it in sync with [`super::SentenceAnalysis`].

use serde_json::{json, Value};

/// Name of the forced tool.
pub const TOOL_NAME: &str = "analyze_sentence";

const TOOL_DESCRIPTION: &str = "Provide structured analysis of the Japanese sentence";

/// Build the user prompt for one sentence.
pub fn build_prompt(sentence: &str) -> String {
    format!(
        r#"Analyze the following Japanese sentence and break it down into its constituent words and phrases. For each word/phrase, identify what it modifies or relates to in the sentence. This will be used to create a visual diagram showing the grammatical relationships.

Sentence: {sentence}

First, determine whether this is a COMPLETE SENTENCE or a SENTENCE FRAGMENT:
- A complete sentence has a predicate (verb, adjective, or copula) and expresses a complete thought
- A fragment is missing key components (e.g., just a noun phrase, incomplete clause, etc.)
- Set "isFragment: true" if it's a fragment, "isFragment: false" if it's complete

RULES:
1. Particles (は, を, に, が, の, etc.) are ATTACHED to their word with the "attachedParticle" field. Never create separate word entries for particles.
   Example: "私は" → {{ text: "私", attachedParticle: {{ text: "は", description: "Marks '私' as the topic of the sentence" }} }}
2. Every particle gets a brief description (1-2 sentences) of its function in THIS sentence.
3. The topic (marked with は or も) has "isTopic: true". Topics provide context and do not modify other words; give them an empty "modifies" array.
4. Modification relationships:
   - Adjectives modify nouns
   - Adverbs modify verbs/adjectives
   - Objects (を) modify verbs
   - Topics modify nothing

Provide:
1. Each word/phrase with its reading and part of speech
2. Particles attached to their words
3. The topic marked with "isTopic: true"
4. For each non-topic word, the ids of the words it modifies
5. A brief explanation of the sentence structure in HTML using <p>, <strong>, <em>, <ul>, <li>

Use the {TOOL_NAME} tool to structure your response."#
    )
}

/// JSON schema for the tool input.
pub fn analysis_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "originalSentence": {
                "type": "string",
                "description": "The original Japanese sentence"
            },
            "words": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "string",
                            "description": "Unique identifier for this word/phrase"
                        },
                        "text": {
                            "type": "string",
                            "description": "The word/phrase in Japanese, NOT including particles"
                        },
                        "reading": {
                            "type": "string",
                            "description": "Hiragana reading of the word (optional)"
                        },
                        "partOfSpeech": {
                            "type": "string",
                            "description": "Part of speech (e.g., noun, verb, adjective)"
                        },
                        "modifies": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "IDs of words/phrases that this word modifies or relates to"
                        },
                        "position": {
                            "type": "number",
                            "description": "Position in the sentence (0-indexed)"
                        },
                        "attachedParticle": {
                            "type": "object",
                            "properties": {
                                "text": {
                                    "type": "string",
                                    "description": "The particle text (e.g., は, を, に, が)"
                                },
                                "reading": {
                                    "type": "string",
                                    "description": "Hiragana reading of the particle (optional)"
                                },
                                "description": {
                                    "type": "string",
                                    "description": "What this particle does in this specific sentence (1-2 sentences)"
                                }
                            },
                            "required": ["text", "description"],
                            "description": "Particle attached to this word (if any)"
                        },
                        "isTopic": {
                            "type": "boolean",
                            "description": "True if this word is the sentence topic"
                        }
                    },
                    "required": ["id", "text", "partOfSpeech", "position"]
                }
            },
            "explanation": {
                "type": "string",
                "description": "Brief HTML-formatted explanation of the sentence structure"
            },
            "isFragment": {
                "type": "boolean",
                "description": "True if this is a sentence fragment or incomplete sentence"
            }
        },
        "required": ["originalSentence", "words", "explanation", "isFragment"],
        "additionalProperties": false
    })
}

/// Tool definition in Anthropic Messages API form.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": TOOL_DESCRIPTION,
        "input_schema": analysis_schema(),
    })
}

/// `tool_choice` forcing the model to answer through [`TOOL_NAME`].
pub fn forced_tool_choice() -> Value {
    json!({ "type": "tool", "name": TOOL_NAME })
}
