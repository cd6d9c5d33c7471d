//! Completion-backed extractor.

use tracing::{debug, warn};

use super::{
    parse_json_response, parse_section, ExtractedCharacter, ExtractedRelationship, Extraction,
    Extractor, RetryPolicy, TimelineEvent,
};
use crate::error::ExtractionError;

/// A text completion provider.
///
/// Implementations perform the network call and map failures onto
/// [`ExtractionError`] so the retry policy can classify them.
pub trait CompletionClient {
    fn complete(&mut self, prompt: &str) -> Result<String, ExtractionError>;
}

const CHARACTER_PROMPT: &str = r#"You are an expert literary analyst. Read the novel text below and extract every major character that appears.

Reply with JSON in exactly this shape:
{
  "characters": [
    {
      "id": "char_<name in pinyin or English>",
      "name": "character name",
      "description": "short description, at most 50 characters",
      "traits": ["trait", "..."],
      "goals": ["goal", "..."],
      "background": "background story (optional)",
      "appearance": "physical appearance (optional)"
    }
  ]
}

Use an empty string or empty array for anything you cannot determine.

Novel text:
{text}

Reply with JSON only, without commentary:
"#;

const RELATIONSHIP_PROMPT: &str = r#"You are an expert literary analyst. Read the novel text below and extract the relationships between characters.

Reply with JSON in exactly this shape:
{
  "relationships": [
    {
      "id": "rel_<character 1>_<character 2>",
      "character_id_1": "char_<character 1>",
      "character_id_2": "char_<character 2>",
      "type": "friend / enemy / partner / family / mentor / lover / ...",
      "description": "what the relationship is",
      "conflict_level": 0,
      "strength": 3
    }
  ]
}

conflict_level and strength are integers from 0 to 5. Return an empty array if there are no relationships.

Novel text:
{text}

Reply with JSON only, without commentary:
"#;

const TIMELINE_PROMPT: &str = r#"You are an expert literary analyst. Read the novel text below and extract its timeline events.

Reply with JSON in exactly this shape:
{
  "events": [
    {
      "id": "event_ch<chapter>",
      "chapter": 1,
      "summary": "event summary, 20 to 50 characters",
      "description": "detailed description, at most 100 characters (optional)",
      "character_ids": ["char_<character>", "..."],
      "location": "where it happens (optional)",
      "timestamp": "time or rough time of day (optional)"
    }
  ]
}

List the important events in story order.

Novel text:
{text}

Reply with JSON only, without commentary:
"#;

/// Extracts characters, relationships and events with three completion calls.
///
/// Characters and relationships see the earlier-chunk context followed by the
/// chunk; events see only the chunk. A reply that holds no usable JSON yields
/// an empty section rather than an error.
#[derive(Debug)]
pub struct LlmExtractor<C> {
    client: C,
    retry: RetryPolicy,
}

impl<C: CompletionClient> LlmExtractor<C> {
    pub fn new(client: C) -> Self {
        Self::with_retry(client, RetryPolicy::default())
    }

    pub fn with_retry(client: C, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    pub fn extract_characters(&mut self, text: &str) -> Result<Vec<ExtractedCharacter>, ExtractionError> {
        let characters: Vec<ExtractedCharacter> = self.section(CHARACTER_PROMPT, text, "characters")?;
        Ok(characters.into_iter().map(ExtractedCharacter::normalized).collect())
    }

    pub fn extract_relationships(&mut self, text: &str) -> Result<Vec<ExtractedRelationship>, ExtractionError> {
        let relationships: Vec<ExtractedRelationship> = self.section(RELATIONSHIP_PROMPT, text, "relationships")?;
        Ok(relationships.into_iter().map(ExtractedRelationship::normalized).collect())
    }

    pub fn extract_events(&mut self, text: &str) -> Result<Vec<TimelineEvent>, ExtractionError> {
        let events: Vec<TimelineEvent> = self.section(TIMELINE_PROMPT, text, "events")?;
        Ok(events.into_iter().map(TimelineEvent::normalized).collect())
    }

    fn section<T: serde::de::DeserializeOwned>(
        &mut self,
        template: &str,
        text: &str,
        key: &str,
    ) -> Result<Vec<T>, ExtractionError> {
        let prompt = template.replace("{text}", text);
        let client = &mut self.client;
        let reply = self.retry.run(|_| client.complete(&prompt))?;

        match parse_json_response(&reply) {
            Some(document) => {
                let items = parse_section(&document, key);
                debug!(section = key, count = items.len(), "parsed extraction reply");
                Ok(items)
            }
            None => {
                warn!(section = key, reply_len = reply.len(), "reply held no JSON document");
                Ok(Vec::new())
            }
        }
    }
}

impl<C: CompletionClient> Extractor for LlmExtractor<C> {
    fn extract(&mut self, text: &str, context: &str) -> Result<Extraction, ExtractionError> {
        let with_context = if context.is_empty() {
            text.to_string()
        } else {
            format!("{}\n\n{}", context, text)
        };

        Ok(Extraction {
            characters: self.extract_characters(&with_context)?,
            relationships: self.extract_relationships(&with_context)?,
            events: self.extract_events(text)?,
        })
    }
}
