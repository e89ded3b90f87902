use crate::error::AnalysisError;
use crate::models::SectionChunk;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Generation is the dominant external cost; cap each call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const COUNTERPOINTS_FALLBACK: &str = "There is no available points for selected text";

/// Opaque text-generation capability: prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl GeneratorConfig {
    /// Reads `PAGELENS_LLM_ENDPOINT` / `PAGELENS_LLM_API_KEY`; `None` when no
    /// endpoint is configured.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("PAGELENS_LLM_ENDPOINT").ok()?;
        let endpoint = endpoint.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let api_key = std::env::var("PAGELENS_LLM_API_KEY").ok().and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        Some(Self { endpoint, api_key })
    }
}

/// JSON-over-HTTP generator client: posts `{ "prompt": ... }`, expects
/// `{ "text": ... }` back.
pub struct HttpTextGenerator {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpTextGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            endpoint: config.endpoint,
            api_key: config.api_key,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AnalysisError::Generation(format!(
                "generation request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                AnalysisError::Generation("generation response has no text field".to_string())
            })
    }
}

pub fn persona_query(persona: &str, task: &str) -> String {
    format!("As a {persona}, my goal is to {task}.")
}

pub fn topic_query(text: &str) -> String {
    format!(
        "Find and return the most relevant and important titles related to {text}. \
         Focus on accuracy, reliability, and context."
    )
}

/// Prompt that rewrites the base query into an answer phrased with the
/// section titles actually present in the corpus, so embedding search lands
/// on those sections.
pub fn query_expansion_prompt(base_query: &str, chunks: &[SectionChunk]) -> String {
    let titles = chunks
        .iter()
        .filter(|chunk| !chunk.title.is_empty())
        .map(|chunk| format!("- {}", chunk.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are given the following section titles from a set of documents:\n\
         {titles}\n\n\
         Identify only the titles most relevant to this query: '{base_query}'. \
         Based only on those titles, write a concise, high-level answer that \
         reuses their specific wording and key phrases, so embedding-based \
         similarity search will match the original sections. Do not invent \
         topics beyond the selected titles."
    )
}

pub fn key_insights_prompt(text: &str) -> String {
    format!(
        "Analyze the following content and extract 5 to 7 concise, high-value \
         insights. Each insight should be a standalone point; avoid fluff.\n\n\
         Content:\n{text}"
    )
}

pub fn did_you_know_prompt(text: &str) -> String {
    format!(
        "Generate short, engaging \"Did you know?\" facts inspired by the \
         provided text. Give at least 2, always starting with: Did you know? \
         If no factual point can be made, respond exactly with: \
         \"There is no available fact for selected text\"\n\n\
         Text: {text}"
    )
}

pub fn counterpoints_prompt(text: &str) -> String {
    format!(
        "Analyze the following content and identify contradictions, \
         counterpoints, or opposing perspectives, briefly and in plain \
         English (no markdown). If there are genuine counterpoints, list \
         them clearly.\n\n\
         Content:\n{text}"
    )
}

pub fn podcast_script_prompt(user_text: &str, combined_text: &str) -> String {
    format!(
        "You are a podcast scriptwriter. Create an engaging, informative \
         conversation between two speakers using the sources below.\n\
         ---\n\
         User request: {user_text}\n\
         Document insights & counterpoints: {combined_text}\n\
         ---\n\
         Format strictly like this:\n\
         Speaker 1: ...\n\
         Speaker 2: ...\n\
         Speaker 1: ...\n\
         Speaker 2: ...\n\
         End the script naturally."
    )
}

/// Parses a bulleted model response into clean lines: `- ` prefixes and
/// surrounding whitespace stripped, blank lines dropped.
pub fn clean_bullet_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_matches(|c: char| c == '-' || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Counterpoint responses degrade to a fixed fallback line when the model
/// reports nothing usable.
pub fn normalize_counterpoints(output: &str) -> Vec<String> {
    if output.trim().is_empty() || output.to_lowercase().contains("no available") {
        vec![COUNTERPOINTS_FALLBACK.to_string()]
    } else {
        clean_bullet_lines(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(title: &str) -> SectionChunk {
        SectionChunk {
            document_name: "doc.pdf".to_string(),
            page_number: 1,
            title: title.to_string(),
            content: "content".to_string(),
        }
    }

    #[test]
    fn persona_query_has_expected_shape() {
        let query = persona_query("travel planner", "plan a 4-day trip");
        assert_eq!(query, "As a travel planner, my goal is to plan a 4-day trip.");
    }

    #[test]
    fn bullet_lines_are_cleaned() {
        let output = "- First insight\n\n-  Second insight \nThird insight\n   ";
        assert_eq!(
            clean_bullet_lines(output),
            vec!["First insight", "Second insight", "Third insight"]
        );
    }

    #[test]
    fn empty_counterpoints_fall_back() {
        assert_eq!(normalize_counterpoints("  "), vec![COUNTERPOINTS_FALLBACK]);
        assert_eq!(
            normalize_counterpoints("No available counterpoints here."),
            vec![COUNTERPOINTS_FALLBACK]
        );
    }

    #[test]
    fn real_counterpoints_pass_through() {
        let cleaned = normalize_counterpoints("- The study disagrees on scale");
        assert_eq!(cleaned, vec!["The study disagrees on scale"]);
    }

    #[test]
    fn expansion_prompt_lists_only_titled_chunks() {
        let chunks = vec![chunk("Introduction"), chunk(""), chunk("Conclusion")];
        let prompt = query_expansion_prompt("efficiency", &chunks);
        assert!(prompt.contains("- Introduction"));
        assert!(prompt.contains("- Conclusion"));
        assert!(!prompt.contains("- \n"));
    }

    #[test]
    fn generator_config_requires_endpoint() {
        std::env::remove_var("PAGELENS_LLM_ENDPOINT");
        assert!(GeneratorConfig::from_env().is_none());
    }
}
