use crate::error::AnalysisError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    One,
    Two,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::One => "Speaker 1",
            Speaker::Two => "Speaker 2",
        }
    }

    /// Default voice identifier handed to the synthesizer.
    pub fn voice(&self) -> &'static str {
        match self {
            Speaker::One => "en-US-GuyNeural",
            Speaker::Two => "en-US-JennyNeural",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

/// Parses a generated script into an ordered two-speaker dialogue.
///
/// Accepts `Speaker 1:` / `Speaker 2:` / `S1:` / `S2:` labels, tolerating
/// markdown asterisks around the label. Lines without a label, with an
/// unrecognized speaker, or with no spoken text are skipped.
pub fn parse_dialogue(script: &str) -> Vec<DialogueLine> {
    let mut dialogue = Vec::new();

    for line in script.lines() {
        let line = line.trim();
        let Some((label, text)) = line.split_once(':') else {
            continue;
        };

        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let normalized = label.replace('*', "").trim().to_lowercase();
        let speaker = match normalized.as_str() {
            "speaker 1" | "s1" => Speaker::One,
            "speaker 2" | "s2" => Speaker::Two,
            _ => {
                warn!(label = %label, "skipping unrecognized speaker");
                continue;
            }
        };

        dialogue.push(DialogueLine {
            speaker,
            text: text.to_string(),
        });
    }

    dialogue
}

/// Opaque synthesized audio bytes; container format is the synthesizer's
/// concern, not ours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioSegment(pub Vec<u8>);

/// Ordered concatenation of audio segments.
#[derive(Debug, Default)]
pub struct AudioTrack {
    bytes: Vec<u8>,
    segments: usize,
}

impl AudioTrack {
    pub fn push(&mut self, segment: AudioSegment) {
        self.bytes.extend(segment.0);
        self.segments += 1;
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Opaque text-to-speech capability: text + voice identifier in, audio out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioSegment, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl SynthesizerConfig {
    /// Reads `PAGELENS_TTS_ENDPOINT` / `PAGELENS_TTS_API_KEY` /
    /// `PAGELENS_TTS_MODEL` (model defaults to `tts`).
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("PAGELENS_TTS_ENDPOINT").ok()?;
        let endpoint = endpoint.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let api_key = std::env::var("PAGELENS_TTS_API_KEY").ok().and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        let model = std::env::var("PAGELENS_TTS_MODEL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "tts".to_string());

        Some(Self {
            endpoint,
            api_key,
            model,
        })
    }
}

/// Speech client posting `{ model, input, voice }` and reading raw audio
/// bytes back.
pub struct HttpSynthesizer {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl HttpSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            endpoint: config.endpoint,
            api_key: config.api_key,
            model: config.model,
            client,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioSegment, AnalysisError> {
        let mut request = self.client.post(&self.endpoint).json(&json!({
            "model": self.model,
            "input": text,
            "voice": voice,
        }));

        if let Some(api_key) = &self.api_key {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AnalysisError::Synthesis(format!(
                "speech request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(AudioSegment(bytes.to_vec()))
    }
}

/// Synthesizes a parsed script line by line, preserving dialogue order, and
/// concatenates the segments into one track.
pub async fn assemble_podcast(
    script: &str,
    synthesizer: &dyn SpeechSynthesizer,
) -> Result<AudioTrack, AnalysisError> {
    let dialogue = parse_dialogue(script);
    if dialogue.is_empty() {
        return Err(AnalysisError::Request(
            "script contains no dialogue lines".to_string(),
        ));
    }

    let mut track = AudioTrack::default();
    for line in dialogue {
        let segment = synthesizer.synthesize(&line.text, line.speaker.voice()).await?;
        track.push(segment);
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialogue_preserves_speaker_order() {
        let script = "Speaker 1: Welcome to the show.\n\
                      Speaker 2: Glad to be here.\n\
                      Speaker 1: Let's begin.";

        let dialogue = parse_dialogue(script);
        assert_eq!(dialogue.len(), 3);
        assert_eq!(dialogue[0].speaker, Speaker::One);
        assert_eq!(dialogue[1].speaker, Speaker::Two);
        assert_eq!(dialogue[2].speaker, Speaker::One);
        assert_eq!(dialogue[1].text, "Glad to be here.");
    }

    #[test]
    fn short_labels_and_asterisks_are_accepted() {
        let script = "**S1**: Hello.\n*Speaker 2*: Hi there.";
        let dialogue = parse_dialogue(script);
        assert_eq!(dialogue.len(), 2);
        assert_eq!(dialogue[0].speaker, Speaker::One);
        assert_eq!(dialogue[1].speaker, Speaker::Two);
    }

    #[test]
    fn unrecognized_speakers_and_plain_lines_are_skipped() {
        let script = "Narrator: Once upon a time.\n\
                      Just a stage direction\n\
                      Speaker 2: Actual dialogue.";

        let dialogue = parse_dialogue(script);
        assert_eq!(dialogue.len(), 1);
        assert_eq!(dialogue[0].speaker, Speaker::Two);
    }

    #[test]
    fn speakers_map_to_distinct_voices() {
        assert_ne!(Speaker::One.voice(), Speaker::Two.voice());
    }

    struct FakeSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for FakeSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            voice: &str,
        ) -> Result<AudioSegment, AnalysisError> {
            Ok(AudioSegment(format!("{voice}|{text};").into_bytes()))
        }
    }

    #[tokio::test]
    async fn podcast_concatenates_segments_in_order() {
        let script = "Speaker 1: First line.\nSpeaker 2: Second line.";
        let track = assemble_podcast(script, &FakeSynthesizer).await.unwrap();

        assert_eq!(track.segments(), 2);
        let bytes = String::from_utf8(track.into_bytes()).unwrap();
        assert_eq!(
            bytes,
            "en-US-GuyNeural|First line.;en-US-JennyNeural|Second line.;"
        );
    }

    #[tokio::test]
    async fn empty_script_is_rejected() {
        let error = assemble_podcast("no dialogue here", &FakeSynthesizer)
            .await
            .unwrap_err();
        assert!(matches!(error, AnalysisError::Request(_)));
    }
}
