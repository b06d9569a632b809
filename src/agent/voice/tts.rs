use crate::config::StoryConfig;
use crate::error::{Result, StoryError};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Longest text the translate TTS endpoint accepts per request.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Turns narration text into a single audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output_path: &Path) -> Result<()>;
}

/// Google Translate speech endpoint, driven the same way gTTS drives it.
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
    lang: String,
    slow: bool,
}

impl GoogleTts {
    pub fn new(config: &StoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            client,
            endpoint: config.tts_url.clone(),
            lang: config.tts_lang.clone(),
            slow: config.tts_slow,
        })
    }

    fn speed(&self) -> &'static str {
        if self.slow { "0.3" } else { "1" }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(StoryError::EmptyScript("no narration text to speak".to_string()));
        }

        info!("[TTS] Generating narration ({} chunks, lang={}, slow={}) -> {:?}", chunks.len(), self.lang, self.slow, output_path);

        let mut file = tokio::fs::File::create(output_path).await?;
        let total = chunks.len().to_string();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx_s = idx.to_string();
            let len_s = chunk.chars().count().to_string();
            let resp = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", self.lang.as_str()),
                    ("ttsspeed", self.speed()),
                    ("total", total.as_str()),
                    ("idx", idx_s.as_str()),
                    ("client", "tw-ob"),
                    ("textlen", len_s.as_str()),
                ])
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(StoryError::Generation(format!("TTS request {} failed with {}", idx, status)));
            }

            let bytes = resp.bytes().await?;
            debug!("[TTS] Chunk {}/{}: {} bytes", idx + 1, chunks.len(), bytes.len());
            file.write_all(&bytes).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

/// Split text into request-sized pieces.
///
/// Sentences end at terminal punctuation or line breaks; a sentence longer
/// than `max_chars` is packed word by word, and a single oversized word is
/// cut hard. Pieces without any alphanumeric character are dropped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c == '\n' || c == '\r' {
            sentences.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?' | ';' | ':' | '…') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    sentences.push(current);

    let mut chunks = Vec::new();
    for sentence in sentences {
        let sentence = sentence.trim();
        if !sentence.chars().any(char::is_alphanumeric) {
            continue;
        }
        if sentence.chars().count() <= max_chars {
            chunks.push(sentence.to_string());
            continue;
        }

        let mut packed = String::new();
        for word in sentence.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > max_chars {
                if !packed.is_empty() {
                    chunks.push(std::mem::take(&mut packed));
                }
                let head: String = word.chars().take(max_chars).collect();
                word = word.chars().skip(max_chars).collect();
                chunks.push(head);
            }
            if word.is_empty() {
                continue;
            }
            let needed = if packed.is_empty() { word.chars().count() } else { packed.chars().count() + 1 + word.chars().count() };
            if needed > max_chars {
                chunks.push(std::mem::take(&mut packed));
            }
            if !packed.is_empty() {
                packed.push(' ');
            }
            packed.push_str(&word);
        }
        if !packed.is_empty() {
            chunks.push(packed);
        }
    }
    chunks
}
