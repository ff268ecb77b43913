use async_trait::async_trait;
use colored::*;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};

#[derive(Error, Debug)]
pub enum SpeechError {
    /// The input source is gone; no further utterances will arrive
    #[error("speech input closed")]
    InputClosed,

    #[error("speech device error: {0}")]
    Device(String),
}

#[async_trait]
pub trait Speech: Send + Sync {
    /// Say `text`; returns once it has been fully delivered
    async fn speak(&self, text: &str, language: &str);

    /// Next utterance, or an empty string on silence or timeout
    async fn listen(&self, language: &str) -> Result<String, SpeechError>;
}

/// Terminal stand-in for a microphone and speaker.
///
/// Output goes through a single lock so replies from concurrent callers
/// never interleave. Input is read line by line from a channel.
pub struct ConsoleSpeech {
    name: String,
    output: Mutex<()>,
    input: Mutex<mpsc::Receiver<String>>,
    listen_timeout: Duration,
}

impl ConsoleSpeech {
    /// Read utterances from stdin
    pub fn stdin(name: impl Into<String>, listen_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        Self::with_input(name, rx, listen_timeout)
    }

    pub fn with_input(
        name: impl Into<String>,
        input: mpsc::Receiver<String>,
        listen_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            output: Mutex::new(()),
            input: Mutex::new(input),
            listen_timeout,
        }
    }
}

#[async_trait]
impl Speech for ConsoleSpeech {
    async fn speak(&self, text: &str, _language: &str) {
        let _guard = self.output.lock().await;
        println!("{} {}", format!("{}:", self.name).cyan().bold(), text);
    }

    async fn listen(&self, _language: &str) -> Result<String, SpeechError> {
        let mut input = self.input.lock().await;
        match tokio::time::timeout(self.listen_timeout, input.recv()).await {
            Ok(Some(line)) => Ok(line.trim().to_string()),
            Ok(None) => Err(SpeechError::InputClosed),
            Err(_) => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listen_returns_lines_then_silence() {
        let (tx, rx) = mpsc::channel(4);
        let speech = ConsoleSpeech::with_input("SAMi", rx, Duration::from_millis(20));

        tx.send("  open spotify ".to_string()).await.unwrap();
        assert_eq!(speech.listen("en-in").await.unwrap(), "open spotify");
        assert_eq!(speech.listen("en-in").await.unwrap(), "");

        drop(tx);
        assert!(matches!(
            speech.listen("en-in").await,
            Err(SpeechError::InputClosed)
        ));
    }
}
