//! Benchmark dataset
//!
//! A JSON array of question/answer pairs, optionally carrying Wikipedia
//! links that get appended to the prompt. Both benchmark arms always use the
//! identical, link-augmented prompt text.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dataset loading errors
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One dataset item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "Prompt")]
    pub prompt: String,
    #[serde(rename = "Answer")]
    pub answer: String,
    #[serde(default)]
    pub reasoning_types: String,
    #[serde(default)]
    pub wiki_links: Vec<String>,
}

impl Question {
    /// The prompt with relevant article links appended
    pub fn enhanced_prompt(&self) -> String {
        if self.wiki_links.is_empty() {
            return self.prompt.clone();
        }
        let links = self
            .wiki_links
            .iter()
            .map(|link| format!("- {}", link))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\nRelevant Wikipedia articles:\n{}", self.prompt, links)
    }
}

/// Load a dataset file
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<Question>, DatasetError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_enhanced_prompt_appends_links() {
        let question = Question {
            prompt: "Who discovered Zirconium?".to_string(),
            answer: "Martin Heinrich Klaproth".to_string(),
            reasoning_types: String::new(),
            wiki_links: vec![
                "https://en.wikipedia.org/wiki/Zirconium".to_string(),
                "https://en.wikipedia.org/wiki/Martin_Heinrich_Klaproth".to_string(),
            ],
        };

        let prompt = question.enhanced_prompt();
        assert!(prompt.starts_with("Who discovered Zirconium?"));
        assert!(prompt.contains("Relevant Wikipedia articles:"));
        assert!(prompt.contains("- https://en.wikipedia.org/wiki/Zirconium"));
    }

    #[test]
    fn test_enhanced_prompt_without_links_is_unchanged() {
        let question = Question {
            prompt: "2+2?".to_string(),
            answer: "4".to_string(),
            reasoning_types: String::new(),
            wiki_links: Vec::new(),
        };
        assert_eq!(question.enhanced_prompt(), "2+2?");
    }

    #[test]
    fn test_load_dataset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{ "Prompt": "2+2?", "Answer": "4", "reasoning_types": "math", "wiki_links": [] }}]"#
        )
        .unwrap();

        let questions = load_dataset(file.path()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "4");
    }

    #[test]
    fn test_load_dataset_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            load_dataset(file.path()),
            Err(DatasetError::Json(_))
        ));
    }
}
