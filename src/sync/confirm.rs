//! Confirmation step for destructive operations.

use async_trait::async_trait;
use std::io::{BufRead, Write};

/// What the user is asked before a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub title: String,
    pub message: String,
}

impl DeletePrompt {
    pub fn for_resource(singular: &str) -> Self {
        Self {
            title: format!("Delete {}", singular),
            message: format!("Are you sure you want to delete this {}?", singular),
        }
    }
}

#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &DeletePrompt) -> bool;
}

/// Refuses everything. Used when no one can be asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

#[async_trait]
impl Confirm for NeverConfirm {
    async fn confirm(&self, _prompt: &DeletePrompt) -> bool {
        false
    }
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _prompt: &DeletePrompt) -> bool {
        true
    }
}

/// Asks on the terminal and accepts only `y`/`yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &DeletePrompt) -> bool {
        let prompt = prompt.clone();
        tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}\n{} [y/N] ", prompt.title, prompt.message);
            let _ = stdout.flush();

            let mut answer = String::new();
            if std::io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            is_yes(&answer)
        })
        .await
        .unwrap_or(false)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_text() {
        let prompt = DeletePrompt::for_resource("property");
        assert_eq!(prompt.title, "Delete property");
        assert_eq!(prompt.message, "Are you sure you want to delete this property?");
    }

    #[test]
    fn test_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_fixed_confirmers() {
        let prompt = DeletePrompt::for_resource("message");
        assert!(AutoConfirm.confirm(&prompt).await);
        assert!(!NeverConfirm.confirm(&prompt).await);
    }
}
