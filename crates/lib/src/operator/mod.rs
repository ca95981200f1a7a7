//! Operator capability: a human who picks from a menu, types free text, and reads narration.
//!
//! The approval and recovery state machines only talk to [`Operator`], so the console can be
//! swapped for any other front end.

mod console;

pub use console::ConsoleOperator;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    /// The input side is gone (e.g. stdin reached EOF); no further decisions are possible.
    #[error("operator input closed")]
    Closed,
    #[error("operator i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// What a menu entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Send,
    Edit,
    Discard,
    Terminate,
}

#[derive(Debug, Clone)]
pub struct MenuOption {
    /// Input that selects this option (e.g. "1").
    pub key: String,
    pub label: String,
    pub action: MenuAction,
}

/// Ordered list of labeled options.
#[derive(Debug, Clone)]
pub struct Menu {
    pub title: String,
    pub options: Vec<MenuOption>,
}

impl Menu {
    /// Four-way menu with keys 1-4 in the order send, edit, discard, terminate.
    pub fn four_way(title: &str, send: &str, edit: &str, discard: &str, terminate: &str) -> Self {
        let options = [
            (MenuAction::Send, send),
            (MenuAction::Edit, edit),
            (MenuAction::Discard, discard),
            (MenuAction::Terminate, terminate),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (action, label))| MenuOption {
            key: (i + 1).to_string(),
            label: label.to_string(),
            action,
        })
        .collect();
        Self {
            title: title.to_string(),
            options,
        }
    }

    /// Menu shown with each draft reply.
    pub fn approval() -> Self {
        Self::four_way(
            "Choose an action",
            "Send the suggested reply",
            "Edit, then send",
            "Ignore this message",
            "Quit the relay",
        )
    }

    /// Menu shown after a credential or agent failure.
    pub fn recovery() -> Self {
        Self::four_way(
            "Choose how to handle the error",
            "Send the default service-unavailable notice",
            "Write a custom reply",
            "Ignore this message",
            "Quit the relay",
        )
    }

    /// Action selected by raw operator input, if any (surrounding whitespace ignored).
    pub fn resolve(&self, input: &str) -> Option<MenuAction> {
        let input = input.trim();
        self.options
            .iter()
            .find(|o| o.key == input)
            .map(|o| o.action)
    }

    /// "1-4" style hint for the prompt.
    pub fn key_range(&self) -> String {
        match (self.options.first(), self.options.last()) {
            (Some(first), Some(last)) => format!("{}-{}", first.key, last.key),
            _ => String::new(),
        }
    }
}

/// Human operator.
#[async_trait]
pub trait Operator: Send {
    /// Show `menu` and return the raw input; validation is up to the caller.
    async fn prompt_choice(&mut self, menu: &Menu) -> Result<String, OperatorError>;

    /// Ask for free text labeled `label`.
    async fn prompt_free_text(&mut self, label: &str) -> Result<String, OperatorError>;

    /// Show a line of narration.
    fn notify(&mut self, line: &str);
}
