//! Console operator: menus and narration on stdout, answers from stdin.

use super::{Menu, Operator, OperatorError};
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct ConsoleOperator {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read_line(&mut self, prompt: &str) -> Result<String, OperatorError> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line),
            None => Err(OperatorError::Closed),
        }
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    async fn prompt_choice(&mut self, menu: &Menu) -> Result<String, OperatorError> {
        println!();
        println!("{}:", menu.title);
        for option in &menu.options {
            println!("{}. {}", option.key, option.label);
        }
        let line = self
            .read_line(&format!("Enter an option ({}): ", menu.key_range()))
            .await?;
        Ok(line.trim().to_string())
    }

    async fn prompt_free_text(&mut self, label: &str) -> Result<String, OperatorError> {
        self.read_line(&format!("{}: ", label)).await
    }

    fn notify(&mut self, line: &str) {
        println!("{}", line);
    }
}
