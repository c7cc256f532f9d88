use inquire::{Confirm, InquireError, Select, Text};

use crate::{PostcodeError, Result};

/// 交互接口：命名、确认、选择
///
/// 取消（Esc / Ctrl-C）返回 `None` 或 `false`，不是错误。
pub trait Prompter {
    fn ask_text(
        &mut self,
        prompt: &str,
        placeholder: &str,
        initial_value: Option<&str>,
    ) -> Result<Option<String>>;

    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// 返回被选中项的下标
    fn pick_one(&mut self, message: &str, items: &[String]) -> Result<Option<usize>>;

    /// 给用户的提示信息
    fn notify(&mut self, message: &str);
}

/// 基于 inquire 的终端交互
#[derive(Debug, Default)]
pub struct InquirePrompter;

fn cancelled<T>(result: std::result::Result<T, InquireError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(PostcodeError::PromptError(e.to_string())),
    }
}

impl Prompter for InquirePrompter {
    fn ask_text(
        &mut self,
        prompt: &str,
        placeholder: &str,
        initial_value: Option<&str>,
    ) -> Result<Option<String>> {
        let mut text = Text::new(prompt).with_placeholder(placeholder);
        if let Some(initial) = initial_value {
            text = text.with_initial_value(initial);
        }
        cancelled(text.prompt())
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        let answer = cancelled(Confirm::new(message).with_default(false).prompt())?;
        Ok(answer.unwrap_or(false))
    }

    fn pick_one(&mut self, message: &str, items: &[String]) -> Result<Option<usize>> {
        if items.is_empty() {
            return Ok(None);
        }
        let choice = cancelled(
            Select::new(message, items.to_vec())
                .with_page_size(15)
                .raw_prompt(),
        )?;
        Ok(choice.map(|option| option.index))
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}
