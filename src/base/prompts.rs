//! Built-in prompt and reply templates.

use std::path::Path;

use tracing::warn;

/// System prompt handed to the agent through `SYSTEM_PROMPT` when none is configured.
pub const SYSTEM_PROMPT: &str = r#####"あなたは親切で有能なアシスタントです。ユーザーの質問や要望に対して、丁寧かつ適切に応答してください。

応答の際は以下の点に注意してください：
1. 明確で分かりやすい日本語を使用する
2. 必要に応じて箇条書きや見出しを使用して情報を整理する
3. 専門用語を使用する場合は適切な説明を加える
4. ユーザーの質問意図を理解し、的確な情報を提供する
5. 不確かな情報は提供せず、その旨を伝える"#####;

/// Reply posted in place of the agent output whenever generation fails.
pub const DEGRADED_MESSAGE: &str = "申し訳ございません。応答の生成中にエラーが発生しました。";

/// Reply to slash commands, which the bot does not handle.
pub const UNSUPPORTED_COMMAND_MESSAGE: &str = "No app commands are currently supported.";

/// Resolve a raw system prompt value, loading it from disk when it is a `.txt` path.
///
/// The file is read on every call, so the prompt can be edited without restarting the bot.
/// If it cannot be read, the configured value is used verbatim.
pub fn resolve_system_prompt(raw: &str) -> String {
    if !raw.ends_with(".txt") {
        return raw.to_string();
    }

    match std::fs::read_to_string(Path::new(raw)) {
        Ok(content) => content,
        Err(err) => {
            warn!("Failed to read system prompt file `{}`: {}", raw, err);
            raw.to_string()
        }
    }
}

// Tests.
