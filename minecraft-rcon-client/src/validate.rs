//! Checks for operator-supplied text, applied by callers before a command
//! reaches the wire. The executor itself performs no content filtering.

/// Longest command accepted by [`validate_command`].
pub const MAX_COMMAND_LEN: usize = 1000;

/// Characters with no place in a console command: shell metacharacters and
/// line/NUL control bytes.
const FORBIDDEN_CHARS: &[char] = &[';', '&', '|', '$', '`', '\n', '\r', '\0'];

/// Why a command string was refused before being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("command is empty")]
    Empty,
    #[error("command contains forbidden character {0:?}")]
    ForbiddenChar(char),
    #[error("command exceeds {MAX_COMMAND_LEN} characters")]
    TooLong,
}

/// True when `name` has the shape of a Minecraft username: 3 to 16
/// alphanumeric-or-underscore characters.
pub fn is_valid_username(name: &str) -> bool {
    (3..=16).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a raw console command before execution.
pub fn validate_command(command: &str) -> Result<(), InvalidInput> {
    let command = command.trim();
    if command.is_empty() {
        return Err(InvalidInput::Empty);
    }
    if let Some(c) = command.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(InvalidInput::ForbiddenChar(c));
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(InvalidInput::TooLong);
    }
    Ok(())
}

/// Strip forbidden and control characters from free text and cap its length.
pub fn sanitize_text(value: &str, max_len: usize) -> String {
    value
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .take(max_len)
        .collect::<String>()
        .trim()
        .to_string()
}
