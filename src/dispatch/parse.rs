/// Whether the text carried the configured prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    Prefixed,
    Bare,
}

/// Command token and arguments split out of a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation {
    pub mode: InvocationMode,
    /// Lowercased first token
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The body was the prefix and nothing else
    Empty,
    Invocation(ParsedInvocation),
}

/// Split a trimmed, non-empty body into mode, command token and arguments.
pub fn parse(body: &str, prefix: &str) -> ParseOutcome {
    let (mode, remainder) = match body.strip_prefix(prefix) {
        Some(rest) => (InvocationMode::Prefixed, rest.trim()),
        None => (InvocationMode::Bare, body),
    };

    let mut tokens = remainder.split_whitespace();
    let Some(command) = tokens.next() else {
        return ParseOutcome::Empty;
    };

    ParseOutcome::Invocation(ParsedInvocation {
        mode,
        command: command.to_lowercase(),
        args: tokens.map(String::from).collect(),
    })
}
