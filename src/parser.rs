/// Characters treated as blank when trimming a command line.
const WHITESPACE: &[char] = &[' ', '\n', '\r', '\t', '\x0c', '\x0b'];

/// States for the tokenizer state machine.
enum State {
    /// Between tokens — whitespace is skipped
    Normal,
    /// Building an unquoted word — whitespace ends it
    InWord,
    /// Inside double quotes — whitespace is preserved
    InDoubleQuote,
    /// Inside single quotes — everything is literal
    InSingleQuote,
}

/// Split a command line into owned argument strings.
///
/// Leading and trailing whitespace is dropped. Quotes group words and are
/// removed; a backslash makes the next character literal outside single quotes.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = input.trim_matches(WHITESPACE).chars().peekable();

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            (State::Normal, c) if WHITESPACE.contains(&c) => {}
            (State::Normal | State::InWord, '"') => state = State::InDoubleQuote,
            (State::Normal | State::InWord, '\'') => state = State::InSingleQuote,
            (State::Normal | State::InWord, '\\') => {
                current.push(chars.next().unwrap_or('\\'));
                state = State::InWord;
            }
            (State::Normal, c) => {
                current.push(c);
                state = State::InWord;
            }

            (State::InWord, c) if WHITESPACE.contains(&c) => {
                words.push(std::mem::take(&mut current));
                state = State::Normal;
            }
            (State::InWord, c) => current.push(c),

            (State::InDoubleQuote, '"') => state = State::InWord,
            (State::InDoubleQuote, '\\') => match chars.peek() {
                Some(&next) if matches!(next, '"' | '\\' | '$' | '`') => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push('\\'),
            },
            (State::InDoubleQuote, c) => current.push(c),

            (State::InSingleQuote, '\'') => state = State::InWord,
            (State::InSingleQuote, c) => current.push(c),
        }
    }

    // An empty "" or '' still counts as a word once its quote was seen.
    if !matches!(state, State::Normal) {
        words.push(current);
    }

    words
}

/// True when the last non-blank character of the line is `&`.
pub fn is_background(line: &str) -> bool {
    line.trim_end_matches(WHITESPACE).ends_with('&')
}

/// Remove a trailing `&` and the blanks around it. Other lines come back trimmed.
pub fn strip_background(line: &str) -> &str {
    let trimmed = line.trim_end_matches(WHITESPACE);
    match trimmed.strip_suffix('&') {
        Some(rest) => rest.trim_matches(WHITESPACE),
        None => trimmed.trim_start_matches(WHITESPACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_command() {
        assert_eq!(tokenize("echo hello world"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(tokenize("  \tkill  -9   3 \n"), vec!["kill", "-9", "3"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            tokenize(r#"sh -c 'sleep 1; exit 7'"#),
            vec!["sh", "-c", "sleep 1; exit 7"]
        );
        assert_eq!(tokenize(r#"echo "hello   world""#), vec!["echo", "hello   world"]);
        assert_eq!(tokenize(r#"he"llo wor"ld"#), vec!["hello world"]);
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(tokenize(r"echo hello\ world"), vec!["echo", "hello world"]);
        assert_eq!(tokenize(r#""a\"b""#), vec![r#"a"b"#]);
        assert_eq!(tokenize(r"foo\"), vec![r"foo\"]);
    }

    #[test]
    fn empty_quoted_args_survive() {
        assert_eq!(tokenize(r#"cmd "" ''"#), vec!["cmd", "", ""]);
    }

    #[test]
    fn background_marker_detection() {
        assert!(is_background("sleep 10&"));
        assert!(is_background("sleep 10 &  "));
        assert!(!is_background("sleep 10"));
        assert!(!is_background("   "));
    }

    #[test]
    fn background_marker_removal() {
        assert_eq!(strip_background("sleep 10 & "), "sleep 10");
        assert_eq!(strip_background("sleep 10&"), "sleep 10");
        assert_eq!(strip_background("  sleep 10 "), "sleep 10");
        assert_eq!(strip_background("&"), "");
    }
}
