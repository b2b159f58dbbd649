//! A module implementing lexical analysis (tokenization) of a raw command line.
//!
//! Tokens are separated by runs of whitespace. A double-quoted span keeps its
//! whitespace, and inside it `\"` and `\\` stand for a literal quote and a
//! literal backslash. The quotes themselves are not part of the token.

use crate::error::LexingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote,
    ReadingEscape,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    /// Column of the quote that opened the current quoted span.
    quote_start: usize,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            quote_start: 0,
        }
    }

    fn make_tokens(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingQuote => self.handle_quote(ch),
                LexingState::ReadingEscape => self.handle_escape(ch),
            }
        }

        match self.state {
            LexingState::ReadingQuote | LexingState::ReadingEscape => {
                return Err(LexingError::UnterminatedQuote {
                    column: self.quote_start,
                });
            }
            LexingState::ReadingWord => out.push(std::mem::take(&mut self.buffer)),
            LexingState::Start => {}
        }

        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn open_quote(&mut self) {
        self.quote_start = self.pos - 1;
        self.state = LexingState::ReadingQuote;
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            '"' => self.open_quote(),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            c if c.is_whitespace() => {
                // An empty buffer here still came from `""`, which is a real token.
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            '"' => self.open_quote(),
            c => self.buffer.push(c),
        }
    }

    fn handle_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => self.state = LexingState::ReadingEscape,
            c => self.buffer.push(c),
        }
    }

    fn handle_escape(&mut self, ch: char) {
        if ch != '"' && ch != '\\' {
            self.buffer.push('\\');
        }
        self.buffer.push(ch);
        self.state = LexingState::ReadingQuote;
    }
}

/// Split a raw line into tokens. Blank lines give no tokens.
pub fn split_into_tokens(line: &str) -> Result<Vec<String>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokens(line: &str) -> Vec<String> {
        split_into_tokens(line).unwrap()
    }

    #[test]
    fn test_quoted_value_stays_together() {
        assert_eq!(
            tokens(r#"cmd -o value "a quoted value" 42"#),
            vec!["cmd", "-o", "value", "a quoted value", "42"]
        );
    }

    #[test]
    fn test_runs_of_whitespace() {
        assert_eq!(tokens("  a \t\t b   c  "), vec!["a", "b", "c"]);
        assert!(tokens("").is_empty());
        assert!(tokens(" \t \r\n ").is_empty());
    }

    #[test]
    fn test_escapes_inside_quotes() {
        assert_eq!(
            tokens(r#"say "she said \"hi\"" "back\\slash" "\n""#),
            vec!["say", r#"she said "hi""#, r"back\slash", r"\n"]
        );
    }

    #[test]
    fn test_backslash_outside_quotes_is_literal() {
        assert_eq!(tokens(r"path C:\temp\x"), vec!["path", r"C:\temp\x"]);
    }

    #[test]
    fn test_empty_quotes_make_an_empty_token() {
        assert_eq!(tokens(r#"set "" x"#), vec!["set", "", "x"]);
        assert_eq!(tokens(r#"set """#), vec!["set", ""]);
    }

    #[test]
    fn test_quotes_join_adjacent_text() {
        assert_eq!(tokens(r#"key="a b"c"#), vec!["key=a bc"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            split_into_tokens(r#"echo "open"#),
            Err(LexingError::UnterminatedQuote { column: 5 })
        );
        assert_eq!(
            split_into_tokens(r#"echo "trailing\"#),
            Err(LexingError::UnterminatedQuote { column: 5 })
        );
    }

    proptest! {
        /// Joining plain words with arbitrary whitespace splits back into those words.
        #[test]
        fn plain_words_survive(
            words in proptest::collection::vec("[a-zA-Z0-9_.-]{1,8}", 0..10),
            gap in "[ \t]{1,3}",
        ) {
            let line = words.join(&gap);
            prop_assert_eq!(split_into_tokens(&line).unwrap(), words);
        }

        /// Quoting a word with spaces yields exactly that word.
        #[test]
        fn quoted_phrases_survive(phrase in "[a-z ]{0,20}") {
            let line = format!("cmd \"{phrase}\"");
            prop_assert_eq!(split_into_tokens(&line).unwrap(), vec!["cmd".to_string(), phrase]);
        }

        /// The lexer never panics.
        #[test]
        fn never_panics(line in "\\PC*") {
            let _ = split_into_tokens(&line);
        }
    }
}
