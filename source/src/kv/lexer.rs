use super::KVError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Open,
    Close,
    Str(String),
    /// A `[$PLATFORM]` style tag, kept verbatim.
    Condition(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub(super) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    escaped: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, escaped: bool) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            escaped,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Skip whitespace and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, KVError> {
        self.skip_trivia();
        let line = self.line;

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '{' => {
                self.bump();
                TokenKind::Open
            }
            '}' => {
                self.bump();
                TokenKind::Close
            }
            '"' => {
                self.bump();
                TokenKind::Str(self.quoted(line)?)
            }
            '[' => TokenKind::Condition(self.condition(line)?),
            _ => TokenKind::Str(self.bare()),
        };

        Ok(Some(Token { kind, line }))
    }

    fn quoted(&mut self, start_line: usize) -> Result<String, KVError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(KVError::syntax(start_line, "unterminated quoted string"));
            };
            match c {
                '"' => return Ok(out),
                '\\' if self.escaped => {
                    let Some(next) = self.bump() else {
                        return Err(KVError::syntax(start_line, "unterminated quoted string"));
                    };
                    match next {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '\\' | '"' | '\'' => out.push(next),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn condition(&mut self, start_line: usize) -> Result<String, KVError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
            if c == ']' {
                return Ok(self.src[start..self.pos].to_owned());
            }
        }
        Err(KVError::syntax(start_line, "unterminated conditional tag"))
    }

    fn bare(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | '"') || self.rest().starts_with("//")
            {
                break;
            }
            self.bump();
        }
        self.src[start..self.pos].to_owned()
    }
}
