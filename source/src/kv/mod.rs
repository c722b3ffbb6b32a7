// KeyValues (KV1 / VDF) text, the format .vmt files are written in.
//
// https://developer.valvesoftware.com/wiki/KeyValues

mod lexer;

use std::mem;

use thiserror::Error;

use self::lexer::{Lexer, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVError {
    #[error("syntax error on line {line}: {reason}")]
    Syntax { line: usize, reason: String },
}

impl KVError {
    fn syntax(line: usize, reason: impl Into<String>) -> Self {
        KVError::Syntax {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Block(Vec<KeyValue>),
}

/// One `key value` or `key { ... }` pair.
///
/// Keys keep their case but every lookup compares them case-insensitively. Duplicate keys
/// are kept in document order; [`KeyValue::get`] returns the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    key: String,
    value: Value,
    condition: Option<String>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            condition: None,
        }
    }

    pub fn scalar(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::Scalar(value.into()))
    }

    pub fn block(key: impl Into<String>, children: Vec<KeyValue>) -> Self {
        Self::new(key, Value::Block(children))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Trailing `[$...]` tag, verbatim. Never evaluated.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Scalar(s) => Some(s),
            Value::Block(_) => None,
        }
    }

    /// Children of a block, empty for a scalar.
    pub fn children(&self) -> &[KeyValue] {
        match &self.value {
            Value::Scalar(_) => &[],
            Value::Block(children) => children,
        }
    }

    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        self.children().iter().rev().find(|kv| kv.is_key(key))
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a KeyValue> + 'a {
        self.children().iter().filter(move |kv| kv.is_key(key))
    }

    /// Every node below this one, depth first in document order.
    pub fn descendants(&self) -> Vec<&KeyValue> {
        let mut out = Vec::new();
        let mut stack: Vec<&KeyValue> = self.children().iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().iter().rev());
        }
        out
    }

    /// Number of scalar values below this node, or 1 for a scalar.
    pub fn leaf_count(&self) -> usize {
        if self.as_str().is_some() {
            return 1;
        }
        self.descendants()
            .iter()
            .filter(|kv| kv.as_str().is_some())
            .count()
    }
}

// Deeply nested input would otherwise overflow the stack on drop.
impl Drop for KeyValue {
    fn drop(&mut self) {
        let Value::Block(children) = &mut self.value else {
            return;
        };
        let mut stack = mem::take(children);
        while let Some(mut node) = stack.pop() {
            if let Value::Block(children) = &mut node.value {
                stack.append(children);
            }
        }
    }
}

struct OpenBlock {
    key: String,
    line: usize,
    children: Vec<KeyValue>,
}

/// Parse KeyValues text into a tree.
///
/// The returned root has an empty key and holds the top level pairs as its children. With
/// `escaped` set, `\"`, `\\`, `\n`, `\t`, `\r` and `\'` inside quoted strings are decoded;
/// otherwise backslashes are kept as written, which is what Windows style texture paths in
/// materials need.
pub fn parse(text: &[u8], escaped: bool) -> Result<KeyValue, KVError> {
    let text = String::from_utf8_lossy(text);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut lexer = Lexer::new(text, escaped);
    let mut stack = vec![OpenBlock {
        key: String::new(),
        line: 1,
        children: Vec::new(),
    }];

    while let Some(token) = lexer.next_token()? {
        match token.kind {
            TokenKind::Str(key) => {
                let Some(value) = lexer.next_token()? else {
                    return Err(KVError::syntax(
                        token.line,
                        format!("key {key:?} has no value"),
                    ));
                };
                match value.kind {
                    TokenKind::Str(v) | TokenKind::Condition(v) => {
                        current(&mut stack).push(KeyValue::scalar(key, v));
                    }
                    TokenKind::Open => stack.push(OpenBlock {
                        key,
                        line: value.line,
                        children: Vec::new(),
                    }),
                    TokenKind::Close => {
                        return Err(KVError::syntax(
                            value.line,
                            format!("expected value for key {key:?}, found '}}'"),
                        ))
                    }
                }
            }
            TokenKind::Close => {
                if stack.len() == 1 {
                    return Err(KVError::syntax(token.line, "unexpected '}'"));
                }
                if let Some(block) = stack.pop() {
                    current(&mut stack).push(KeyValue::block(block.key, block.children));
                }
            }
            TokenKind::Open => {
                return Err(KVError::syntax(token.line, "expected key, found '{'"));
            }
            TokenKind::Condition(tag) => match current(&mut stack).last_mut() {
                Some(last) if last.condition.is_none() => last.condition = Some(tag),
                _ => {
                    return Err(KVError::syntax(
                        token.line,
                        format!("conditional {tag} does not follow a value"),
                    ))
                }
            },
        }
    }

    if stack.len() > 1 {
        let line = stack.last().map_or(1, |b| b.line);
        return Err(KVError::syntax(
            lexer.line(),
            format!("block opened on line {line} is never closed"),
        ));
    }

    let root = stack.pop().map(|b| b.children).unwrap_or_default();
    Ok(KeyValue::block("", root))
}

fn current(stack: &mut [OpenBlock]) -> &mut Vec<KeyValue> {
    // The root block is never popped.
    &mut stack[stack.len() - 1].children
}
