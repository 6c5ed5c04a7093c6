//! Tolerant extraction of structured data from completion payloads.
//!
//! Models wrap JSON in markdown fences, prepend chatter, or get cut off at
//! the token limit. [`sanitize`] pulls the completion text out of the
//! payload, strips the fencing and parses as much JSON as forms valid
//! structure. A truncated document is closed where it stops: unterminated
//! strings and literals are dropped together with their key, open
//! containers are closed, a number cut at the end is kept.
//!
//! Only input with no JSON structure at all, or with a genuine syntax error
//! (as opposed to a premature end), is rejected with [`LlmError::Parse`].

use serde_json::{Map, Number, Value};

use crate::error::LlmError;

/// JSON pointer to the completion text in a chat-completion payload.
const CONTENT_POINTER: &str = "/choices/0/message/content";

/// Nesting limit for the partial parser.
const MAX_DEPTH: usize = 128;

/// Extract, clean and tolerantly parse the completion text of `payload`.
pub fn sanitize(payload: &Value) -> Result<Value, LlmError> {
    let content = extract_content(payload)?;
    parse_partial_json(&clean_json_text(content))
}

/// Completion text at `choices[0].message.content`.
pub fn extract_content(payload: &Value) -> Result<&str, LlmError> {
    payload
        .pointer(CONTENT_POINTER)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            LlmError::Parse("payload has no choices[0].message.content text".to_string())
        })
}

/// Strip markdown code fences and wrapping backticks.
pub fn clean_json_text(text: &str) -> String {
    let without_fences = text.replace("```json", "").replace("```", "");
    without_fences
        .trim()
        .trim_matches('`')
        .trim()
        .to_string()
}

/// Parse the first JSON object or array in `text`, accepting truncation.
pub fn parse_partial_json(text: &str) -> Result<Value, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::Parse("model output is empty".to_string()));
    }

    let start = text
        .find(['{', '['])
        .ok_or_else(|| LlmError::Parse("no JSON structure found in model output".to_string()))?;

    let mut parser = PartialParser::new(&text[start..]);
    match parser.parse_value(0) {
        Ok(Outcome::Complete(value)) | Ok(Outcome::Truncated(Some(value))) => Ok(value),
        Ok(Outcome::Truncated(None)) => Err(LlmError::Parse(
            "model output ended before any structure".to_string(),
        )),
        Err(msg) => Err(LlmError::Parse(msg)),
    }
}

/// Result of parsing one value.
#[derive(Debug)]
enum Outcome {
    /// The value was fully present
    Complete(Value),
    /// Input ended inside the value; `None` when nothing of it is usable
    Truncated(Option<Value>),
}

struct PartialParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> PartialParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn syntax_error(&self, expected: &str) -> String {
        match self.peek() {
            Some(c) => format!("expected {} at byte {}, found '{}'", expected, self.pos, c),
            None => format!("expected {} at end of input", expected),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Outcome, String> {
        if depth > MAX_DEPTH {
            return Err("JSON nesting too deep".to_string());
        }

        self.skip_ws();
        match self.peek() {
            None => Ok(Outcome::Truncated(None)),
            Some('{') => self.parse_object(depth),
            Some('[') => self.parse_array(depth),
            Some('"') => Ok(match self.parse_string()? {
                Some(s) => Outcome::Complete(Value::String(s)),
                None => Outcome::Truncated(None),
            }),
            Some('t') => self.parse_literal("true", Value::Bool(true)),
            Some('f') => self.parse_literal("false", Value::Bool(false)),
            Some('n') => self.parse_literal("null", Value::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(_) => Err(self.syntax_error("a JSON value")),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Outcome, String> {
        self.bump(); // '{'
        let mut map = Map::new();
        let mut first = true;

        loop {
            self.skip_ws();
            match self.peek() {
                None => return Ok(Outcome::Truncated(Some(Value::Object(map)))),
                Some('}') => {
                    self.bump();
                    return Ok(Outcome::Complete(Value::Object(map)));
                }
                Some(',') if !first => {
                    self.bump();
                    self.skip_ws();
                    if self.peek().is_none() {
                        return Ok(Outcome::Truncated(Some(Value::Object(map))));
                    }
                }
                Some(_) if !first => return Err(self.syntax_error("',' or '}'")),
                Some(_) => {}
            }
            first = false;

            if self.peek() != Some('"') {
                return Err(self.syntax_error("an object key"));
            }
            let key = match self.parse_string()? {
                Some(key) => key,
                None => return Ok(Outcome::Truncated(Some(Value::Object(map)))),
            };

            self.skip_ws();
            match self.peek() {
                None => return Ok(Outcome::Truncated(Some(Value::Object(map)))),
                Some(':') => {
                    self.bump();
                }
                Some(_) => return Err(self.syntax_error("':'")),
            }

            match self.parse_value(depth + 1)? {
                Outcome::Complete(value) => {
                    map.insert(key, value);
                }
                Outcome::Truncated(partial) => {
                    if let Some(value) = partial {
                        map.insert(key, value);
                    }
                    return Ok(Outcome::Truncated(Some(Value::Object(map))));
                }
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Outcome, String> {
        self.bump(); // '['
        let mut items = Vec::new();
        let mut first = true;

        loop {
            self.skip_ws();
            match self.peek() {
                None => return Ok(Outcome::Truncated(Some(Value::Array(items)))),
                Some(']') => {
                    self.bump();
                    return Ok(Outcome::Complete(Value::Array(items)));
                }
                Some(',') if !first => {
                    self.bump();
                }
                Some(_) if !first => return Err(self.syntax_error("',' or ']'")),
                Some(_) => {}
            }
            first = false;

            match self.parse_value(depth + 1)? {
                Outcome::Complete(value) => items.push(value),
                Outcome::Truncated(partial) => {
                    if let Some(value) = partial {
                        items.push(value);
                    }
                    return Ok(Outcome::Truncated(Some(Value::Array(items))));
                }
            }
        }
    }

    /// Parse a string starting at the opening quote. `None` if unterminated.
    fn parse_string(&mut self) -> Result<Option<String>, String> {
        self.bump(); // '"'
        let mut out = String::new();

        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => return Ok(None),
            };
            match c {
                '"' => return Ok(Some(out)),
                '\\' => {
                    let escaped = match self.bump() {
                        Some(e) => e,
                        None => return Ok(None),
                    };
                    match escaped {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => match self.parse_unicode_escape()? {
                            Some(ch) => out.push(ch),
                            None => return Ok(None),
                        },
                        other => return Err(format!("invalid escape '\\{}'", other)),
                    }
                }
                other => out.push(other),
            }
        }
    }

    fn read_hex4(&mut self) -> Result<Option<u32>, String> {
        let rest = &self.src[self.pos..];
        let digits: String = rest.chars().take(4).collect();
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("invalid unicode escape".to_string());
        }
        if digits.len() < 4 {
            return Ok(None);
        }
        let code = u32::from_str_radix(&digits, 16)
            .map_err(|_| "invalid unicode escape".to_string())?;
        self.pos += 4;
        Ok(Some(code))
    }

    fn parse_unicode_escape(&mut self) -> Result<Option<char>, String> {
        let high = match self.read_hex4()? {
            Some(code) => code,
            None => return Ok(None),
        };

        if (0xD800..0xDC00).contains(&high) {
            let rest = &self.src[self.pos..];
            if rest.is_empty() || rest == "\\" {
                return Ok(None);
            }
            if !rest.starts_with("\\u") {
                return Err("unpaired surrogate in unicode escape".to_string());
            }
            self.pos += 2;
            let low = match self.read_hex4()? {
                Some(code) => code,
                None => return Ok(None),
            };
            if !(0xDC00..0xE000).contains(&low) {
                return Err("invalid low surrogate in unicode escape".to_string());
            }
            let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(combined)
                .map(Some)
                .ok_or_else(|| "invalid unicode escape".to_string());
        }

        char::from_u32(high)
            .map(Some)
            .ok_or_else(|| "invalid unicode escape".to_string())
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Outcome, String> {
        let rest = &self.src[self.pos..];
        if rest.starts_with(word) {
            self.pos += word.len();
            return Ok(Outcome::Complete(value));
        }
        if word.starts_with(rest) {
            self.pos = self.src.len();
            return Ok(Outcome::Truncated(None));
        }
        Err(self.syntax_error(word))
    }

    fn parse_number(&mut self) -> Result<Outcome, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = &self.src[start..self.pos];
        let at_end = self.pos == self.src.len();

        match serde_json::from_str::<Number>(text) {
            Ok(number) => Ok(Outcome::Complete(Value::Number(number))),
            Err(_) if at_end => Ok(Outcome::Truncated(None)),
            Err(_) => Err(format!("invalid number '{}'", text)),
        }
    }
}
