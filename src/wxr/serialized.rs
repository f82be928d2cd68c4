//! Decoder for legacy PHP-serialized metadata blobs.
//!
//! WordPress term meta sometimes ships values in PHP's `serialize()` text
//! encoding instead of JSON. This decoder covers the subset that occurs in
//! exports: scalars (`s`, `i`, `d`, `b`, `N`) and string/int-keyed arrays.
//! Object payloads are rejected. String lengths count bytes, not
//! characters, so slicing happens on the raw byte stream.

/// A decoded serialized value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered key/value entries; integer keys are stringified.
    Array(Vec<(String, Value)>),
}

impl Value {
    /// Look up an array entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Array(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Decode a serialized value. Returns `None` on any malformed or
/// unsupported input, including trailing garbage.
#[must_use]
pub fn decode(input: &str) -> Option<Value> {
    let mut cursor = Cursor {
        bytes: input.trim().as_bytes(),
        pos: 0,
    };
    let value = parse_value(&mut cursor)?;
    if cursor.pos == cursor.bytes.len() {
        Some(value)
    } else {
        None
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn bump(&mut self) -> Option<u8> {
        let b = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, expected: u8) -> Option<()> {
        if self.bump()? == expected {
            Some(())
        } else {
            None
        }
    }

    /// Read raw text up to (and consuming) a delimiter.
    fn read_until(&mut self, delim: u8) -> Option<&'a str> {
        let start = self.pos;
        while self.bytes.get(self.pos).copied()? != delim {
            self.pos += 1;
        }
        let raw = self.bytes.get(start..self.pos)?;
        self.pos += 1;
        std::str::from_utf8(raw).ok()
    }

    fn read_int_until(&mut self, delim: u8) -> Option<i64> {
        self.read_until(delim)?.parse().ok()
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let raw = self.bytes.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(raw)
    }
}

fn parse_value(cursor: &mut Cursor<'_>) -> Option<Value> {
    match cursor.bump()? {
        b'N' => {
            cursor.expect(b';')?;
            Some(Value::Null)
        }
        b'b' => {
            cursor.expect(b':')?;
            let flag = match cursor.bump()? {
                b'0' => false,
                b'1' => true,
                _ => return None,
            };
            cursor.expect(b';')?;
            Some(Value::Bool(flag))
        }
        b'i' => {
            cursor.expect(b':')?;
            Some(Value::Int(cursor.read_int_until(b';')?))
        }
        b'd' => {
            cursor.expect(b':')?;
            cursor.read_until(b';')?.parse().ok().map(Value::Float)
        }
        b's' => {
            cursor.expect(b':')?;
            let len = usize::try_from(cursor.read_int_until(b':')?).ok()?;
            cursor.expect(b'"')?;
            let raw = cursor.take(len)?;
            let text = String::from_utf8_lossy(raw).into_owned();
            cursor.expect(b'"')?;
            cursor.expect(b';')?;
            Some(Value::Str(text))
        }
        b'a' => {
            cursor.expect(b':')?;
            let count = usize::try_from(cursor.read_int_until(b':')?).ok()?;
            cursor.expect(b'{')?;
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let key = match parse_value(cursor)? {
                    Value::Str(s) => s,
                    Value::Int(i) => i.to_string(),
                    _ => return None,
                };
                let value = parse_value(cursor)?;
                entries.push((key, value));
            }
            cursor.expect(b'}')?;
            Some(Value::Array(entries))
        }
        _ => None,
    }
}
