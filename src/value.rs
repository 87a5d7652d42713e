use std::fmt;

/// The six value kinds of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Byte,
    Int,
    Int64,
    Float,
    Double,
}

impl Kind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Byte => "byte",
            Kind::Int => "int",
            Kind::Int64 => "int64",
            Kind::Float => "float",
            Kind::Double => "double",
        }
    }

    /// Position in the arithmetic promotion order
    /// byte -> int -> int64 -> float -> double. Bool has none.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Kind::Bool => None,
            Kind::Byte => Some(0),
            Kind::Int => Some(1),
            Kind::Int64 => Some(2),
            Kind::Float => Some(3),
            Kind::Double => Some(4),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Kind::Byte | Kind::Int | Kind::Int64)
    }

    pub fn is_numeric(&self) -> bool {
        self.rank().is_some()
    }

    pub fn zero(&self) -> Value {
        match self {
            Kind::Bool => Value::Bool(false),
            Kind::Byte => Value::Byte(0),
            Kind::Int => Value::Int(0),
            Kind::Int64 => Value::Int64(0),
            Kind::Float => Value::Float(0.0),
            Kind::Double => Value::Double(0.0),
        }
    }

    pub fn one(&self) -> Value {
        match self {
            Kind::Bool => Value::Bool(true),
            Kind::Byte => Value::Byte(1),
            Kind::Int => Value::Int(1),
            Kind::Int64 => Value::Int64(1),
            Kind::Float => Value::Float(1.0),
            Kind::Double => Value::Double(1.0),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Byte(_) => Kind::Byte,
            Value::Int(_) => Kind::Int,
            Value::Int64(_) => Kind::Int64,
            Value::Float(_) => Kind::Float,
            Value::Double(_) => Kind::Double,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// Widening projection used by hosts; bool maps to 0/1.
    pub fn as_double(&self) -> f64 {
        match *self {
            Value::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Byte(n) => n as f64,
            Value::Int(n) => n as f64,
            Value::Int64(n) => n as f64,
            Value::Float(n) => n as f64,
            Value::Double(n) => n,
        }
    }

    pub(crate) fn as_f32(&self) -> f32 {
        match *self {
            Value::Bool(b) => b as u8 as f32,
            Value::Byte(n) => n as f32,
            Value::Int(n) => n as f32,
            Value::Int64(n) => n as f32,
            Value::Float(n) => n,
            Value::Double(n) => n as f32,
        }
    }

    /// Integer view: floating values are truncated toward zero.
    pub(crate) fn as_i64(&self) -> i64 {
        match *self {
            Value::Bool(b) => b as i64,
            Value::Byte(n) => n as i64,
            Value::Int(n) => n as i64,
            Value::Int64(n) => n,
            Value::Float(n) => n as i64,
            Value::Double(n) => n as i64,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            Value::Byte(n) => n != 0,
            Value::Int(n) => n != 0,
            Value::Int64(n) => n != 0,
            Value::Float(n) => n != 0.0,
            Value::Double(n) => n != 0.0,
        }
    }

    /// Conversion requested in source text with a type keyword. Every pair
    /// of kinds converts: numbers become bool by "nonzero", bool becomes 0/1.
    /// Floating values truncate to int64 (saturating) and narrower integers
    /// then wrap, so `byte(300.0)` and `byte(300)` agree.
    pub fn cast_explicit(self, kind: Kind) -> Value {
        if self.kind() == kind {
            return self;
        }
        match kind {
            Kind::Bool => Value::Bool(self.is_truthy()),
            Kind::Byte => Value::Byte(self.as_i64() as u8),
            Kind::Int => Value::Int(self.as_i64() as i32),
            Kind::Int64 => Value::Int64(self.as_i64()),
            Kind::Float => Value::Float(self.as_f32()),
            Kind::Double => Value::Double(self.as_double()),
        }
    }

    /// Conversion performed by the engine on assignment to a typed variable
    /// and on declaration initializers. Any number converts to any number;
    /// bool only converts to bool.
    pub fn cast_implicit(self, kind: Kind) -> Option<Value> {
        if self.kind() == kind {
            return Some(self);
        }
        if kind == Kind::Bool || self.kind() == Kind::Bool {
            return None;
        }
        Some(self.cast_explicit(kind))
    }

    /// Parses a numeric literal token.
    ///
    /// Accepted forms: `0x`/`0X` hexadecimal and `0b`/`0B` binary integers;
    /// otherwise `digits [. digits] [e|E [+|-] digits] [f|F|l|L]`. Integers
    /// that do not fit an `int` become `int64`. Returns `None` for malformed
    /// or out-of-range text.
    pub fn parse_literal(text: &str) -> Option<Value> {
        let bytes = text.as_bytes();
        if bytes.len() > 2 && bytes[0] == b'0' {
            let radix = match bytes[1] {
                b'x' | b'X' => Some(16),
                b'b' | b'B' => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                let digits = &text[2..];
                if !digits.chars().all(|c| c.is_digit(radix)) {
                    return None;
                }
                let value = u64::from_str_radix(digits, radix).ok()?;
                return integer_literal(value);
            }
        }

        let mut pos = 0;
        let digits_while = |mut pos: usize| {
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            pos
        };

        pos = digits_while(pos);
        if pos == 0 {
            return None;
        }

        let mut is_floating = false;
        if pos < bytes.len() && bytes[pos] == b'.' {
            is_floating = true;
            pos = digits_while(pos + 1);
        }

        if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
            is_floating = true;
            pos += 1;
            if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
                pos += 1;
            }
            let exponent_start = pos;
            pos = digits_while(pos);
            if pos == exponent_start {
                return None;
            }
        }

        let body = &text[..pos];
        let suffix = &text[pos..];

        match suffix {
            "" if is_floating => body.parse::<f64>().ok().map(Value::Double),
            "" => integer_literal(body.parse::<u64>().ok()?),
            "f" | "F" => body.parse::<f32>().ok().map(Value::Float),
            "l" | "L" if !is_floating => body.parse::<i64>().ok().map(Value::Int64),
            _ => None,
        }
    }
}

fn integer_literal(value: u64) -> Option<Value> {
    if value <= i32::MAX as u64 {
        Some(Value::Int(value as i32))
    } else if value <= i64::MAX as u64 {
        Some(Value::Int64(value as i64))
    } else {
        None
    }
}

/// Values print in literal form, so the output reads back as the same kind.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Byte(n) => write!(f, "byte({})", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}L", n),
            Value::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}f", n)
                } else {
                    write!(f, "{}f", n)
                }
            }
            Value::Double(n) => {
                // Always show at least one decimal place for doubles
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}
