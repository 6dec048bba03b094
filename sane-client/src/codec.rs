//! Conversion between typed option values and their raw word buffers.
//!
//! Numeric options are stored as consecutive native-endian words, strings as
//! a null-terminated byte buffer of the option's declared size.

use crate::{
    options::{ScannerOption, Type},
    result::{Result, SaneError},
};
use bstr::{BStr, BString, ByteSlice};
use std::fmt;

pub const WORD_SIZE: usize = std::mem::size_of::<i32>();

pub const FIXED_SCALE_SHIFT: u32 = 16;

pub const FIXED_SCALE: i32 = 1 << FIXED_SCALE_SHIFT;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Fixed(f64),
    String(BString),
    IntList(Vec<i32>),
    FixedList(Vec<f64>),
    /// Let the device pick its own value.
    Auto,
}

pub fn fixed_to_float(word: i32) -> f64 {
    f64::from(word) / f64::from(FIXED_SCALE)
}

/// Truncates toward zero onto the fixed-point grid.
pub fn float_to_fixed(value: f64) -> i32 {
    (value * f64::from(FIXED_SCALE)) as i32
}

/// Like [`float_to_fixed`], but fails for values the fixed-point word cannot
/// hold instead of saturating.
fn checked_fixed(value: f64) -> Result<i32> {
    let scaled = (value * f64::from(FIXED_SCALE)).trunc();

    if !scaled.is_finite() || scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
        return Err(SaneError::Inval);
    }

    Ok(scaled as i32)
}

pub fn decode(raw: &[u8], ty: Type, length: usize) -> Result<Value> {
    match ty {
        Type::Bool => Ok(Value::Bool(read_words(raw, 1)?[0] != 0)),
        Type::Int => {
            let words = read_words(raw, length)?;
            Ok(match words.as_slice() {
                [word] => Value::Int(*word),
                _ => Value::IntList(words),
            })
        }
        Type::Fixed => {
            let words = read_words(raw, length)?;
            Ok(match words.as_slice() {
                [word] => Value::Fixed(fixed_to_float(*word)),
                _ => Value::FixedList(words.into_iter().map(fixed_to_float).collect()),
            })
        }
        Type::String => {
            let end = raw.find_byte(0).unwrap_or(raw.len());
            Ok(Value::String(raw[..end].into()))
        }
        Type::Button | Type::Group | Type::Unsupported => Err(SaneError::Inval),
    }
}

/// Decodes a single constraint word of a numeric option.
pub fn decode_word(word: i32, ty: Type) -> Result<Value> {
    match ty {
        Type::Int => Ok(Value::Int(word)),
        Type::Fixed => Ok(Value::Fixed(fixed_to_float(word))),
        _ => Err(SaneError::Inval),
    }
}

pub fn encode(value: &Value, ty: Type, length: usize, size: usize) -> Result<Vec<u8>> {
    let mut raw = vec![0u8; size];

    match (ty, value) {
        (Type::Bool, Value::Bool(bool)) => write_words(&mut raw, [i32::from(*bool)])?,
        (Type::Int, Value::Int(int)) if length == 1 => write_words(&mut raw, [*int])?,
        (Type::Int, Value::IntList(ints)) if ints.len() == length => {
            write_words(&mut raw, ints.iter().copied())?
        }
        (Type::Fixed, Value::Fixed(fixed)) if length == 1 => {
            write_words(&mut raw, [checked_fixed(*fixed)?])?
        }
        (Type::Fixed, Value::FixedList(fixeds)) if fixeds.len() == length => {
            let words = fixeds
                .iter()
                .copied()
                .map(checked_fixed)
                .collect::<Result<Vec<_>>>()?;
            write_words(&mut raw, words)?
        }
        (Type::String, Value::String(str)) => {
            let Some(last) = raw.len().checked_sub(1) else {
                return Err(SaneError::Inval);
            };

            let len = str.len().min(raw.len());
            raw[..len].copy_from_slice(&str[..len]);
            raw[last] = 0;
        }
        _ => return Err(SaneError::Inval),
    }

    Ok(raw)
}

fn read_words(raw: &[u8], count: usize) -> Result<Vec<i32>> {
    if count == 0 || raw.len() < count * WORD_SIZE {
        return Err(SaneError::Inval);
    }

    Ok(raw
        .chunks_exact(WORD_SIZE)
        .take(count)
        .map(|chunk| i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn write_words<I>(raw: &mut [u8], words: I) -> Result<()>
where
    I: IntoIterator<Item = i32>,
{
    let mut chunks = raw.chunks_exact_mut(WORD_SIZE);

    for word in words {
        let chunk = chunks.next().ok_or(SaneError::Inval)?;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }

    Ok(())
}

impl Value {
    /// Parses a textual value the way it would be typed on a command line or
    /// written in a config file.
    pub fn parse_for(option: &ScannerOption, text: &BStr) -> Result<Self> {
        if option.is_auto_settable() && text == "auto" {
            return Ok(Self::Auto);
        }

        if let Type::String = option.ty {
            return Ok(Self::String(text.into()));
        }

        let text = text.to_str().map_err(|_| SaneError::Inval)?.trim();

        match option.ty {
            Type::Bool => match text {
                "yes" | "true" | "1" => Ok(Self::Bool(true)),
                "no" | "false" | "0" => Ok(Self::Bool(false)),
                _ => Err(SaneError::Inval),
            },
            Type::Int => {
                let ints = parse_list::<i32>(text)?;
                Ok(match ints.as_slice() {
                    [int] if option.length == 1 => Self::Int(*int),
                    _ => Self::IntList(ints),
                })
            }
            Type::Fixed => {
                let fixeds = parse_list::<f64>(text)?;
                Ok(match fixeds.as_slice() {
                    [fixed] if option.length == 1 => Self::Fixed(*fixed),
                    _ => Self::FixedList(fixeds),
                })
            }
            Type::String | Type::Button | Type::Group | Type::Unsupported => {
                Err(SaneError::Inval)
            }
        }
    }
}

fn parse_list<T: std::str::FromStr>(text: &str) -> Result<Vec<T>> {
    text.split(',')
        .map(|item| item.trim().parse().map_err(|_| SaneError::Inval))
        .collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Self::Bool(bool) => write!(f, "{bool}"),
            Self::Int(int) => write!(f, "{int}"),
            Self::Fixed(fixed) => write!(f, "{fixed}"),
            Self::String(str) => write!(f, "{str}"),
            Self::IntList(ints) => list(f, ints),
            Self::FixedList(fixeds) => list(f, fixeds),
            Self::Auto => f.write_str("auto"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(words: &[i32]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_ne_bytes()).collect()
    }

    #[test]
    fn bool_decodes_any_non_zero_word_as_true() {
        assert_eq!(decode(&words(&[0]), Type::Bool, 1), Ok(Value::Bool(false)));
        assert_eq!(decode(&words(&[1]), Type::Bool, 1), Ok(Value::Bool(true)));
        assert_eq!(decode(&words(&[-7]), Type::Bool, 1), Ok(Value::Bool(true)));
    }

    #[test]
    fn fixed_uses_sixteen_bit_scale() {
        assert_eq!(FIXED_SCALE, 65536);
        assert_eq!(fixed_to_float(0x0001_8000), 1.5);
        assert_eq!(float_to_fixed(-2.25), -0x0002_4000);

        // Below grid resolution truncates toward zero.
        assert_eq!(float_to_fixed(1.0 / 131072.0), 0);
        assert_eq!(float_to_fixed(-1.0 / 131072.0), 0);
    }

    #[test]
    fn unrepresentable_fixed_is_rejected() {
        assert_eq!(encode(&Value::Fixed(40000.0), Type::Fixed, 1, 4), Err(SaneError::Inval));
        assert_eq!(encode(&Value::Fixed(-40000.0), Type::Fixed, 1, 4), Err(SaneError::Inval));
        assert_eq!(encode(&Value::Fixed(f64::NAN), Type::Fixed, 1, 4), Err(SaneError::Inval));
        assert_eq!(
            encode(&Value::Fixed(f64::INFINITY), Type::Fixed, 1, 4),
            Err(SaneError::Inval)
        );
        assert_eq!(
            encode(&Value::FixedList(vec![1.0, f64::NAN]), Type::Fixed, 2, 8),
            Err(SaneError::Inval)
        );
    }

    #[test]
    fn fixed_edges_still_encode() {
        assert_eq!(
            encode(&Value::Fixed(-32768.0), Type::Fixed, 1, 4),
            Ok(words(&[i32::MIN]))
        );
        assert_eq!(
            encode(&Value::Fixed(32767.99999), Type::Fixed, 1, 4),
            Ok(words(&[float_to_fixed(32767.99999)]))
        );
        assert_eq!(
            encode(&Value::Fixed(-1.0 / 131072.0), Type::Fixed, 1, 4),
            Ok(words(&[0]))
        );
    }

    #[test]
    fn vectors_decode_in_order() {
        let raw = words(&[3, -1, 42]);
        assert_eq!(
            decode(&raw, Type::Int, 3),
            Ok(Value::IntList(vec![3, -1, 42]))
        );

        let raw = words(&[65536, 32768]);
        assert_eq!(
            decode(&raw, Type::Fixed, 2),
            Ok(Value::FixedList(vec![1.0, 0.5]))
        );
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert_eq!(decode(&[0, 0], Type::Int, 1), Err(SaneError::Inval));
        assert_eq!(decode(&words(&[1]), Type::Int, 2), Err(SaneError::Inval));
    }

    #[test]
    fn string_stops_at_first_null() {
        let raw = b"Color\0garbage\0";
        assert_eq!(
            decode(raw, Type::String, 1),
            Ok(Value::String("Color".into()))
        );
        assert_eq!(
            decode(b"unterminated", Type::String, 1),
            Ok(Value::String("unterminated".into()))
        );
    }

    #[test]
    fn string_encoding_forces_terminator() {
        let raw = encode(&Value::String("Gray".into()), Type::String, 1, 8).unwrap();
        assert_eq!(raw, b"Gray\0\0\0\0");

        let raw = encode(&Value::String("12345678".into()), Type::String, 1, 8).unwrap();
        assert_eq!(raw, b"1234567\0");

        let raw = encode(&Value::String("1234567890".into()), Type::String, 1, 8).unwrap();
        assert_eq!(raw, b"1234567\0");

        assert_eq!(
            encode(&Value::String("x".into()), Type::String, 1, 0),
            Err(SaneError::Inval)
        );
    }

    #[test]
    fn mismatched_type_or_length_is_invalid() {
        assert_eq!(
            encode(&Value::Int(1), Type::Bool, 1, 4),
            Err(SaneError::Inval)
        );
        assert_eq!(
            encode(&Value::Fixed(1.0), Type::Int, 1, 4),
            Err(SaneError::Inval)
        );
        assert_eq!(
            encode(&Value::Int(1), Type::Int, 3, 12),
            Err(SaneError::Inval)
        );
        assert_eq!(
            encode(&Value::IntList(vec![1, 2]), Type::Int, 3, 12),
            Err(SaneError::Inval)
        );
        assert_eq!(
            encode(&Value::Auto, Type::Int, 1, 4),
            Err(SaneError::Inval)
        );
    }

    #[test]
    fn round_trips_every_kind() {
        let cases = [
            (Value::Bool(true), Type::Bool, 1, 4),
            (Value::Int(-42), Type::Int, 1, 4),
            (Value::IntList(vec![1, 2, 3, 4, 5, 6]), Type::Int, 6, 24),
            (Value::Fixed(792985.0 / 65536.0), Type::Fixed, 1, 4),
            (Value::FixedList(vec![0.5, -32.75]), Type::Fixed, 2, 8),
            (Value::String("Hello world!".into()), Type::String, 1, 32),
        ];

        for (value, ty, length, size) in cases {
            let raw = encode(&value, ty, length, size).unwrap();
            assert_eq!(raw.len(), size);

            let decoded = decode(&raw, ty, length).unwrap();
            assert_eq!(decoded, value, "{ty:?} x{length}");
            assert_eq!(encode(&decoded, ty, length, size).unwrap(), raw);
        }
    }

    #[test]
    fn single_element_list_encodes_like_scalar() {
        assert_eq!(
            encode(&Value::IntList(vec![7]), Type::Int, 1, 4),
            encode(&Value::Int(7), Type::Int, 1, 4)
        );
    }

    #[test]
    fn constraint_words() {
        assert_eq!(decode_word(5, Type::Int), Ok(Value::Int(5)));
        assert_eq!(decode_word(2 << 16, Type::Fixed), Ok(Value::Fixed(2.0)));
        assert_eq!(decode_word(5, Type::String), Err(SaneError::Inval));
    }

    #[test]
    fn display() {
        assert_eq!(Value::IntList(vec![1, -2]).to_string(), "1,-2");
        assert_eq!(Value::Fixed(2.5).to_string(), "2.5");
        assert_eq!(Value::Auto.to_string(), "auto");
    }
}
