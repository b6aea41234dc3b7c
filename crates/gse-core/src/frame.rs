//! Decoding of one comma-delimited telemetry line into numeric fields.

use thiserror::Error;

pub const DELIMITER: char = ',';

/// Largest arity any protocol variant uses.
pub const MAX_ARITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected {expected} fields, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("field {index} is not a number: {field:?}")]
    NumericParse { index: usize, field: String },
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Ordered numeric fields of a single frame. Only ever built whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFrame {
    fields: [f64; MAX_ARITY],
    len: usize,
}

impl RawFrame {
    pub fn fields(&self) -> &[f64] {
        &self.fields[..self.len]
    }

    pub fn arity(&self) -> usize {
        self.len
    }
}

/// Split `line` on commas and parse every field as `f64`.
///
/// Surrounding whitespace (including a trailing `\r`) is ignored both on
/// the line and on each field. Either every field parses or the whole
/// call fails.
pub fn decode(line: &str, expected_arity: usize) -> Result<RawFrame, DecodeError> {
    let line = line.trim();
    let found = line.split(DELIMITER).count();
    if found != expected_arity || expected_arity > MAX_ARITY {
        return Err(DecodeError::ArityMismatch {
            expected: expected_arity,
            found,
        });
    }

    let mut fields = [0.0; MAX_ARITY];
    for (index, field) in line.split(DELIMITER).enumerate() {
        let field = field.trim();
        fields[index] = field.parse::<f64>().map_err(|_| DecodeError::NumericParse {
            index,
            field: field.to_string(),
        })?;
    }

    Ok(RawFrame {
        fields,
        len: expected_arity,
    })
}

/// Byte-level entry point used by the acquisition loop.
pub fn decode_bytes(line: &[u8], expected_arity: usize) -> Result<RawFrame, DecodeError> {
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::InvalidUtf8)?;
    decode(text, expected_arity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_voltage_frame() {
        let frame = decode("2.5,1.0,0.5,4.5", 4).unwrap();
        assert_eq!(frame.fields(), &[2.5, 1.0, 0.5, 4.5]);
    }

    #[test]
    fn tolerates_whitespace_and_carriage_return() {
        let frame = decode(" 10.0, 20.5 ,30,0.125,  7\r\n", 5).unwrap();
        assert_eq!(frame.fields(), &[10.0, 20.5, 30.0, 0.125, 7.0]);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            decode("1,2,3", 4),
            Err(DecodeError::ArityMismatch {
                expected: 4,
                found: 3
            })
        );
        assert!(matches!(
            decode("1,2,3,4,5", 4),
            Err(DecodeError::ArityMismatch { found: 5, .. })
        ));
    }

    #[test]
    fn empty_line_is_an_arity_mismatch() {
        assert!(matches!(
            decode("", 4),
            Err(DecodeError::ArityMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_field() {
        let err = decode("1.0,abc,3.0,4.0", 4).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NumericParse {
                index: 1,
                field: "abc".to_string()
            }
        );
    }

    #[test]
    fn rejects_empty_field() {
        assert!(matches!(
            decode("1.0,,3.0,4.0", 4),
            Err(DecodeError::NumericParse { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert_eq!(
            decode_bytes(&[0x31, 0xff, 0x2c], 2),
            Err(DecodeError::InvalidUtf8)
        );
    }
}
