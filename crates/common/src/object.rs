//! Object layout helpers.
//!
//! An object is a prolog word followed by `size` payload cells, or a single
//! command word. Composite objects (programs, lists, vectors) store their
//! elements inline in the payload, one after the other.

use crate::error::WordError;
use crate::word::{LibId, Word};

/// Length in cells of the object at the start of `words`, checked against
/// the cells actually available.
pub fn object_len(words: &[Word]) -> Result<usize, WordError> {
    let head = words.first().ok_or(WordError::Truncated {
        expected: 1,
        found: 0,
    })?;
    let len = head.object_len();
    if len > words.len() {
        return Err(WordError::Truncated {
            expected: len,
            found: words.len(),
        });
    }
    Ok(len)
}

/// Split the first object off `words`.
pub fn split_object(words: &[Word]) -> Result<(&[Word], &[Word]), WordError> {
    let len = object_len(words)?;
    Ok(words.split_at(len))
}

/// Payload cells of a prolog object (empty for commands).
pub fn payload(object: &[Word]) -> &[Word] {
    match object.first() {
        Some(head) if head.is_prolog() => {
            let end = (1 + head.payload_size()).min(object.len());
            &object[1..end]
        }
        _ => &[],
    }
}

/// Iterator over the objects stored back to back in a payload.
pub struct Objects<'a> {
    rest: &'a [Word],
}

/// Iterate the elements of a composite payload.
pub fn objects(payload: &[Word]) -> Objects<'_> {
    Objects { rest: payload }
}

impl<'a> Iterator for Objects<'a> {
    type Item = Result<&'a [Word], WordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        match split_object(self.rest) {
            Ok((obj, rest)) => {
                self.rest = rest;
                Some(Ok(obj))
            }
            Err(e) => {
                self.rest = &[];
                Some(Err(e))
            }
        }
    }
}

// ---- Scalars ----

/// Encode a 64-bit integer object for `lib`.
pub fn pack_i64(lib: LibId, value: i64) -> [Word; 3] {
    let bits = value as u64;
    [
        Word::prolog(lib, 2),
        Word(bits as u32),
        Word((bits >> 32) as u32),
    ]
}

/// Decode a 64-bit integer object.
pub fn unpack_i64(object: &[Word]) -> Result<i64, WordError> {
    match payload(object) {
        [lo, hi] => Ok((((hi.0 as u64) << 32) | lo.0 as u64) as i64),
        _ => Err(WordError::MalformedPayload("expected two cells")),
    }
}

/// Encode a binary64 object for `lib`.
pub fn pack_f64(lib: LibId, value: f64) -> [Word; 3] {
    pack_i64(lib, value.to_bits() as i64)
}

/// Decode a binary64 object.
pub fn unpack_f64(object: &[Word]) -> Result<f64, WordError> {
    unpack_i64(object).map(|bits| f64::from_bits(bits as u64))
}

// ---- Text ----

/// Encode text as `[prolog, byte_len, packed bytes...]`, four bytes per cell,
/// little-endian.
pub fn pack_text(lib: LibId, text: &str) -> Result<Vec<Word>, WordError> {
    let bytes = text.as_bytes();
    let cells = bytes.len().div_ceil(4);
    let mut words = Vec::with_capacity(2 + cells);
    words.push(Word::try_prolog(lib, 1 + cells)?);
    words.push(Word(bytes.len() as u32));
    for chunk in bytes.chunks(4) {
        let mut quad = [0u8; 4];
        quad[..chunk.len()].copy_from_slice(chunk);
        words.push(Word(u32::from_le_bytes(quad)));
    }
    Ok(words)
}

/// Decode text packed by [`pack_text`].
pub fn unpack_text(object: &[Word]) -> Result<String, WordError> {
    let body = payload(object);
    let (len, cells) = body
        .split_first()
        .ok_or(WordError::MalformedPayload("missing text length"))?;
    let len = len.0 as usize;
    if len.div_ceil(4) != cells.len() {
        return Err(WordError::MalformedPayload("text length disagrees with size"));
    }
    let mut bytes: Vec<u8> = cells.iter().flat_map(|w| w.0.to_le_bytes()).collect();
    bytes.truncate(len);
    String::from_utf8(bytes).map_err(|_| WordError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_len_of_command() {
        let words = [Word::command(LibId::STACK, 0), Word::command(LibId::STACK, 1)];
        assert_eq!(object_len(&words), Ok(1));
    }

    #[test]
    fn object_len_truncated() {
        let words = [Word::prolog(LibId::INTEGER, 2), Word(1)];
        assert_eq!(
            object_len(&words),
            Err(WordError::Truncated {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn object_len_empty() {
        assert!(object_len(&[]).is_err());
    }

    #[test]
    fn iterate_inline_elements() {
        let mut list = vec![Word::prolog(LibId::LIST, 5)];
        list.extend_from_slice(&pack_i64(LibId::INTEGER, 1));
        list.push(Word::command(LibId::STACK, 3));
        list.push(Word::prolog(LibId::LIST, 0));
        let elems: Vec<_> = objects(payload(&list)).collect::<Result<_, _>>().unwrap();
        assert_eq!(elems.len(), 3);
        assert_eq!(elems[0].len(), 3);
        assert_eq!(elems[1], &[Word::command(LibId::STACK, 3)]);
        assert_eq!(elems[2], &[Word::prolog(LibId::LIST, 0)]);
    }

    #[test]
    fn iterate_reports_truncation_once() {
        let payload = [Word::prolog(LibId::INTEGER, 2)];
        let mut it = objects(&payload);
        assert!(matches!(it.next(), Some(Err(_))));
        assert!(it.next().is_none());
    }

    #[test]
    fn integers() {
        let obj = pack_i64(LibId::INTEGER, -42);
        assert_eq!(unpack_i64(&obj), Ok(-42));
        assert_eq!(obj[0], Word::prolog(LibId::INTEGER, 2));
    }

    #[test]
    fn reals_keep_bits() {
        let obj = pack_f64(LibId::REAL, -0.0);
        assert!(unpack_f64(&obj).unwrap().is_sign_negative());
    }

    #[test]
    fn text_layout() {
        let obj = pack_text(LibId::STRING, "hello").unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj[0], Word::prolog(LibId::STRING, 3));
        assert_eq!(obj[1], Word(5));
        assert_eq!(unpack_text(&obj).unwrap(), "hello");
    }

    #[test]
    fn empty_text() {
        let obj = pack_text(LibId::STRING, "").unwrap();
        assert_eq!(obj, vec![Word::prolog(LibId::STRING, 1), Word(0)]);
        assert_eq!(unpack_text(&obj).unwrap(), "");
    }

    #[test]
    fn text_with_inconsistent_length() {
        let obj = [Word::prolog(LibId::STRING, 2), Word(9), Word(0)];
        assert_eq!(
            unpack_text(&obj),
            Err(WordError::MalformedPayload("text length disagrees with size"))
        );
    }
}
