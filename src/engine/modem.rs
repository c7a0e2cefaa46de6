//! Modulation codec: bijective bit-string encoding of signed integers and
//! of cons-lists built from integers and `nil`.
//!
//! Integer layout: sign prefix (`01` positive, `10` negative), a unary
//! run of `1`s counting the nibbles of the magnitude, a `0` terminator,
//! then the magnitude as big-endian binary padded to whole nibbles. Zero
//! is the fixed string `010`. Lists: `nil` is `00`, a cell is `11`
//! followed by the encodings of head and tail.

use crate::arena::{Graph, Node, NodeId};
use crate::engine::unparse::unparse;
use crate::error::EvalError;

pub fn modulate(value: i64) -> String {
    if value == 0 {
        return "010".to_string();
    }
    let mut out = String::new();
    out.push_str(if value > 0 { "01" } else { "10" });
    let magnitude = value.unsigned_abs();
    let nibbles = (64 - magnitude.leading_zeros() as usize + 3) / 4;
    for _ in 0..nibbles {
        out.push('1');
    }
    out.push('0');
    out.push_str(&format!("{magnitude:0width$b}", width = nibbles * 4));
    out
}

/// Decode one integer from the front of `bits`; returns the value and the
/// unconsumed remainder.
pub fn demodulate(bits: &[u8]) -> Result<(i64, &[u8]), EvalError> {
    if bits.len() < 2 {
        return Err(EvalError::Encoding(
            "truncated integer: missing sign prefix".to_string(),
        ));
    }
    let negative = match &bits[..2] {
        b"01" => false,
        b"10" => true,
        other => {
            return Err(EvalError::Encoding(format!(
                "invalid sign prefix: {}",
                String::from_utf8_lossy(other)
            )))
        }
    };
    let mut rest = &bits[2..];
    let mut nibbles = 0usize;
    loop {
        match rest.first() {
            Some(b'1') => {
                nibbles += 1;
                rest = &rest[1..];
            }
            Some(b'0') => {
                rest = &rest[1..];
                break;
            }
            Some(other) => {
                return Err(EvalError::Encoding(format!(
                    "invalid bit in length prefix: {}",
                    *other as char
                )))
            }
            None => {
                return Err(EvalError::Encoding(
                    "truncated integer: missing length terminator".to_string(),
                ))
            }
        }
    }
    if nibbles == 0 {
        return Ok((0, rest));
    }
    if nibbles > 16 {
        return Err(EvalError::Encoding(format!(
            "magnitude of {nibbles} nibbles exceeds 64 bits"
        )));
    }
    let width = nibbles * 4;
    if rest.len() < width {
        return Err(EvalError::Encoding(
            "truncated integer: short magnitude".to_string(),
        ));
    }
    let (digits, rest) = rest.split_at(width);
    let mut magnitude: u64 = 0;
    for &bit in digits {
        magnitude = match bit {
            b'0' => magnitude << 1,
            b'1' => (magnitude << 1) | 1,
            other => {
                return Err(EvalError::Encoding(format!(
                    "invalid bit in magnitude: {}",
                    other as char
                )))
            }
        };
    }
    let value = if negative {
        if magnitude > 1 << 63 {
            return Err(EvalError::Encoding(format!(
                "magnitude {magnitude} out of range"
            )));
        }
        (magnitude as i128).wrapping_neg() as i64
    } else {
        if magnitude > i64::MAX as u64 {
            return Err(EvalError::Encoding(format!(
                "magnitude {magnitude} out of range"
            )));
        }
        magnitude as i64
    };
    Ok((value, rest))
}

/// Encode a fully forced list value (`nil`, a number, or a cons tree of
/// such) onto `out`.
pub fn modulate_list(g: &Graph, id: NodeId, out: &mut String) -> Result<(), EvalError> {
    match g.get(id) {
        Node::Fun(name) if name == "nil" => {
            out.push_str("00");
            Ok(())
        }
        Node::Num { value, .. } => {
            out.push_str(&modulate(*value));
            Ok(())
        }
        Node::Cons(head, tail) => {
            out.push_str("11");
            let (head, tail) = (*head, *tail);
            modulate_list(g, head, out)?;
            modulate_list(g, tail, out)
        }
        _ => Err(EvalError::TypeMismatch(format!(
            "cannot modulate: {}",
            unparse(g, id)
        ))),
    }
}

/// Decode one list value from the front of `bits`, allocating nodes into
/// `g`; returns the root and the unconsumed remainder.
pub fn demodulate_list<'a>(
    g: &mut Graph,
    bits: &'a [u8],
) -> Result<(NodeId, &'a [u8]), EvalError> {
    if bits.len() < 2 {
        return Err(EvalError::Encoding(
            "truncated list: missing tag".to_string(),
        ));
    }
    match &bits[..2] {
        b"00" => Ok((g.add(Node::fun("nil")), &bits[2..])),
        b"01" | b"10" => {
            let (value, rest) = demodulate(bits)?;
            Ok((g.add(Node::num(value)), rest))
        }
        b"11" => {
            let (head, rest) = demodulate_list(g, &bits[2..])?;
            let (tail, rest) = demodulate_list(g, rest)?;
            Ok((g.add(Node::Cons(head, tail)), rest))
        }
        other => Err(EvalError::Encoding(format!(
            "invalid list tag: {}",
            String::from_utf8_lossy(other)
        ))),
    }
}
