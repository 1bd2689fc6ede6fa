//! Decoder for Airnode ABI encoded request parameters.
//!
//! Layout, in 32-byte words:
//!
//! ```text
//! header      "1" followed by one type character per parameter, zero padded
//! name_0      bytes32 string
//! value_0     static value, or offset of a dynamic value from the start of the data
//! name_1 ...
//! tail        length-prefixed payloads of dynamic values
//! ```
//!
//! Types: `b` bytes32, `s` string32, `a` address, `u` uint256, `i` int256 (static) and
//! `B` bytes, `S` string (dynamic). Empty input encodes zero parameters.

use alloy::primitives::{Address, Bytes, B256, I256, U256};
use thiserror::Error;

const WORD: usize = 32;
const ENCODING_VERSION: u8 = b'1';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("encoded parameters are {0} bytes, not a whole number of words")]
    UnalignedLength(usize),
    #[error("unsupported encoding version {0:#04x}")]
    UnsupportedVersion(u8),
    #[error("unknown parameter type {0:?}")]
    UnknownType(char),
    #[error("data ends before word {0}")]
    Truncated(usize),
    #[error("parameter {0} is not valid UTF-8")]
    InvalidUtf8(String),
    #[error("address parameter {0} has dirty high bytes")]
    InvalidAddress(String),
    #[error("dynamic parameter {name} has an out of range offset or length")]
    InvalidOffset { name: String },
}

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bytes32(B256),
    String32(String),
    Address(Address),
    Uint(U256),
    Int(I256),
    Bytes(Bytes),
    String(String),
}

/// A named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    data.get(index * WORD..(index + 1) * WORD).ok_or(AbiError::Truncated(index))
}

/// Reads a zero-padded `bytes32` string.
fn string32(raw: &[u8], name: &str) -> Result<String, AbiError> {
    let end = raw.iter().position(|&byte| byte == 0).unwrap_or(raw.len());
    String::from_utf8(raw[..end].to_vec()).map_err(|_| AbiError::InvalidUtf8(name.to_string()))
}

fn dynamic<'a>(data: &'a [u8], head: &[u8], name: &str) -> Result<&'a [u8], AbiError> {
    let invalid = || AbiError::InvalidOffset { name: name.to_string() };
    let offset = usize::try_from(U256::from_be_slice(head)).map_err(|_| invalid())?;
    let length_end = offset.checked_add(WORD).ok_or_else(invalid)?;
    let length_word = data.get(offset..length_end).ok_or_else(invalid)?;
    let length = usize::try_from(U256::from_be_slice(length_word)).map_err(|_| invalid())?;
    let start = offset + WORD;
    data.get(start..start.checked_add(length).ok_or_else(invalid)?).ok_or_else(invalid)
}

/// Decodes Airnode ABI encoded parameters.
///
/// # Errors
///
/// Returns an [`AbiError`] describing the first structural problem found.
pub fn decode_parameters(data: &[u8]) -> Result<Vec<Param>, AbiError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % WORD != 0 {
        return Err(AbiError::UnalignedLength(data.len()));
    }

    let header = word(data, 0)?;
    if header[0] != ENCODING_VERSION {
        return Err(AbiError::UnsupportedVersion(header[0]));
    }
    let types: Vec<char> =
        header[1..].iter().take_while(|&&byte| byte != 0).map(|&byte| char::from(byte)).collect();

    let mut params = Vec::with_capacity(types.len());
    for (index, kind) in types.into_iter().enumerate() {
        let name_word = word(data, 1 + 2 * index)?;
        let value_word = word(data, 2 + 2 * index)?;
        let name = string32(name_word, "name")?;

        let value = match kind {
            'b' => ParamValue::Bytes32(B256::from_slice(value_word)),
            's' => ParamValue::String32(string32(value_word, &name)?),
            'a' => {
                if value_word[..12].iter().any(|&byte| byte != 0) {
                    return Err(AbiError::InvalidAddress(name));
                }
                ParamValue::Address(Address::from_slice(&value_word[12..]))
            }
            'u' => ParamValue::Uint(U256::from_be_slice(value_word)),
            'i' => ParamValue::Int(I256::from_raw(U256::from_be_slice(value_word))),
            'B' => ParamValue::Bytes(Bytes::copy_from_slice(dynamic(data, value_word, &name)?)),
            'S' => {
                let raw = dynamic(data, value_word, &name)?;
                let text =
                    std::str::from_utf8(raw).map_err(|_| AbiError::InvalidUtf8(name.clone()))?;
                ParamValue::String(text.to_string())
            }
            other => return Err(AbiError::UnknownType(other)),
        };

        params.push(Param { name, value });
    }

    Ok(params)
}
