//! Bundle wire codec.
//!
//! A bundle is a JSON object mapping item keys to base64 image payloads,
//! either as plain text or gzip-compressed. The variant is chosen by
//! configuration, never sniffed from the bytes.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use thiserror::Error;

use crate::bundle::BundleFormat;

/// Decoded bundle: item key -> base64 payload (or a full data URI).
pub type BundleContents = BTreeMap<String, String>;

/// Errors raised while decoding or encoding a bundle.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("decompressed bundle is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("top-level value is not an object")]
    NotAnObject,

    #[error("payload for '{0}' is not a string")]
    NonStringPayload(String),

    #[error("gzip compression failed: {0}")]
    Compress(#[source] std::io::Error),
}

/// Recover the key -> payload pairs of a bundle.
pub fn decode(bytes: &[u8], format: BundleFormat) -> Result<BundleContents, CodecError> {
    let text = match format {
        BundleFormat::Gzip => {
            let mut raw = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut raw)
                .map_err(CodecError::Decompress)?;
            String::from_utf8(raw)?
        }
        BundleFormat::Json => String::from_utf8(bytes.to_vec())?,
    };
    parse_contents(&text)
}

fn parse_contents(text: &str) -> Result<BundleContents, CodecError> {
    let object = match serde_json::from_str::<Value>(text)? {
        Value::Object(object) => object,
        _ => return Err(CodecError::NotAnObject),
    };

    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(payload) => Ok((key, payload)),
            _ => Err(CodecError::NonStringPayload(key)),
        })
        .collect()
}

/// Serialize bundle contents the way the packer writes them.
pub fn encode(contents: &BundleContents, format: BundleFormat) -> Result<Vec<u8>, CodecError> {
    let json = serde_json::to_vec(contents)?;
    match format {
        BundleFormat::Json => Ok(json),
        BundleFormat::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json).map_err(CodecError::Compress)?;
            encoder.finish().map_err(CodecError::Compress)
        }
    }
}
