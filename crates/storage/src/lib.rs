#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use std::{fmt::Write, io};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use liftbook_domain::StorageError;

pub mod device;
pub mod file;
pub mod key_value;
pub mod memory;
pub mod rest;
pub mod setup;

pub use device::Device;
pub use file::FileStore;
pub use key_value::KeyValueStore;
pub use memory::{MemoryAuth, MemoryCloud, MemoryStore};
pub use rest::{Method, Request, RestCloud, ReqwestSendRequest, Response, SendRequest};
pub use setup::{DeviceSession, Liftbook, open};

/// Modification time set by cloud stores. Never part of the data seen by the session.
const UPDATED_AT: &str = "updatedAt";

/// Makes a key usable as a file name or URL path segment. Bytes other than ASCII alphanumerics,
/// `-` and `_` are percent-encoded.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "%{byte:02X}");
        }
    }
    escaped
}

fn io_error(err: io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::StorageFull => StorageError::QuotaExceeded,
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied,
        _ => StorageError::Other(Box::new(err)),
    }
}

fn stamp(document: &Value, time: DateTime<Utc>) -> Value {
    let mut document = document.clone();
    if let Some(object) = document.as_object_mut() {
        object.insert(UPDATED_AT.to_string(), json!(time.to_rfc3339()));
    }
    document
}

fn strip(mut document: Value) -> Value {
    if let Some(object) = document.as_object_mut() {
        object.remove(UPDATED_AT);
    }
    document
}

fn updated_at(document: &Value) -> Option<&str> {
    document.get(UPDATED_AT).and_then(Value::as_str)
}
