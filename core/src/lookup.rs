//! Medical record number lookup
//!
//! The archive's patient ID is often a planning-system placeholder. A small
//! TCP service maps the DICOM-formatted patient name to the hospital MRN:
//! the client sends the name, the server answers with either `NOT FOUND` or
//! the matching MRNs separated by newlines, then closes.

use crate::error::{Result, TomoError};
use log::debug;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// Default lookup host
pub const DEFAULT_HOST: &str = "localhost";

/// Default lookup port
pub const DEFAULT_PORT: u16 = 6006;

/// Largest reply the client reads
pub const REPLY_LIMIT: usize = 1024;

const NOT_FOUND: &str = "NOT FOUND";

/// Resolves a patient name to a medical record number
pub trait IdentifierLookup {
    fn lookup(&self, host: &str, port: u16, name: &str) -> Result<String>;
}

/// Lookup over a plain TCP request/reply exchange
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpLookup;

impl TcpLookup {
    fn connect(host: &str, port: u16) -> Result<TcpStream> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| TomoError::Lookup(format!("Cannot resolve host {}: {}", host, e)))?;
        let mut last_error = None;
        for addr in addrs {
            debug!("Attempting to connect to {}", addr);
            match TcpStream::connect(addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(TomoError::Lookup(match last_error {
            Some(e) => format!("Connection to MRN server failed: {}", e),
            None => format!("No addresses found for {}", host),
        }))
    }
}

impl IdentifierLookup for TcpLookup {
    fn lookup(&self, host: &str, port: u16, name: &str) -> Result<String> {
        let mut stream = Self::connect(host, port)?;
        stream
            .write_all(name.as_bytes())
            .map_err(|e| TomoError::Lookup(format!("Failed sending data to MRN server: {}", e)))?;

        let mut reply = Vec::with_capacity(REPLY_LIMIT);
        stream
            .take(REPLY_LIMIT as u64)
            .read_to_end(&mut reply)
            .map_err(|e| TomoError::Lookup(format!("Failed receiving data from MRN server: {}", e)))?;
        parse_reply(&String::from_utf8_lossy(&reply))
    }
}

/// Interprets a lookup reply
///
/// # Errors
///
/// Returns [`TomoError::Lookup`] for `NOT FOUND`, an empty reply, or more
/// than one candidate.
pub fn parse_reply(reply: &str) -> Result<String> {
    let reply = reply.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
    if reply == NOT_FOUND {
        return Err(TomoError::Lookup("Patient name not found in MRN database".to_string()));
    }
    let candidates: Vec<&str> = reply.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    match candidates.as_slice() {
        [] => Err(TomoError::Lookup("Empty reply from MRN server".to_string())),
        [mrn] => Ok(mrn.to_string()),
        many => Err(TomoError::Lookup(format!(
            "Ambiguous patient name; {} MRNs returned: {}",
            many.len(),
            many.join(", ")
        ))),
    }
}
