//!
//! src/errors.rs  Oct 18th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the scout uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for ScoutError {
    fn from(e: reqwest::Error) -> Self { ScoutError::Http(e.to_string()) }
}

impl From<lofty::error::LoftyError> for ScoutError {
    fn from(e: lofty::error::LoftyError) -> Self { ScoutError::Decode(e.to_string()) }
}
