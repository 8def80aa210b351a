//!
//! src/tags.rs  Oct 18th, 2026
//!
//! Pulls title/artist/album out of an in-memory MP3 preview
//!

use std::io::Cursor;

use lofty::config::{ParseOptions, ParsingMode};
use lofty::file::{FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;

use crate::errors::ScoutError;
use crate::types::TrackMetadata;

/// Previews are always MPEG audio, so the type is fixed rather than guessed.
/// Properties are read so a body without a valid MPEG frame is rejected.
pub fn read_preview_tags(bytes: &[u8]) -> Result<TrackMetadata, ScoutError> {
    if bytes.is_empty() {
        return Err(ScoutError::Decode("empty preview body".to_string()));
    }

    let options = ParseOptions::new()
        .read_properties(true)
        .parsing_mode(ParsingMode::BestAttempt);

    let tagged = Probe::new(Cursor::new(bytes))
        .set_file_type(FileType::Mpeg)
        .options(options)
        .read()?;

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Ok(TrackMetadata::default());
    };

    Ok(TrackMetadata {
        title: tag.title().map(|s| s.into_owned()).unwrap_or_default(),
        artist: tag.artist().map(|s| s.into_owned()).unwrap_or_default(),
        album: tag.album().map(|s| s.into_owned()).unwrap_or_default(),
    })
}
