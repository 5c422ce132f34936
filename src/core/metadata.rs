//! FFMETADATA1 chapter file encoding.
//!
//! Layout (all offsets in milliseconds):
//!
//! ```text
//! ;FFMETADATA1
//! title=<podcast title>
//! artist=<artist>
//!
//! [METADATA]
//! timebase=1/1000
//!
//! [CHAPTER]
//! TIMEBASE=1/1000
//! START=<ms>
//! END=<ms>
//! title=<chapter title>
//!
//! ```

use std::io::Write;

use tracing::{info, warn};

use crate::domain::Chapter;

use super::error::AssemblyError;

pub const DEFAULT_PODCAST_TITLE: &str = "Daily Email Digest";
pub const DEFAULT_ARTIST: &str = "Generated Podcast Bot";

const HEADER: &str = ";FFMETADATA1";
const TIMEBASE: &str = "1/1000";

/// Replace characters that are structural in the metadata grammar
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '=' | '#' | '\\' | '/' => '-',
            ';' => ',',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Render the metadata file content.
///
/// Chapters with `end_ms <= start_ms` are dropped.
pub fn encode(chapters: &[Chapter], podcast_title: &str, artist: &str) -> String {
    let mut out = String::new();

    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!("title={}\n", sanitize(podcast_title)));
    out.push_str(&format!("artist={}\n", sanitize(artist)));
    out.push('\n');
    out.push_str("[METADATA]\n");
    out.push_str(&format!("timebase={}\n\n", TIMEBASE));

    for chapter in chapters {
        if !chapter.is_valid() {
            warn!(
                title = %chapter.title,
                start_ms = chapter.start_ms,
                end_ms = chapter.end_ms,
                "Dropping chapter with empty range"
            );
            continue;
        }

        out.push_str("[CHAPTER]\n");
        out.push_str(&format!("TIMEBASE={}\n", TIMEBASE));
        out.push_str(&format!("START={}\n", chapter.start_ms));
        out.push_str(&format!("END={}\n", chapter.end_ms));
        out.push_str(&format!("title={}\n\n", sanitize(&chapter.title)));
    }

    out
}

/// Encode and write the metadata, flushing before returning
pub fn write_metadata<W: Write>(
    mut writer: W,
    chapters: &[Chapter],
    podcast_title: &str,
    artist: &str,
) -> Result<(), AssemblyError> {
    let content = encode(chapters, podcast_title, artist);

    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(AssemblyError::MetadataEncode)?;

    info!(chapters = chapters.len(), bytes = content.len(), "Wrote chapter metadata");
    Ok(())
}
