use std::path::Path;

use crate::domain::mapping::{SourceId, UserId};
use crate::sources::{self, ArtistListing, SourceDocument, SourceError};

/// Upper bound on one outbound message chunk, in characters.
pub const MAX_CHUNK_LEN: usize = 1000;

/// Accumulates whole blocks into bounded chunks. A block is appended intact;
/// when appending would push the buffer past the limit, the buffer is flushed
/// first. A block longer than the limit on its own still becomes one chunk;
/// blocks are never split.
#[derive(Debug)]
pub struct ChunkBuffer {
    limit: usize,
    buffer: String,
    chunks: Vec<String>,
}

impl ChunkBuffer {
    pub fn new(limit: usize) -> Self {
        Self { limit, buffer: String::new(), chunks: Vec::new() }
    }

    pub fn push_block(&mut self, block: &str) {
        if !self.buffer.is_empty() && self.buffer.len() + block.len() > self.limit {
            self.flush();
        }
        self.buffer.push_str(block);
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.chunks.push(std::mem::take(&mut self.buffer));
        }
    }

    pub fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// A rendered digest for one user: ordered message chunks plus the per-file
/// errors encountered along the way. A bad file lands in `skipped` and the
/// remaining files still render.
#[derive(Debug, Default)]
pub struct UserDigest {
    pub chunks: Vec<String>,
    pub skipped: Vec<SourceError>,
}

impl UserDigest {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn artist_block(artist: &ArtistListing) -> Option<String> {
    if artist.events.is_empty() {
        return None;
    }

    let mut block = format!("**{}**: \n", artist.name);
    for event in &artist.events {
        block.push_str(&event.digest_line());
    }
    Some(block)
}

/// Renders one parsed document into bounded chunks, one header line plus one
/// line per event for every artist that has events.
pub fn render_document(document: &SourceDocument, limit: usize) -> Vec<String> {
    let mut buffer = ChunkBuffer::new(limit);
    for artist in &document.artists {
        if let Some(block) = artist_block(artist) {
            buffer.push_block(&block);
        }
    }
    buffer.finish()
}

fn source_heading(user: &UserId, source: &SourceId) -> String {
    format!("## Upcoming concerts for user @{user} from file {source}:\n")
}

/// Renders the digest for one user across all of their subscribed sources.
///
/// Each source contributes its own heading followed by its artist blocks; a
/// source with no events contributes nothing at all. Unreadable or malformed
/// sources are collected in `skipped` and the rest proceed.
pub fn render_for_user(
    data_dir: &Path,
    user: &UserId,
    source_ids: &[SourceId],
    limit: usize,
) -> UserDigest {
    let mut digest = UserDigest::default();

    for source_id in source_ids {
        let document = match sources::read_source(data_dir, source_id) {
            Ok(document) => document,
            Err(error) => {
                digest.skipped.push(error);
                continue;
            }
        };
        if document.event_count() == 0 {
            continue;
        }

        let mut buffer = ChunkBuffer::new(limit);
        buffer.push_block(&source_heading(user, source_id));
        for artist in &document.artists {
            if let Some(block) = artist_block(artist) {
                buffer.push_block(&block);
            }
        }
        digest.chunks.extend(buffer.finish());
    }

    digest
}
