use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::concert::ConcertEvent;
use crate::domain::mapping::SourceId;

/// Errors are scoped to one source file so that multi-file digests can skip
/// the offending file and keep rendering the rest.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source file `{source_id}` is unavailable: {detail}")]
    Unavailable { source_id: SourceId, detail: String },
    #[error("source file `{source_id}` is malformed: {detail}")]
    Malformed { source_id: SourceId, detail: String },
}

impl SourceError {
    pub fn source_id(&self) -> &SourceId {
        match self {
            Self::Unavailable { source_id, .. } | Self::Malformed { source_id, .. } => source_id,
        }
    }
}

/// A parsed source file: artist listings in name order, each with the events
/// that survived parsing. Artists with zero events are dropped here so that
/// rendering never has to special-case them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    pub artists: Vec<ArtistListing>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistListing {
    pub name: String,
    pub events: Vec<ConcertEvent>,
}

impl SourceDocument {
    pub fn event_count(&self) -> usize {
        self.artists.iter().map(|artist| artist.events.len()).sum()
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    artists: BTreeMap<String, RawArtist>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    datetime_local: Option<String>,
    datetime_utc: Option<String>,
    venue: RawVenue,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    name: String,
    city: String,
}

/// Reads and parses one source file from the data directory.
pub fn read_source(data_dir: &Path, source_id: &SourceId) -> Result<SourceDocument, SourceError> {
    let path = data_dir.join(source_id.as_str());
    let raw = fs::read_to_string(&path).map_err(|error| SourceError::Unavailable {
        source_id: source_id.clone(),
        detail: error.to_string(),
    })?;

    parse_source(source_id, &raw)
}

pub fn parse_source(source_id: &SourceId, raw: &str) -> Result<SourceDocument, SourceError> {
    let document: RawDocument = serde_json::from_str(raw).map_err(|error| {
        SourceError::Malformed { source_id: source_id.clone(), detail: error.to_string() }
    })?;

    let mut artists = Vec::with_capacity(document.artists.len());
    for (name, artist) in document.artists {
        let mut events = Vec::with_capacity(artist.events.len());
        for event in artist.events {
            events.push(convert_event(source_id, &name, event)?);
        }
        if events.is_empty() {
            continue;
        }
        artists.push(ArtistListing { name, events });
    }

    Ok(SourceDocument { artists })
}

fn convert_event(
    source_id: &SourceId,
    artist: &str,
    event: RawEvent,
) -> Result<ConcertEvent, SourceError> {
    let raw_datetime =
        event.datetime_local.or(event.datetime_utc).ok_or_else(|| SourceError::Malformed {
            source_id: source_id.clone(),
            detail: format!("event for artist `{artist}` has no datetime_local or datetime_utc"),
        })?;

    // Only the calendar-date portion of the ISO string matters for display.
    let date_part = raw_datetime.split('T').next().unwrap_or(&raw_datetime);
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|error| {
        SourceError::Malformed {
            source_id: source_id.clone(),
            detail: format!("event for artist `{artist}` has unparseable date `{date_part}`: {error}"),
        }
    })?;

    Ok(ConcertEvent { date, venue: event.venue.name, city: event.venue.city })
}

/// All artist names in one source file, sorted, regardless of whether they
/// currently have events.
pub fn artist_names(data_dir: &Path, source_id: &SourceId) -> Result<Vec<String>, SourceError> {
    let path = data_dir.join(source_id.as_str());
    let raw = fs::read_to_string(&path).map_err(|error| SourceError::Unavailable {
        source_id: source_id.clone(),
        detail: error.to_string(),
    })?;
    let document: RawDocument = serde_json::from_str(&raw).map_err(|error| {
        SourceError::Malformed { source_id: source_id.clone(), detail: error.to_string() }
    })?;

    Ok(document.artists.into_keys().collect())
}

/// Enumerates source files in the data directory that follow the naming
/// convention (file name contains `concert`), sorted by name.
pub fn available_sources(data_dir: &Path) -> io::Result<Vec<SourceId>> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.contains("concert") {
            sources.push(SourceId::normalize(name));
        }
    }

    sources.sort();
    Ok(sources)
}
