pub mod config;
pub mod digest;
pub mod domain;
pub mod games;
pub mod sources;

pub use digest::{ChunkBuffer, UserDigest, MAX_CHUNK_LEN};
pub use domain::concert::{format_event_date, ConcertEvent};
pub use domain::mapping::{LinkOutcome, SourceId, UserId, UserSourceMap};
pub use games::{Game, GameCatalog, GamesError};
pub use sources::{ArtistListing, SourceDocument, SourceError};
