//! # Audio Module
//!
//! Queueing and playback for the guild's shared audio channel.
//!
//! ## Architecture
//!
//! ### [`classifier`] - Request Classification
//! - Validates submitted URLs and tells streamed links from direct files
//! - Resolves titles and start offsets, expands playlists
//!
//! ### [`store`] - Queue Store
//! - Durable FIFO queue plus the current-request slot
//! - Transactional updates, persisted through [`crate::storage`]
//!
//! ### [`coordinator`] - Playback Coordinator
//! - Single drain task: promote, connect, play, wait, complete
//! - Duration caps, forced stops and voice connection reuse
//!
//! ### [`votes`] - Skip Votes
//! - Per-request voter sets and the occupancy based quorum
//!
//! ### [`player`] - Songbird Transport
//! - Voice connection, input creation and track events on top of songbird
//!
//! [`jukebox::Jukebox`] ties these together for the command layer.

pub mod classifier;
pub mod coordinator;
pub mod jukebox;
pub mod player;
pub mod request;
pub mod store;
pub mod transport;
pub mod votes;

#[cfg(test)]
pub(crate) mod testing;
