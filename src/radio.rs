//! Internet radio: fetch a fixed initial segment of a station stream.
//!
//! This is not live streaming. A bounded prefix of the stream is downloaded
//! into a temporary artifact and played like any other clip.

mod ingest;

pub use ingest::{RadioIngest, suffix_for_content_type};

use crate::config::StationSettings;

/// Station at `index` in the configured address book.
pub fn station(stations: &[StationSettings], index: usize) -> Option<&StationSettings> {
    stations.get(index)
}
