//! Broker format detection
//!
//! Scans statement text for literal marker substrings unique to each
//! registered broker. First match in registry order wins. No match is
//! not an error: the caller reports the document as unprocessed.

use tracing::{debug, info};

use super::{registry, BrokerKind, StatementExtractor};

/// Detect which broker produced the statement text
pub fn detect(text: &str) -> Option<BrokerKind> {
    detect_extractor(text).map(|extractor| extractor.kind())
}

/// Detect and return the matching extractor itself
pub(crate) fn detect_extractor(text: &str) -> Option<&'static dyn StatementExtractor> {
    for extractor in registry() {
        for marker in extractor.markers() {
            if text.contains(marker) {
                info!(
                    "Detected {} statement (marker: {:?})",
                    extractor.kind(),
                    marker
                );
                return Some(*extractor);
            }
        }
    }
    debug!("No broker marker found in statement text");
    None
}
