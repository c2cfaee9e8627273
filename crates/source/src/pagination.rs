//! Cursor-based pagination over a [`LogReader`].
//!
//! Pages are requested strictly one after another because each request
//! starts from the last id of the previous page. A page shorter than
//! requested (including an empty one) is the only exhaustion signal.

use std::sync::Arc;

use logrelay_core::{LogEntry, LogId, SourceError};

use crate::reader::LogReader;

/// Maximum number of entries requested per page.
pub const PAGE_SIZE: usize = 100;

pub struct LogSource {
    reader: Arc<dyn LogReader>,
    page_size: usize,
}

impl LogSource {
    pub fn new(reader: Arc<dyn LogReader>) -> Self {
        Self {
            reader,
            page_size: PAGE_SIZE,
        }
    }

    /// Fetches up to `max_total` entries after `cursor`.
    ///
    /// May return fewer entries when the source is not caught up yet. Any
    /// page failure discards everything accumulated by this call; the local
    /// cursor is never exposed, so callers cannot adopt a partial advance.
    pub async fn fetch(
        &self,
        cursor: Option<&LogId>,
        max_total: usize,
    ) -> Result<Vec<LogEntry>, SourceError> {
        let mut accumulated = Vec::new();
        let mut cursor = cursor.cloned();
        let mut remaining = max_total;

        while remaining > 0 {
            let take = remaining.min(self.page_size);
            tracing::debug!(
                from = cursor.as_ref().map_or("start", LogId::as_str),
                take,
                "Requesting log page"
            );

            let mut page = self.reader.read_page(cursor.as_ref(), take).await?;
            if page.len() > take {
                tracing::warn!(
                    received = page.len(),
                    take,
                    "Log page larger than requested, dropping the excess"
                );
                page.truncate(take);
            }
            let received = page.len();

            if let Some(last) = page.last() {
                cursor = Some(last.id().clone());
            }
            accumulated.extend(page);

            if received < take {
                break;
            }
            remaining = remaining.saturating_sub(received);
        }

        tracing::info!(
            count = accumulated.len(),
            cursor = cursor.as_ref().map_or("start", LogId::as_str),
            "Logs fetched"
        );

        Ok(accumulated)
    }
}
