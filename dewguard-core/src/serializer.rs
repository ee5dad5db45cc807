//! Resumable history export
//!
//! The HTTP layer streams the history as a chunked response, calling
//! [`HistoryStream::pull`] with a buffer of whatever size the transport has
//! free until it returns 0. The full document is never built in memory: at
//! most one serialized entry is held in the [`OverflowPrint`] spill region.
//!
//! ```text
//! {"now":T,"entries":[<entry>,<entry>,...,<entry>]}
//! ```
//!
//! The first call locks the history so the cursor stays valid; emitting the
//! footer unlocks it. A session dropped half-way must be closed with
//! [`HistoryStream::abort`].

use core::fmt::Write as _;

use crate::history::History;
use crate::overflow::OverflowPrint;

/// One export session
pub struct HistoryStream {
    now: u64,
    cursor: usize,
    started: bool,
    footer_emitted: bool,
    print: OverflowPrint<'static>,
}

impl HistoryStream {
    /// Session stamping the document with `now` (unix seconds)
    pub fn new(now: u64) -> Self {
        Self {
            now,
            cursor: 0,
            started: false,
            footer_emitted: false,
            print: OverflowPrint::detached(),
        }
    }

    /// Fill `buffer` with the next part of the document.
    ///
    /// `index` is the transport's running byte offset; 0 starts the session
    /// over. Returns the number of bytes written, 0 once everything has been
    /// handed out. An empty `buffer` returns 0 and changes nothing.
    pub fn pull<const N: usize>(&mut self, history: &mut History<N>, buffer: &mut [u8], index: usize) -> usize {
        if buffer.is_empty() {
            return 0;
        }

        let parked = core::mem::replace(&mut self.print, OverflowPrint::detached());
        let mut print = if index == 0 || !self.started {
            self.start(history, buffer)
        } else {
            let (print, backfilled) = parked.rebind(buffer);
            log_trace!("[History] resumed export, backfilled {} bytes", backfilled);
            print
        };

        while !self.footer_emitted && !print.has_pending() && !print.is_full() {
            self.write_next(history, &mut print);
        }

        let written = print.written();
        self.print = print.unbound();
        written
    }

    /// Open the document in `buffer` and lock `history`
    fn start<'b, const N: usize>(&mut self, history: &mut History<N>, buffer: &'b mut [u8]) -> OverflowPrint<'b> {
        let mut print = OverflowPrint::new(buffer);
        self.cursor = 0;
        self.started = true;
        self.footer_emitted = false;

        if history.is_empty() {
            // OverflowPrint never reports a formatting error
            let _ = write!(print, "{{\"now\":{},\"entries\":[]}}", self.now);
            self.footer_emitted = true;
            log_info!("[History] exported empty history");
        } else {
            history.lock();
            let _ = write!(print, "{{\"now\":{},\"entries\":[", self.now);
            log_info!("[History] exporting {} entries", history.len());
        }
        print
    }

    fn write_next<const N: usize>(&mut self, history: &mut History<N>, print: &mut OverflowPrint<'_>) {
        if let Some(entry) = history.get(self.cursor) {
            match serde_json::to_vec(entry) {
                Ok(bytes) => {
                    print.write_bytes(&bytes);
                }
                Err(_err) => {
                    log_error!("[History] failed to serialize entry {}: {}", self.cursor, _err);
                    print.write_bytes(b"null");
                }
            }
            self.cursor += 1;
        }

        if self.cursor < history.len() {
            print.write(b',');
        } else {
            print.write_bytes(b"]}");
            self.footer_emitted = true;
            history.unlock();
            log_info!("[History] export complete, {} entries", self.cursor);
        }
    }

    /// Close the session early, unlocking `history`
    pub fn abort<const N: usize>(self, history: &mut History<N>) {
        if self.started && !self.footer_emitted {
            log_warn!("[History] export aborted after {} entries", self.cursor);
            history.unlock();
        }
    }

    /// Whether the footer has been emitted and every byte handed out
    pub fn is_complete(&self) -> bool {
        self.footer_emitted && !self.print.has_pending()
    }

    /// Entries serialized so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Timestamp in the document header
    pub fn now(&self) -> u64 {
        self.now
    }
}
