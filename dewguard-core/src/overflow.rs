//! Overflow-Safe Byte Sink for Chunked Transports
//!
//! ## Overview
//!
//! A chunked HTTP response hands the producer a fresh buffer on every
//! callback, and the size of that buffer can change between callbacks. A
//! serializer, on the other hand, produces output in units (one history
//! entry) that rarely line up with the buffer boundary.
//!
//! [`OverflowPrint`] bridges the two. Bytes go into the caller's buffer
//! while it has room; the rest spill into an owned overflow region. On the
//! next callback, [`OverflowPrint::rebind`] moves the new buffer in and
//! backfills it from the front of the overflow before anything else is
//! written.
//!
//! ```text
//! write "ABCDEFGHIJ" into a 4-byte buffer:
//!   main:     [A B C D]          written = 4
//!   overflow: [E F G H I J]
//!
//! rebind to a 3-byte buffer:
//!   main:     [E F G]            written = 3 (backfill)
//!   overflow: [H I J]
//!
//! rebind to a 10-byte buffer:
//!   main:     [H I J . . . . . . .]   written = 3 (backfill)
//!   overflow: []
//! ```
//!
//! ## Accounting
//!
//! [`write`](OverflowPrint::write) returns 1 only for bytes that landed in the
//! active buffer. Bytes sent to overflow return 0: they haven't been handed to
//! the transport yet. Summed over a callback, the accepted count plus the
//! backfill equals [`written`](OverflowPrint::written), which is exactly what
//! the callback must report back to the transport.
//!
//! ## Lifetimes
//!
//! The sink borrows the caller's buffer, so it can't outlive a callback. A
//! session keeps it parked between callbacks with [`OverflowPrint::unbound`]
//! (an empty main buffer with the same overflow) and rebinds it when the
//! next buffer arrives.

use alloc::vec::Vec;
use core::fmt;

use crate::constants::buffers::OVERFLOW_INITIAL_CAPACITY;

/// Byte sink over a borrowed buffer with an owned overflow region
pub struct OverflowPrint<'a> {
    /// Active transport buffer
    main: &'a mut [u8],
    /// Bytes of `main` filled so far
    written: usize,
    /// Bytes produced but not yet handed to any buffer, in order
    overflow: Vec<u8>,
}

impl<'a> OverflowPrint<'a> {
    /// Bind a fresh sink to `main` with an empty overflow region
    pub fn new(main: &'a mut [u8]) -> Self {
        log_trace!("[OVERFLOW] Loaded new overflow object, mainBufferSize={}", main.len());
        Self {
            main,
            written: 0,
            overflow: Vec::with_capacity(OVERFLOW_INITIAL_CAPACITY),
        }
    }

    /// Write one byte. Returns 1 if it landed in the main buffer, 0 if it
    /// was buffered in overflow.
    pub fn write(&mut self, byte: u8) -> usize {
        if let Some(slot) = self.main.get_mut(self.written) {
            *slot = byte;
            self.written += 1;
            1
        } else {
            self.overflow.push(byte);
            0
        }
    }

    /// Write a byte slice. Returns how many bytes landed in the main buffer.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let room = self.main.len() - self.written;
        let direct = room.min(bytes.len());
        self.main[self.written..self.written + direct].copy_from_slice(&bytes[..direct]);
        self.written += direct;
        self.overflow.extend_from_slice(&bytes[direct..]);
        direct
    }

    /// Move to a new main buffer, backfilling it from overflow.
    ///
    /// Copies `min(new_main.len(), pending)` bytes from the front of the
    /// overflow region into `new_main`, drops them from overflow and returns
    /// the new sink together with the backfilled count. Remaining overflow
    /// keeps its order and is served by later rebinds.
    pub fn rebind<'b>(self, new_main: &'b mut [u8]) -> (OverflowPrint<'b>, usize) {
        let Self { mut overflow, .. } = self;
        log_trace!(
            "[OVERFLOW] Swapping buffer, mainBufferSize={}, overflowBufferWritten={}",
            new_main.len(),
            overflow.len()
        );

        let backfill = new_main.len().min(overflow.len());
        new_main[..backfill].copy_from_slice(&overflow[..backfill]);
        overflow.drain(..backfill);

        log_trace!(
            "[OVERFLOW] Swapping buffer, backfill={}, overflowBufferWritten={}",
            backfill,
            overflow.len()
        );
        let print = OverflowPrint {
            main: new_main,
            written: backfill,
            overflow,
        };
        (print, backfill)
    }

    /// Detach from the main buffer, keeping pending overflow.
    pub fn unbound(self) -> OverflowPrint<'static> {
        OverflowPrint {
            main: Default::default(),
            written: 0,
            overflow: self.overflow,
        }
    }

    /// Bytes filled in the current main buffer (backfill included)
    pub fn written(&self) -> usize {
        self.written
    }

    /// Capacity of the current main buffer
    pub fn capacity(&self) -> usize {
        self.main.len()
    }

    /// Whether the current main buffer is full
    pub fn is_full(&self) -> bool {
        self.written >= self.main.len()
    }

    /// Bytes waiting in overflow
    pub fn pending(&self) -> usize {
        self.overflow.len()
    }

    /// Whether any bytes are waiting in overflow
    pub fn has_pending(&self) -> bool {
        !self.overflow.is_empty()
    }
}

impl OverflowPrint<'static> {
    /// A sink with no main buffer; every write goes to overflow.
    pub fn detached() -> Self {
        Self {
            main: Default::default(),
            written: 0,
            overflow: Vec::new(),
        }
    }
}

impl fmt::Write for OverflowPrint<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}
