//! Byte ceiling enforcement for streams in transit.

use crate::error::StorageError;
use bytes::Bytes;
use futures::Stream;
use futures::stream::FusedStream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Running byte count checked against a fixed ceiling, one chunk at a time.
///
/// Once a chunk pushes the total past the limit the guard is tripped for good and
/// every further [`SizeGuard::admit`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    running_total: u64,
    limit: u64,
    tripped: bool,
}

impl SizeGuard {
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { running_total: 0, limit, tripped: false }
    }

    /// Accounts for a chunk of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileTooLarge`] if the chunk exceeds the remaining budget
    /// or the guard has already tripped.
    pub fn admit(&mut self, len: usize) -> Result<(), StorageError> {
        if !self.tripped {
            let len = u64::try_from(len).unwrap_or(u64::MAX);
            self.running_total = self.running_total.saturating_add(len);
            self.tripped = self.running_total > self.limit;
        }

        if self.tripped {
            Err(StorageError::FileTooLarge { limit: self.limit, context: None })
        } else {
            Ok(())
        }
    }

    /// Bytes seen so far, including the chunk that tripped the guard.
    #[must_use]
    pub const fn running_total(&self) -> u64 {
        self.running_total
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub const fn is_tripped(&self) -> bool {
        self.tripped
    }
}

/// Pass-through stream that forwards chunks while they fit under a [`SizeGuard`].
///
/// The chunk crossing the ceiling is never forwarded. Instead the stream yields a single
/// [`StorageError::FileTooLarge`] and terminates. A source error is yielded once as
/// [`StorageError::Io`] and terminates the stream as well. Cleanup of whatever consumes
/// the stream is left to the consumer.
#[derive(Debug)]
pub struct SizeGuarded<S> {
    inner: S,
    guard: SizeGuard,
    finished: bool,
}

impl<S> SizeGuarded<S> {
    #[must_use]
    pub const fn new(inner: S, limit: u64) -> Self {
        Self { inner, guard: SizeGuard::new(limit), finished: false }
    }

    #[must_use]
    pub const fn guard(&self) -> &SizeGuard {
        &self.guard
    }
}

impl<S, E> Stream for SizeGuarded<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<io::Error>,
{
    type Item = Result<Bytes, StorageError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        let item = match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            None => None,
            Some(Ok(chunk)) => Some(this.guard.admit(chunk.len()).map(|()| chunk)),
            Some(Err(err)) => Some(Err(StorageError::Io {
                source: err.into(),
                context: Some("Source stream failed".into()),
            })),
        };

        this.finished = !matches!(item, Some(Ok(_)));
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished { (0, Some(0)) } else { (0, self.inner.size_hint().1) }
    }
}

impl<S, E> FusedStream for SizeGuarded<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<io::Error>,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}
