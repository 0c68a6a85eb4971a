//! Distribution of terminal input to consumers that ask for it.
//!
//! Two accumulation strategies share one input stream: pending requests
//! (FIFO, one payload each) and, when buffering is enabled, a text buffer
//! for input nobody was waiting for. At most one of them is non-empty at
//! any time. With buffering disabled, input that arrives while nobody is
//! waiting is dropped.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::trace;

/// Resolves with the next chunk of terminal input.
///
/// Never fails. If the queue that issued it goes away first, it simply
/// never resolves.
#[must_use = "input is only delivered to requests that are awaited"]
pub struct PendingInput {
    rx: oneshot::Receiver<String>,
}

impl PendingInput {
    fn ready(data: String) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive right here, so this cannot fail.
        let _ = tx.send(data);
        Self { rx }
    }
}

impl Future for PendingInput {
    type Output = String;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<String> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(data)) => Poll::Ready(data),
            // Sender dropped without an answer: stay pending for good.
            Poll::Ready(Err(_)) | Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputCaptureQueue {
    pending: VecDeque<oneshot::Sender<String>>,
    buffer: String,
    buffering: bool,
}

impl InputCaptureQueue {
    pub fn new(buffering: bool) -> Self {
        Self {
            pending: VecDeque::new(),
            buffer: String::new(),
            buffering,
        }
    }

    /// Ask for the next chunk of input. Buffered text, if any, is handed
    /// over immediately and the buffer is emptied.
    pub fn request_next(&mut self) -> PendingInput {
        if !self.buffer.is_empty() {
            let data = std::mem::take(&mut self.buffer);
            trace!("Delivering {} buffered bytes immediately", data.len());
            return PendingInput::ready(data);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.push_back(tx);
        PendingInput { rx }
    }

    /// Route one input event to the oldest live request, the buffer, or nowhere.
    pub fn on_input_arrived(&mut self, data: &str) {
        let mut data = data.to_string();
        while let Some(tx) = self.pending.pop_front() {
            match tx.send(data) {
                Ok(()) => return,
                // Consumer stopped waiting; offer the data to the next one.
                Err(returned) => data = returned,
            }
        }

        if self.buffering {
            self.buffer.push_str(&data);
        } else {
            trace!("Dropping {} bytes of unrequested input", data.len());
        }
    }

    /// Toggle accumulation of unrequested input. Text already buffered is
    /// kept for the next request.
    pub fn set_buffering_enabled(&mut self, enabled: bool) {
        self.buffering = enabled;
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn assert_exclusive(queue: &InputCaptureQueue) {
        assert!(queue.buffered().is_empty() || queue.pending_requests() == 0);
    }

    #[test]
    fn test_buffer_accumulates_in_order() {
        let mut queue = InputCaptureQueue::new(true);
        for chunk in ["a", "bc", "", "d\r"] {
            queue.on_input_arrived(chunk);
            assert_exclusive(&queue);
        }
        assert_eq!(queue.buffered(), "abcd\r");
    }

    #[test]
    fn test_unbuffered_input_is_dropped() {
        let mut queue = InputCaptureQueue::new(false);
        queue.on_input_arrived("lost");
        assert_eq!(queue.buffered(), "");

        let pending = queue.request_next();
        queue.on_input_arrived("kept");
        assert_eq!(pending.now_or_never().as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_requests_are_fifo() {
        let mut queue = InputCaptureQueue::new(false);
        let first = queue.request_next();
        let second = queue.request_next();
        assert_eq!(queue.pending_requests(), 2);

        queue.on_input_arrived("one");
        assert_eq!(queue.pending_requests(), 1);
        queue.on_input_arrived("two");
        assert_exclusive(&queue);

        assert_eq!(first.await, "one");
        assert_eq!(second.await, "two");
    }

    #[test]
    fn test_request_drains_buffer_immediately() {
        let mut queue = InputCaptureQueue::new(true);
        queue.on_input_arrived("ab");
        queue.on_input_arrived("c");

        let pending = queue.request_next();
        assert_eq!(pending.now_or_never().as_deref(), Some("abc"));
        assert_eq!(queue.buffered(), "");
        assert_eq!(queue.pending_requests(), 0);
    }

    #[test]
    fn test_pending_request_wins_over_buffer() {
        let mut queue = InputCaptureQueue::new(true);
        let pending = queue.request_next();
        queue.on_input_arrived("x");

        assert_eq!(queue.buffered(), "");
        assert_eq!(pending.now_or_never().as_deref(), Some("x"));
    }

    #[test]
    fn test_abandoned_request_is_skipped() {
        let mut queue = InputCaptureQueue::new(false);
        let abandoned = queue.request_next();
        let live = queue.request_next();
        drop(abandoned);

        queue.on_input_arrived("hello");
        assert_eq!(queue.pending_requests(), 0);
        assert_eq!(live.now_or_never().as_deref(), Some("hello"));
    }

    #[test]
    fn test_disabling_keeps_buffered_text() {
        let mut queue = InputCaptureQueue::new(true);
        queue.on_input_arrived("early");
        queue.set_buffering_enabled(false);
        queue.on_input_arrived("late");

        assert!(!queue.is_buffering());
        assert_eq!(queue.request_next().now_or_never().as_deref(), Some("early"));
    }

    #[test]
    fn test_orphaned_request_never_resolves() {
        let mut queue = InputCaptureQueue::new(false);
        let pending = queue.request_next();
        drop(queue);
        assert_eq!(pending.now_or_never(), None);
    }
}
