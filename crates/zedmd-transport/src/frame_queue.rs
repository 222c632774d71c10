use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
    time::Duration,
};

use zedmd_protocol::{Frame, StreamId, command::FRAME_QUEUE_SIZE_MAX};

struct Inner {
    ready: VecDeque<Frame>,
    delayed: VecDeque<Frame>,
    frame_counter: u8,
    last_stream_id: StreamId,
    delayed_ready: bool,
}

/// The bounded send queue shared between a caller thread (producer, via
/// [`FrameQueue::push`]) and a transport's background worker (consumer, via
/// [`FrameQueue::pop`]).
///
/// One lock guards the ready queue, the delayed-generation staging queue,
/// and the bookkeeping fields together (`frame_counter`, `last_stream_id`,
/// `delayed_ready`). The upstream implementation instead splits these across
/// two separate mutexes (`m_frameQueueMutex`, `m_delayedFrameMutex`); that
/// split exists there only because the queue and the delayed-staging area
/// were bolted on at different times, not because anything requires
/// independent locking — every place that reads one also reads the other
/// under a nested lock. A single mutex removes that nesting without
/// changing any observable ordering.
pub struct FrameQueue {
    inner: Mutex<Inner>,
    non_empty: Condvar,
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ready: VecDeque::new(),
                delayed: VecDeque::new(),
                frame_counter: 0,
                last_stream_id: StreamId::NONE,
                delayed_ready: false,
            }),
            non_empty: Condvar::new(),
        }
    }

    fn fill_delayed(inner: &Inner) -> bool {
        inner.frame_counter > FRAME_QUEUE_SIZE_MAX as u8 || inner.delayed_ready
    }

    /// Enqueues a single, non-streamed frame (a plain command or a
    /// whole-image render). If the queue is already backed up, the frame is
    /// staged as a pending "delayed generation" instead of being queued
    /// immediately — only the most recent such frame survives.
    pub fn push(&self, frame: Frame) {
        let mut inner = self.inner.lock().unwrap();

        if frame.stream_id.is_none() && Self::fill_delayed(&inner) {
            inner.delayed.clear();
            inner.delayed.push_back(frame);
            inner.delayed_ready = true;
            inner.last_stream_id = StreamId::NONE;
        } else {
            if frame.stream_id.is_none() || inner.last_stream_id != frame.stream_id {
                inner.frame_counter += 1;
                inner.last_stream_id = frame.stream_id;
            }
            inner.ready.push_back(frame);
        }

        drop(inner);
        self.non_empty.notify_one();
    }

    /// Starts staging a new zone-streamed delayed generation: discards
    /// whatever a previous delayed generation left behind and clears the
    /// ready flag, so [`Self::push_delayed_streamed`] only ever appends
    /// zones belonging to the generation that's being built right now.
    /// Callers must invoke this exactly once before the first
    /// [`Self::push_delayed_streamed`] call for a generation — mirrors the
    /// upstream `QueueCommand`, which clears `m_delayedFrames` and
    /// `m_delayedFrameReady` before staging a fresh delayed frame.
    pub fn begin_delayed_streamed(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.delayed.clear();
        inner.delayed_ready = false;
    }

    /// Enqueues a zone-streamed frame belonging to a delayed generation:
    /// every zone-chunk of that generation is staged together and swapped
    /// into the ready queue atomically once the generation completes (see
    /// [`Self::mark_delayed_ready`]).
    pub fn push_delayed_streamed(&self, frame: Frame) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_stream_id = frame.stream_id;
        inner.delayed.push_back(frame);
    }

    /// Finalizes a delayed zone-streaming generation staged via
    /// [`Self::push_delayed_streamed`], making it visible to the worker on
    /// its next idle poll.
    pub fn mark_delayed_ready(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.delayed_ready = true;
    }

    /// Pops the next frame for the worker to send, blocking up to
    /// `timeout`. Applies the overflow policy (drop the whole ready queue
    /// when a delayed generation is waiting and the queue has backed up
    /// past the threshold) and the delayed-generation swap-in (when the
    /// ready queue empties out and a delayed generation is ready) before
    /// returning.
    pub fn pop(&self, timeout: Duration) -> Option<Frame> {
        let mut inner = self.inner.lock().unwrap();

        loop {
            if inner.ready.is_empty() {
                if inner.delayed_ready {
                    // A delayed generation is staged as one self-contained
                    // unit (the zone hash table was cleared before it was
                    // built); a stream id wrapping back to a value already
                    // in play here would silently merge two generations.
                    let mut generation = None;
                    while let Some(frame) = inner.delayed.pop_front() {
                        if let Some(expected) = generation {
                            zedmd_util::safe_assert_eq!(
                                frame.stream_id,
                                expected,
                                "delayed generation mixed two stream ids after wraparound",
                            );
                        } else {
                            generation = Some(frame.stream_id);
                        }
                        inner.last_stream_id = frame.stream_id;
                        inner.ready.push_back(frame);
                    }
                    inner.delayed_ready = false;
                    inner.frame_counter = 1;
                    continue;
                }

                let (guard, timed_out) =
                    self.non_empty.wait_timeout(inner, timeout).unwrap();
                inner = guard;
                if timed_out.timed_out() && inner.ready.is_empty() {
                    return None;
                }
                continue;
            }

            if inner.delayed_ready && inner.frame_counter > FRAME_QUEUE_SIZE_MAX as u8 {
                inner.ready.clear();
                inner.frame_counter = 0;
                continue;
            }

            let frame = inner.ready.pop_front().unwrap();
            if frame.stream_id.is_none() {
                inner.frame_counter = inner.frame_counter.saturating_sub(1);
            } else if frame.stream_id != inner.last_stream_id {
                // a new generation started inside the ready queue itself
                inner.last_stream_id = frame.stream_id;
            }

            return Some(frame);
        }
    }

    #[must_use]
    pub fn queued_frames_count(&self) -> u8 {
        self.inner.lock().unwrap().frame_counter
    }

    /// Spec §4.7.4's `fill_delayed()`: true when the ready queue has backed
    /// up past the threshold or a delayed generation is already pending.
    /// Callers preparing a zone-streaming generation check this *before*
    /// diffing, so they know to stage into the delayed area (and clear
    /// their zone hash table first) rather than diff against stale state.
    #[must_use]
    pub fn should_delay_next_generation(&self) -> bool {
        Self::fill_delayed(&self.inner.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zedmd_protocol::Command;

    #[test]
    fn fifo_order_for_plain_frames() {
        let q = FrameQueue::new();
        q.push(Frame::command_only(Command::ClearScreen));
        q.push(Frame::command_only(Command::Reset));
        assert_eq!(q.pop(Duration::from_millis(50)).unwrap().command, Command::ClearScreen);
        assert_eq!(q.pop(Duration::from_millis(50)).unwrap().command, Command::Reset);
    }

    #[test]
    fn pop_times_out_on_empty_queue() {
        let q = FrameQueue::new();
        assert!(q.pop(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn delayed_generation_wins_once_ready_drains() {
        let q = FrameQueue::new();
        q.push(Frame::command_only(Command::ClearScreen));
        q.push_delayed_streamed(Frame::streamed(
            Command::Rgb24ZonesStream,
            vec![1, 2, 3],
            StreamId::new(0),
        ));
        q.mark_delayed_ready();

        assert_eq!(q.pop(Duration::from_millis(50)).unwrap().command, Command::ClearScreen);
        let delayed = q.pop(Duration::from_millis(50)).unwrap();
        assert_eq!(delayed.command, Command::Rgb24ZonesStream);
    }

    #[test]
    fn begin_delayed_streamed_discards_a_stale_pending_generation() {
        let q = FrameQueue::new();
        q.push(Frame::command_only(Command::ClearScreen));

        // A first delayed generation gets staged and marked ready...
        q.push_delayed_streamed(Frame::streamed(Command::Rgb24ZonesStream, vec![1], StreamId::new(5)));
        q.mark_delayed_ready();

        // ...but before the worker ever drains it, a second generation
        // starts staging. Without resetting first, both stream ids would
        // end up in `delayed` together.
        q.begin_delayed_streamed();
        q.push_delayed_streamed(Frame::streamed(Command::Rgb24ZonesStream, vec![2], StreamId::new(6)));
        q.mark_delayed_ready();

        assert_eq!(q.pop(Duration::from_millis(50)).unwrap().command, Command::ClearScreen);
        let delayed = q.pop(Duration::from_millis(50)).unwrap();
        assert_eq!(delayed.payload, vec![2]);
        assert_eq!(delayed.stream_id, StreamId::new(6));
        assert!(q.pop(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn overflow_drops_ready_queue_when_delayed_pending() {
        let q = FrameQueue::new();
        for _ in 0..(FRAME_QUEUE_SIZE_MAX as u8 + 1) {
            q.push(Frame::command_only(Command::ClearScreen));
        }
        q.push_delayed_streamed(Frame::streamed(
            Command::Rgb24ZonesStream,
            vec![9],
            StreamId::new(3),
        ));
        q.mark_delayed_ready();

        let next = q.pop(Duration::from_millis(50)).unwrap();
        assert_eq!(next.command, Command::Rgb24ZonesStream);
    }
}
