use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::models::error::CaptureError;
use crate::models::tensor_message::TensorMessage;
use crate::traits::message_sink::MessageSink;

/// Sink that hands messages to another thread over a bounded channel.
///
/// Never blocks the capture thread: when the queue is full the newest
/// message is dropped and counted.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<TensorMessage>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink holding at most `capacity` undelivered messages.
    pub fn bounded(capacity: usize) -> (Self, Receiver<TensorMessage>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let sink = Self {
            sender,
            dropped: AtomicU64::new(0),
        };
        (sink, receiver)
    }

    /// Messages discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl MessageSink for ChannelSink {
    fn signal(&self, message: TensorMessage) -> Result<(), CaptureError> {
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(CaptureError::SinkFailure("receiver disconnected".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::models::format::AudioFormat;
    use crate::models::tensor_message::AudioTensor;

    fn message(sequence: u64) -> TensorMessage {
        TensorMessage::new(
            "data",
            sequence,
            44100,
            AudioFormat::F32Lsb,
            AudioTensor::F32(Array2::zeros((1, 4))),
        )
    }

    #[test]
    fn delivers_in_order() {
        let (sink, rx) = ChannelSink::bounded(4);
        sink.signal(message(0)).unwrap();
        sink.signal(message(1)).unwrap();

        assert_eq!(rx.try_recv().unwrap().sequence, 0);
        assert_eq!(rx.try_recv().unwrap().sequence, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_newest_without_blocking() {
        let (sink, rx) = ChannelSink::bounded(2);
        for i in 0..5 {
            sink.signal(message(i)).unwrap();
        }

        assert_eq!(sink.dropped(), 3);
        let received: Vec<u64> = rx.try_iter().map(|m| m.sequence).collect();
        assert_eq!(received, vec![0, 1]);
    }

    #[test]
    fn disconnected_receiver_is_a_sink_failure() {
        let (sink, rx) = ChannelSink::bounded(2);
        drop(rx);
        let err = sink.signal(message(0)).unwrap_err();
        assert!(matches!(err, CaptureError::SinkFailure(_)));
    }
}
