use crate::models::error::CaptureError;
use crate::models::tensor_message::TensorMessage;

/// Downstream consumer of tensor messages.
///
/// `signal` runs on the capture thread: it must not block.
pub trait MessageSink: Send + Sync {
    fn signal(&self, message: TensorMessage) -> Result<(), CaptureError>;
}

impl<F> MessageSink for F
where
    F: Fn(TensorMessage) + Send + Sync,
{
    fn signal(&self, message: TensorMessage) -> Result<(), CaptureError> {
        self(message);
        Ok(())
    }
}
