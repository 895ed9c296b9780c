use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("index {index} out of range for queue of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("queue is empty")]
    EmptyQueue,
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<(), EngineError> {
    if index < len {
        Ok(())
    } else {
        Err(EngineError::IndexOutOfRange { index, len })
    }
}
