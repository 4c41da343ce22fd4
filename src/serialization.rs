//! Persistence of estimators, frames and configs.
//!
//! Anything serde-serializable is [`SerializableParams`]: simple wrappers
//! (fitted or not), native estimators with their `…Config`, frames, series and
//! [`CheckerConfig`](crate::conformance::CheckerConfig). Meta-estimators that
//! hold trait-object members are not serializable.
//!
//! ```rust
//! use learnframe::serialization::SerializableParams;
//! use learnframe::frame::Frame;
//! use ndarray::array;
//!
//! let frame = Frame::new(["a", "b"], array![[1.0, 2.0]]).unwrap();
//! let bytes = frame.to_bytes().unwrap();
//! assert_eq!(Frame::from_bytes(&bytes).unwrap(), frame);
//! ```

use crate::error::EstimatorError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// A value that can be written to and read from bytes.
pub trait SerializableParams: Sized {
    /// Serialize into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, EstimatorError>;

    /// Deserialize from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EstimatorError>;

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EstimatorError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        tracing::debug!(path = %path.as_ref().display(), "saved");
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, EstimatorError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl<T> SerializableParams for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_bytes(&self) -> Result<Vec<u8>, EstimatorError> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, EstimatorError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
