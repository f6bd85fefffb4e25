//! Error types for memory layer operations.

use thiserror::Error;

/// Errors that can occur while reading a memory layer.
#[derive(Error, Debug)]
pub enum LayerError {
    /// An address is not valid in the layer.
    #[error("Invalid address {invalid_address:#x} in layer '{layer_name}': {message}")]
    InvalidAddress {
        layer_name: String,
        invalid_address: u64,
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayerError {
    /// Create an InvalidAddress error.
    pub fn invalid_address(layer_name: impl Into<String>, addr: u64, msg: impl Into<String>) -> Self {
        LayerError::InvalidAddress {
            layer_name: layer_name.into(),
            invalid_address: addr,
            message: msg.into(),
        }
    }
}

/// Result type for memory operations.
pub type LayerResult<T> = Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_error() {
        let err = LayerError::invalid_address("physical", 0x1000, "past end of image");
        assert!(err.to_string().contains("physical"));
        assert!(err.to_string().contains("0x1000"));
    }
}
