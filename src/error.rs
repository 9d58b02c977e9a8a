//! Error types for packet encoding, decoding and type loading.
//!
//! All errors implement `std::error::Error` and carry structured context so a
//! caller can decide whether to drop, log or escalate a bad buffer.
//!
//! ## Error Categories
//!
//! - **Codec Errors**: wrong buffer size, wrong identity tag, unknown tag
//! - **Layout Errors**: inconsistent packet layouts or duplicate registrations
//! - **Parse Errors**: header grammar and constant expression failures
//! - **File Errors**: problems reading header directories or config files
//!
//! ## Distinguishing codec failures
//!
//! A right-sized buffer carrying the wrong tag and a truncated buffer are
//! different failures. Match on [`RtdnError::kind`]:
//!
//! ```rust
//! use rtdn::{ErrorKind, PacketCodec, Test2};
//!
//! let err = Test2::decode(&[0u8; 11]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::PacketSizeMismatch);
//! assert!(!err.is_retryable());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rtdn operations.
pub type Result<T, E = RtdnError> = std::result::Result<T, E>;

/// Main error type for rtdn operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RtdnError {
    #[error("Packet size mismatch for {packet}: expected {expected} bytes, got {actual}")]
    PacketSizeMismatch { packet: String, expected: usize, actual: usize },

    #[error("Packet identity mismatch for {packet}: expected tag {expected}, found {found}")]
    PacketIdentityMismatch { packet: String, expected: u32, found: u32 },

    #[error("Unknown packet tag {tag} in {length}-byte buffer")]
    UnknownPacketTag { tag: u32, length: usize },

    #[error("Invalid layout for {packet}: {reason}")]
    Layout { packet: String, reason: String },

    #[error("Packet type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("Packet type '{name}' is not registered")]
    UnknownPacketType { name: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Field '{field}' not found")]
    FieldNotFound { field: String },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of an [`RtdnError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PacketSizeMismatch,
    PacketIdentityMismatch,
    UnknownPacketTag,
    Layout,
    DuplicateType,
    UnknownPacketType,
    Parse,
    FieldNotFound,
    TypeConversion,
    Config,
    File,
}

impl RtdnError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RtdnError::PacketSizeMismatch { .. } => ErrorKind::PacketSizeMismatch,
            RtdnError::PacketIdentityMismatch { .. } => ErrorKind::PacketIdentityMismatch,
            RtdnError::UnknownPacketTag { .. } => ErrorKind::UnknownPacketTag,
            RtdnError::Layout { .. } => ErrorKind::Layout,
            RtdnError::DuplicateType { .. } => ErrorKind::DuplicateType,
            RtdnError::UnknownPacketType { .. } => ErrorKind::UnknownPacketType,
            RtdnError::Parse { .. } => ErrorKind::Parse,
            RtdnError::FieldNotFound { .. } => ErrorKind::FieldNotFound,
            RtdnError::TypeConversion { .. } => ErrorKind::TypeConversion,
            RtdnError::Config { .. } => ErrorKind::Config,
            RtdnError::File { .. } => ErrorKind::File,
        }
    }

    /// Returns true for the three wire-level failures a decoder can report.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::PacketSizeMismatch
                | ErrorKind::PacketIdentityMismatch
                | ErrorKind::UnknownPacketTag
        )
    }

    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Decoding is all-or-nothing on an immutable buffer, so retrying a failed
    /// decode can never succeed. Only interrupted I/O is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RtdnError::File { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            RtdnError::PacketSizeMismatch { .. }
            | RtdnError::PacketIdentityMismatch { .. }
            | RtdnError::UnknownPacketTag { .. }
            | RtdnError::Layout { .. }
            | RtdnError::DuplicateType { .. }
            | RtdnError::UnknownPacketType { .. }
            | RtdnError::Parse { .. }
            | RtdnError::FieldNotFound { .. }
            | RtdnError::TypeConversion { .. }
            | RtdnError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RtdnError::PacketSizeMismatch { .. } => vec![
                "Check the transport delivers whole records",
                "Verify producer and consumer agree on the layout version",
                "Drop the buffer and wait for the next sample",
            ],
            RtdnError::PacketIdentityMismatch { .. } => vec![
                "Check the buffer was routed to the right packet type",
                "Verify the producer sets the identity tag before sending",
                "Treat the stream as corrupted if this repeats",
            ],
            RtdnError::UnknownPacketTag { .. } => vec![
                "Register the packet type before decoding",
                "Load the header directory that defines this packet",
                "Check for a newer producer schema",
            ],
            RtdnError::Layout { .. } => vec![
                "Ensure the identity tag is the final uint32 field",
                "Check every field has a non-zero element count",
            ],
            RtdnError::DuplicateType { .. } => vec![
                "Register each packet type once",
                "Remove duplicate header files from the type directory",
            ],
            RtdnError::UnknownPacketType { .. } => vec![
                "Check the packet type name spelling",
                "Register the packet type or load its header first",
            ],
            RtdnError::Parse { .. } => vec![
                "Check the header file syntax",
                "Load shared constant headers before dependent headers",
            ],
            RtdnError::FieldNotFound { .. } => vec![
                "Check field name spelling",
                "Verify the field exists in this packet layout",
            ],
            RtdnError::TypeConversion { .. } => vec![
                "Check the field's declared type",
                "Use the Value accessors for dynamic access",
            ],
            RtdnError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Compare against the documented configuration keys",
            ],
            RtdnError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for size mismatches.
    pub fn size_mismatch(packet: impl Into<String>, expected: usize, actual: usize) -> Self {
        RtdnError::PacketSizeMismatch { packet: packet.into(), expected, actual }
    }

    /// Helper constructor for identity tag mismatches.
    pub fn identity_mismatch(packet: impl Into<String>, expected: u32, found: u32) -> Self {
        RtdnError::PacketIdentityMismatch { packet: packet.into(), expected, found }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        RtdnError::File { path, source }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        RtdnError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for layout errors.
    pub fn layout_error(packet: impl Into<String>, reason: impl Into<String>) -> Self {
        RtdnError::Layout { packet: packet.into(), reason: reason.into() }
    }
}

impl From<std::io::Error> for RtdnError {
    fn from(err: std::io::Error) -> Self {
        RtdnError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            packet in "[a-z][a-z0-9]*",
            expected in 1usize..4096,
            actual in 0usize..4096,
            tag in any::<u32>(),
            found in any::<u32>(),
        ) {
            let size = RtdnError::size_mismatch(packet.clone(), expected, actual);
            let msg = size.to_string();
            prop_assert!(msg.contains(&packet));
            prop_assert!(msg.contains(&expected.to_string()));
            prop_assert!(msg.contains(&actual.to_string()));

            let identity = RtdnError::identity_mismatch(packet.clone(), tag, found);
            let msg = identity.to_string();
            prop_assert!(msg.contains(&tag.to_string()));
            prop_assert!(msg.contains(&found.to_string()));

            let unknown = RtdnError::UnknownPacketTag { tag, length: actual };
            prop_assert!(unknown.to_string().contains(&tag.to_string()));
        }

        #[test]
        fn codec_errors_are_never_retryable(expected in 1usize..512, actual in 0usize..512) {
            let err = RtdnError::size_mismatch("p", expected, actual);
            prop_assert!(err.is_codec_error());
            prop_assert!(!err.is_retryable());
        }
    }

    #[test]
    fn kinds_are_distinct_for_codec_failures() {
        let size = RtdnError::size_mismatch("test2", 12, 11);
        let identity = RtdnError::identity_mismatch("test2", 488000002, 416000005);
        let unknown = RtdnError::UnknownPacketTag { tag: 7, length: 12 };

        assert_eq!(size.kind(), ErrorKind::PacketSizeMismatch);
        assert_eq!(identity.kind(), ErrorKind::PacketIdentityMismatch);
        assert_eq!(unknown.kind(), ErrorKind::UnknownPacketTag);
        assert!(size.is_codec_error() && identity.is_codec_error() && unknown.is_codec_error());

        let parse = RtdnError::parse_error("header", "bad token");
        assert!(!parse.is_codec_error());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<RtdnError>();

        let error = RtdnError::size_mismatch("test1", 60, 59);
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        let errors = [
            RtdnError::size_mismatch("test1", 60, 59),
            RtdnError::identity_mismatch("test1", 1, 2),
            RtdnError::UnknownPacketTag { tag: 1, length: 4 },
            RtdnError::layout_error("x", "y"),
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn io_errors_convert_and_interrupted_is_retryable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Interrupted, "signal");
        let err: RtdnError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::File);
        assert!(err.is_retryable());

        let missing = RtdnError::file_error(
            PathBuf::from("/nope.h"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(!missing.is_retryable());
        match missing {
            RtdnError::File { source, .. } => assert_eq!(source.to_string(), "missing"),
            _ => panic!("Expected File error variant"),
        }
    }
}
