//! Error types for cell encoding and native binding

use crate::codec::TextEncoding;

/// Why a character or string could not be laid out into a native cell
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("nothing to encode")]
    Empty,

    #[error("{0:?} has no representation in the target encoding")]
    Unrepresentable(char),

    #[error("{count} code points do not fit one cell")]
    TooManyCodepoints { count: usize },

    #[error("{0:?} is a spacing character and cannot follow the base character")]
    SpacingMark(char),

    #[error("needs {needed} payload bytes, only {available} available")]
    PayloadOverflow { needed: usize, available: usize },

    #[error("attribute word {word:#x} does not fit a {bits}-bit attr_t")]
    AttributeOverflow { word: u64, bits: u32 },

    #[error("interior NUL cannot cross the native boundary")]
    InteriorNul,
}

/// Error type for the cell core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("cannot encode {input:?} as {encoding}: {reason}")]
    Encoding {
        input: String,
        encoding: TextEncoding,
        #[source]
        reason: EncodingError,
    },

    #[error("{0} queried before it was constructed")]
    NotReady(&'static str),

    #[error("failed to load native library {library}: {message}")]
    LibraryLoad { library: String, message: String },

    #[error("native library {library} is missing symbol(s): {symbols}")]
    SymbolBinding { library: String, symbols: String },

    #[error("native call {function} failed with status {code}")]
    NativeCall { function: &'static str, code: i32 },

    #[error("native call {0} returned a null pointer")]
    NullPointer(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn encoding(input: impl Into<String>, encoding: TextEncoding, reason: EncodingError) -> Self {
        Error::Encoding {
            input: input.into(),
            encoding,
            reason,
        }
    }

    /// True for the conversion failures a collaborator should show to the user
    pub fn is_encoding(&self) -> bool {
        matches!(self, Error::Encoding { .. })
    }
}

/// Result type for the cell core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_error_message() {
        let err = Error::encoding(
            "☺",
            TextEncoding::Ascii,
            EncodingError::Unrepresentable('☺'),
        );
        assert!(err.is_encoding());
        let msg = err.to_string();
        assert!(msg.contains("ASCII"));
        assert!(msg.contains("☺"));
    }

    #[test]
    fn test_symbol_binding_message() {
        let err = Error::SymbolBinding {
            library: "libncursesw.so.6".to_string(),
            symbols: "wadd_wch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "native library libncursesw.so.6 is missing symbol(s): wadd_wch"
        );
        assert!(!err.is_encoding());
    }
}
