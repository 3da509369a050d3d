use std::fmt;

/// The error type used when decoding a Sierra ECG / Philips ECG file fails.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// The document type/version pair is not one this crate understands, the waveform
    /// data encoding is not base64, or the compression method is neither XLI nor
    /// uncompressed.
    UnsupportedFile(String),

    /// A required XML element was not found anywhere in the document.
    MissingElement(&'static str),

    /// A required XML attribute was missing and no default applies.
    MissingAttribute(&'static str),

    /// The `<repbeat>` lead order disagreed with the `<parsedwaveforms>` lead order.
    OrderingMismatch {
        expected: String,
        found: String,
    },

    /// The waveform payload was malformed: bad base64, a truncated XLI chunk, or a
    /// declared chunk size too large to trust.
    DecodeError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;

        match self {
            UnsupportedFile(msg) => write!(f, "{}", msg),
            MissingElement(tag) => write!(f, "missing required element <{}>", tag),
            MissingAttribute(attr) => write!(f, "missing required attribute @{}", attr),
            OrderingMismatch { expected, found } => write!(
                f,
                "repbeat lead order does not match parsed waveform order: expected {}, found {}",
                expected, found
            ),
            DecodeError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
