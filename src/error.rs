use std::fmt;

/// Errors surfaced at the crate's call boundaries.
///
/// Every failure here means the caller supplied input the pipeline refuses
/// to process; nothing is retried internally and nothing is swallowed.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// The outlier screen needs at least two baseline points.
    InsufficientBaseline { required: usize, got: usize },
    /// Quantization mode string other than "round" or "floor".
    InvalidQuantizeMode(String),
    /// Significance level outside the open interval (0, 1).
    InvalidSignificance(f64),
    /// A non-finite value reached a detector boundary.
    NonFiniteSample { value: f64 },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBaseline { required, got } => {
                write!(f, "need at least {} baseline points, got {}", required, got)
            }
            Self::InvalidQuantizeMode(mode) => {
                write!(f, "quantize mode must be \"round\" or \"floor\", got {:?}", mode)
            }
            Self::InvalidSignificance(alpha) => {
                write!(f, "significance level must be in (0, 1), got {}", alpha)
            }
            Self::NonFiniteSample { value } => {
                write!(f, "non-finite sample value: {}", value)
            }
        }
    }
}

impl std::error::Error for MonitorError {}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
