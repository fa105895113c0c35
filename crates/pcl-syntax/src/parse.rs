use std::path::Path;

use thiserror::Error;

use crate::configuration::Configuration;
use crate::range::Position;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at {position}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Turns source text into a [`Configuration`].
///
/// The grammar lives outside this workspace; the index only needs something
/// that can be called from several threads at once.
pub trait Parse: Send + Sync {
    fn parse(&self, path: &Path, text: &str) -> Result<Configuration, ParseError>;
}

impl<F> Parse for F
where
    F: Fn(&Path, &str) -> Result<Configuration, ParseError> + Send + Sync,
{
    fn parse(&self, path: &Path, text: &str) -> Result<Configuration, ParseError> {
        self(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_parser() {
        let parser = |_: &Path, text: &str| {
            if text.is_empty() {
                Err(ParseError::new("empty input", Position::default()))
            } else {
                Ok(Configuration::default())
            }
        };

        assert!(parser.parse(Path::new("a.pcl"), "A = 1").is_ok());
        let err = parser.parse(Path::new("a.pcl"), "").unwrap_err();
        assert_eq!(err.to_string(), "empty input at 1:1");
    }
}
