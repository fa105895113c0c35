use std::path::PathBuf;

use pcl_syntax::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse \"{}\": {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("Invalid scan pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Failed to walk directory: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("Failed to start parse pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl IndexError {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            IndexError::Io { path, .. } | IndexError::Parse { path, .. } => Some(path),
            IndexError::Glob(err) => Some(err.path()),
            IndexError::Pattern(_) | IndexError::ThreadPool(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pcl_syntax::Position;

    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = IndexError::Parse {
            path: PathBuf::from("app/main.pcl"),
            source: ParseError::new("unexpected '}'", Position::new(3, 7)),
        };

        assert_eq!(
            err.to_string(),
            "Failed to parse \"app/main.pcl\": unexpected '}' at 3:7"
        );
        assert_eq!(err.path(), Some(std::path::Path::new("app/main.pcl")));
    }
}
