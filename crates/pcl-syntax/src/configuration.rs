#[cfg(feature = "ast-json")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::definition::Definitions;
use crate::range::Position;

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Dot-separated package URI, e.g. `App.Data.Timers`.
    pub uri: SmolStr,
    pub position: Position,
}

impl Package {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: SmolStr::new(uri),
            position: Position::default(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.uri.split('.').map(str::trim).filter(|segment| !segment.is_empty())
    }
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub doc: bool,
    pub position: Position,
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Pragma {
    pub text: String,
    pub position: Position,
}

/// A parsed source file.
#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    pub package: Option<Package>,
    pub definitions: Definitions,
    pub comments: Vec<Comment>,
    pub pragmas: Vec<Pragma>,
}

impl Configuration {
    pub fn new(package: Option<&str>, definitions: Definitions) -> Self {
        Self {
            package: package.map(Package::new),
            definitions,
            comments: Vec::new(),
            pragmas: Vec::new(),
        }
    }

    pub fn doc_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|comment| comment.doc)
    }
}
