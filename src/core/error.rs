use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Schema,
    TypeMismatch,
    UnknownVariant,
    UnknownTimezone,
    FieldMismatch,
    Parse,
    Io,
}

/// One step of the path from the root value to the failing node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Variant(String),
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    location: Vec<PathSegment>,
    line: Option<u64>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            location: Vec::new(),
            line: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn line(&self) -> Option<u64> {
        self.line
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn at_field(mut self, name: impl Into<String>) -> Self {
        self.location.push(PathSegment::Field(name.into()));
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.location.push(PathSegment::Index(index));
        self
    }

    pub fn at_variant(mut self, tag: impl Into<String>) -> Self {
        self.location.push(PathSegment::Variant(tag.into()));
        self
    }

    /// Segments from the root down to the failing node.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.location.iter().rev()
    }

    /// Location rendered as `$.field[3]<Tag>`; `None` for root-level failures.
    pub fn location(&self) -> Option<String> {
        if self.location.is_empty() {
            return None;
        }
        let mut out = String::from("$");
        for segment in self.segments() {
            match segment {
                PathSegment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                PathSegment::Index(index) => {
                    out.push_str(&format!("[{index}]"));
                }
                PathSegment::Variant(tag) => {
                    out.push('<');
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
        Some(out)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(location) = self.location() {
            write!(f, " (at: {location})")?;
        }
        if let Some(line) = self.line {
            write!(f, " (line: {line})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Schema => 3,
        ErrorKind::TypeMismatch => 4,
        ErrorKind::UnknownVariant => 5,
        ErrorKind::UnknownTimezone => 6,
        ErrorKind::FieldMismatch => 7,
        ErrorKind::Parse => 8,
        ErrorKind::Io => 9,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Schema, 3),
            (ErrorKind::TypeMismatch, 4),
            (ErrorKind::UnknownVariant, 5),
            (ErrorKind::UnknownTimezone, 6),
            (ErrorKind::FieldMismatch, 7),
            (ErrorKind::Parse, 8),
            (ErrorKind::Io, 9),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn location_is_rendered_root_first() {
        let err = Error::new(ErrorKind::TypeMismatch)
            .with_message("expected int")
            .at_field("xx")
            .at_index(2)
            .at_variant("UUU")
            .at_field("items");
        assert_eq!(err.location().as_deref(), Some("$.items<UUU>[2].xx"));
        assert_eq!(
            err.to_string(),
            "TypeMismatch: expected int (at: $.items<UUU>[2].xx)"
        );
    }

    #[test]
    fn root_errors_have_no_location() {
        let err = Error::new(ErrorKind::Usage).with_line(4);
        assert_eq!(err.location(), None);
        assert_eq!(err.to_string(), "Usage (line: 4)");
    }
}
