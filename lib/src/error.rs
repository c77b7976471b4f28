use std::{fmt, io};
use std::panic::Location;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The stage of a build that produced an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reading or classifying the source tree failed.
    Scan,
    /// An ignore rule failed to compile.
    Ignore,
    /// A node could not be rendered into a body.
    Render,
    /// An output directory or file could not be written.
    Flush,
    /// A template failed to load or execute.
    Template,
    /// Settings could not be read or are inconsistent.
    Config,
    /// No specific stage was recorded.
    Other,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    _location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

impl Error {
    /// The kind of the outermost error in the chain that recorded one.
    pub fn kind(&self) -> ErrorKind {
        match (self.kind, &self.prev) {
            (ErrorKind::Other, Some(prev)) => prev.kind(),
            (kind, _) => kind,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Places `self` behind `other`: `other` becomes the head of the chain.
    pub fn chain(self, mut other: Error) -> Self {
        fn _chain(error: Error, behind: &mut Error) {
            match behind.prev.as_mut() {
                Some(prev) => _chain(error, prev),
                None => behind.prev = Some(Box::new(error)),
            }
        }

        _chain(self, &mut other);
        other
    }

    /// Iterates over every message in the chain, outermost first.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        let mut current = Some(self);
        std::iter::from_fn(move || {
            let error = current?;
            current = error.prev.as_deref();
            Some(error.detail.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("; "))
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Scan => "scan error".fmt(f),
            ErrorKind::Ignore => "ignore rule error".fmt(f),
            ErrorKind::Render => "render error".fmt(f),
            ErrorKind::Flush => "flush error".fmt(f),
            ErrorKind::Template => "template error".fmt(f),
            ErrorKind::Config => "configuration error".fmt(f),
            ErrorKind::Other => "error".fmt(f),
        }
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($($T:ty),* $(,)?) => {
        $(
            impl $crate::error::ErrorDetail for $T {
                fn context(&self) -> Vec<(Option<String>, String)> {
                    let error: &(dyn std::error::Error + Send + Sync) = self;
                    error.context()
                }
            }
        )*
    }
}

impl_error_detail_with_std_error! {
    io::Error,
    std::string::FromUtf8Error,
    std::path::StripPrefixError,
    toml::de::Error,
    serde_json::Error,
    jwalk::Error,
    glob::PatternError,
    minijinja::Error,
}

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            kind: ErrorKind::Other,
            prev: None,
            detail: vec![Box::new(detail)],
            _location: Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;
                let indent_line = format!("\n{indent}");

                for detail in &e.detail {
                    let message = format!("{:#}", detail).replace('\n', &indent_line);
                    match e.kind {
                        ErrorKind::Other => writeln!(f, "{indent}{message}")?,
                        kind => writeln!(f, "{indent}{kind}: {message}")?,
                    }

                    for (key, value) in detail.context() {
                        let value = value.replace('\n', &indent_line);
                        match key {
                            Some(key) => writeln!(f, "{indent}{key}: {value}")?,
                            None => writeln!(f, "{indent}{value}")?,
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e._location)?;
                    }
                }

                if let Some(prev) = &e.prev {
                    NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

impl StdError for Error { }

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

/// Builds an [`Error`](crate::error::Error) from a message and context.
///
/// A leading `Kind:` records the [`ErrorKind`](crate::error::ErrorKind):
///
/// ```rust
/// use swgen::error::ErrorKind;
///
/// let error = swgen::error!(Render: "converter failed", "path" => "a.md");
/// assert_eq!(error.kind(), ErrorKind::Render);
/// assert!(error.to_string().contains("path: a.md"));
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($kind:ident : $msg:expr, $($rest:tt)*) => (
        $crate::error!($msg, $($rest)*).with_kind($crate::error::ErrorKind::$kind)
    );

    ($kind:ident : $msg:expr) => ( $crate::error!($kind: $msg,) );

    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        self.map_err(|e| e.into().chain(other.into()))
    }

    #[track_caller]
    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
    {
        self.map_err(|e| e.into().chain(f().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_failure() -> Result<()> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
            .chain_with(|| error!(Flush: "failed to write output", "path" => "out/a.html"))
    }

    #[test]
    fn chained_errors_keep_outer_kind_and_context() {
        let error = io_failure().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Flush);

        let display = error.to_string();
        assert!(display.starts_with("flush error: failed to write output"));
        assert!(display.contains("path: out/a.html"));
        assert!(display.contains("no such file"));
    }

    #[test]
    fn kind_falls_through_unkinded_heads() {
        let inner = error!(Scan: "entry resolves outside the root");
        let error = inner.chain(error!("build aborted"));
        assert_eq!(error.kind(), ErrorKind::Scan);

        let messages: Vec<_> = error.messages().collect();
        assert_eq!(messages, ["build aborted", "entry resolves outside the root"]);
    }

    #[test]
    fn formatted_messages_are_accepted() {
        let name = "page.html";
        let error = error!(format!("missing template {name}"), "searched" => ".template");
        assert_eq!(error.kind(), ErrorKind::Other);
        assert!(error.to_string().contains("missing template page.html"));
    }
}
