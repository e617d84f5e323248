//! Producer-side failure records.

use std::{
    any::Any,
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    sync::Arc,
};


/// Opaque record of a producer-side failure, deposited into a channel to be returned later
///
/// Consists of a kind, a message, and a possibly empty chain of cause messages (outermost
/// first). Records are cheap to clone and compare by content, so a consumer receives a record
/// identical to the one the producer deposited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorRecord(Arc<Inner>);

#[derive(Debug, PartialEq, Eq, Hash)]
struct Inner {
    kind: Cow<'static, str>,
    message: String,
    causes: Vec<String>,
}

impl ErrorRecord {
    /// Kind assigned to records made from errors with no more specific kind
    pub const ERROR_KIND: &'static str = "error";

    /// Kind assigned to records made from caught panics
    pub const PANIC_KIND: &'static str = "panic";

    /// Construct from a kind and a message, with no causes
    pub fn new(kind: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::with_causes(kind, message, Vec::new())
    }

    fn with_causes(
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        causes: Vec<String>,
    ) -> Self {
        ErrorRecord(Arc::new(Inner {
            kind: kind.into(),
            message: message.into(),
            causes,
        }))
    }

    /// Capture an error and its `source` chain
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let mut causes = Vec::new();
        let mut next = error.source();
        while let Some(cause) = next {
            causes.push(cause.to_string());
            next = cause.source();
        }
        Self::with_causes(Self::ERROR_KIND, error.to_string(), causes)
    }

    /// Capture the payload of a caught panic
    ///
    /// Panics raised with a string message keep that message, anything else is recorded as an
    /// opaque panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_owned()
        };
        Self::new(Self::PANIC_KIND, message)
    }

    /// Replace the kind, keeping message and causes
    pub fn with_kind(self, kind: impl Into<Cow<'static, str>>) -> Self {
        let inner = Arc::try_unwrap(self.0).unwrap_or_else(|arc| Inner {
            kind: arc.kind.clone(),
            message: arc.message.clone(),
            causes: arc.causes.clone(),
        });
        Self::with_causes(kind, inner.message, inner.causes)
    }

    /// The failure kind
    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    /// The top-level failure message
    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// Messages of the underlying causes, outermost first
    pub fn causes(&self) -> &[String] {
        &self.0.causes
    }

    /// Whether this record was made from a caught panic
    pub fn is_panic(&self) -> bool {
        self.kind() == Self::PANIC_KIND
    }
}

impl Display for ErrorRecord {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.0.kind, self.0.message)?;
        if f.alternate() {
            for cause in &self.0.causes {
                write!(f, ": {}", cause)?;
            }
        }
        Ok(())
    }
}

impl Error for ErrorRecord {}

impl From<anyhow::Error> for ErrorRecord {
    fn from(error: anyhow::Error) -> Self {
        let causes = error.chain().skip(1).map(|cause| cause.to_string()).collect();
        Self::with_causes(Self::ERROR_KIND, error.to_string(), causes)
    }
}

impl From<std::io::Error> for ErrorRecord {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(&error).with_kind(format!("io::{:?}", error.kind()))
    }
}

impl From<String> for ErrorRecord {
    fn from(message: String) -> Self {
        Self::new(Self::ERROR_KIND, message)
    }
}

impl From<&str> for ErrorRecord {
    fn from(message: &str) -> Self {
        Self::new(Self::ERROR_KIND, message)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use std::panic::catch_unwind;

    #[test]
    fn display_kind_and_message() {
        let record = ErrorRecord::new("out_of_range", "oops");
        assert_eq!(record.kind(), "out_of_range");
        assert_eq!(record.message(), "oops");
        assert!(record.causes().is_empty());
        assert_eq!(record.to_string(), "out_of_range: oops");
    }

    #[test]
    fn anyhow_chain_is_kept() {
        let error = Err::<(), _>(anyhow!("disk on fire"))
            .context("loading config")
            .unwrap_err();
        let record = ErrorRecord::from(error);
        assert_eq!(record.kind(), ErrorRecord::ERROR_KIND);
        assert_eq!(record.message(), "loading config");
        assert_eq!(record.causes(), ["disk on fire".to_owned()]);
        assert_eq!(format!("{:#}", record), "error: loading config: disk on fire");
    }

    #[test]
    fn io_error_kind() {
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such thing");
        let record = ErrorRecord::from(error);
        assert_eq!(record.kind(), "io::NotFound");
        assert_eq!(record.message(), "no such thing");
    }

    #[test]
    fn panic_payloads() {
        let record = ErrorRecord::from_panic(catch_unwind(|| panic!("static")).unwrap_err());
        assert!(record.is_panic());
        assert_eq!(record.message(), "static");

        let n = 7;
        let record = ErrorRecord::from_panic(catch_unwind(|| panic!("formatted {}", n)).unwrap_err());
        assert_eq!(record.message(), "formatted 7");

        let record = ErrorRecord::from_panic(Box::new(42u32));
        assert_eq!(record.message(), "opaque panic payload");
    }

    #[test]
    fn with_kind_keeps_content() {
        let record = ErrorRecord::new("a", "msg");
        let shared = record.clone();
        let renamed = record.with_kind("b");
        assert_eq!(renamed.kind(), "b");
        assert_eq!(renamed.message(), "msg");
        assert_eq!(shared.kind(), "a");
    }
}
