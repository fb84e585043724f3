use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
};
use tracing::{error, warn};

/// Coarse classification of what went wrong. `Parse` and `EmptyCollection` are
/// fatal while loading an annotation file, `SourceUnavailable` is a per-image
/// condition the caller may retry, `UnsupportedMask` never escapes a render
/// since affected objects are skipped.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub enum CvErrorKind {
    Parse,
    SourceUnavailable,
    EmptyCollection,
    UnsupportedMask,
    Other,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CvError {
    kind: CvErrorKind,
    msg: String,
}
impl CvError {
    pub fn new(msg: &str) -> CvError {
        CvError::with_kind(CvErrorKind::Other, msg)
    }
    pub fn with_kind(kind: CvErrorKind, msg: &str) -> CvError {
        CvError {
            kind,
            msg: msg.to_string(),
        }
    }
    pub fn parse(msg: &str) -> CvError {
        CvError::with_kind(CvErrorKind::Parse, msg)
    }
    pub fn source_unavailable(msg: &str) -> CvError {
        CvError::with_kind(CvErrorKind::SourceUnavailable, msg)
    }
    pub fn empty_collection(msg: &str) -> CvError {
        CvError::with_kind(CvErrorKind::EmptyCollection, msg)
    }
    pub fn unsupported_mask(msg: &str) -> CvError {
        CvError::with_kind(CvErrorKind::UnsupportedMask, msg)
    }
    pub fn kind(&self) -> CvErrorKind {
        self.kind
    }
    pub fn msg(&self) -> &str {
        &self.msg
    }
}
impl Display for CvError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}
impl Error for CvError {}
impl From<&str> for CvError {
    fn from(value: &str) -> Self {
        CvError::new(value)
    }
}
/// The crate's result type with [`CvError`](CvError) as error type.
pub type CvResult<U> = Result<U, CvError>;

pub fn ignore_error<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    x.ok()
}
pub fn trace_ok_err<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    match x {
        Ok(x) => Some(x),
        Err(e) => {
            error!("{e:?}");
            None
        }
    }
}
pub fn trace_ok_warn<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    match x {
        Ok(x) => Some(x),
        Err(e) => {
            warn!("{e:?}");
            None
        }
    }
}
/// Creates a [`CvError`](CvError) with a formatted message.
/// ```rust
/// # use std::error::Error;
/// use cvlib::{cverr, result::CvError};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// assert_eq!(cverr!("some error {}", 1), CvError::new(format!("some error {}", 1).as_str()));
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! cverr {
    ($s:literal) => {
        $crate::result::CvError::new(format!($s).as_str())
    };
    ($s:literal, $( $exps:expr ),*) => {
        $crate::result::CvError::new(format!($s, $($exps,)*).as_str())
    }
}

pub fn to_cv<E: Debug>(e: E) -> CvError {
    cverr!(
        "original error type is '{:?}', error message is '{:?}'",
        std::any::type_name::<E>(),
        e
    )
}

#[test]
fn test_kinds() {
    let e = CvError::parse("missing key");
    assert_eq!(e.kind(), CvErrorKind::Parse);
    assert_eq!(e.msg(), "missing key");
    let e = cverr!("formatted {}", 7);
    assert_eq!(e.kind(), CvErrorKind::Other);
    assert_eq!(e.msg(), "formatted 7");
}
