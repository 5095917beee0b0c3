//! Crate-wide error taxonomy.
//!
//! Every fallible operation in this crate returns `IiifError`. The HTTP
//! binding layer is the only place that turns a variant into a status code
//! and a response body; the core never constructs a response itself.

use std::fmt;

/// A status independent of any particular HTTP library, so the core stays
/// framework-agnostic. The `http` binding maps these onto `axum::http::StatusCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    BadRequest,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn as_u16(self) -> u16 {
        match self {
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IiifError {
    #[error("{0}")]
    RegionSyntax(String),
    #[error("{0}")]
    RegionRequest(String),
    #[error("{0}")]
    SizeSyntax(String),
    #[error("{0}")]
    SizeRequest(String),
    #[error("{0}")]
    RotationSyntax(String),
    #[error("{0}")]
    Resolver(String),
    #[error("{0}")]
    ImageInfo(String),
    #[error("{0}")]
    Image(String),
    #[error("{0}")]
    Format(String),
    #[error("{0}")]
    Quality(String),
}

impl IiifError {
    pub fn status(&self) -> Status {
        use IiifError::*;
        match self {
            RegionSyntax(_) | RegionRequest(_) | SizeSyntax(_) | SizeRequest(_)
            | RotationSyntax(_) | Format(_) | Quality(_) => Status::BadRequest,
            Resolver(_) => Status::NotFound,
            ImageInfo(_) | Image(_) => Status::InternalServerError,
        }
    }

    /// A short machine-readable tag for the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        use IiifError::*;
        match self {
            RegionSyntax(_) => "region_syntax",
            RegionRequest(_) => "region_request",
            SizeSyntax(_) => "size_syntax",
            SizeRequest(_) => "size_request",
            RotationSyntax(_) => "rotation_syntax",
            Resolver(_) => "resolver",
            ImageInfo(_) => "image_info",
            Image(_) => "image",
            Format(_) => "format",
            Quality(_) => "quality",
        }
    }
}
