//! Fixed IIIF Image API (Level 2) identifiers, ported from `loris/constants.py`.

pub const CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
pub const PROTOCOL: &str = "http://iiif.io/api/image";
pub const COMPLIANCE: &str = "http://iiif.io/api/image/2/level2.json";
