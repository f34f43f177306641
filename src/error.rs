use std::{
    error::Error,
    fmt::{Display, Formatter},
    path::PathBuf,
};

/// Result type used at the seams with external collaborators (catalogs, downloaders, regridders).
pub type LowResResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/**
 * Everything that can go wrong while matching products, pairing granules, or running one of the
 * orchestrator stages.
 *
 * Structural problems (`InvalidPattern`, `NoProductAvailable`, `MalformedIdentifier`) abort the
 * call that hit them. `UnmatchedGeolocation` and `LoadFailure` describe a single granule or tuple
 * and are reported next to the results of the rest of the batch.
 */
#[derive(Debug)]
pub enum LowResError {
    /// No patterns given, an empty pattern, or a pattern that is not a valid glob.
    InvalidPattern(String),
    /// The product patterns did not match anything in the registry.
    NoProductAvailable(String),
    /// A data link did not follow the file naming convention of its product family.
    MalformedIdentifier { link: String, expected: &'static str },
    /// A spectral granule without a geolocation granule carrying the same timestamp key.
    UnmatchedGeolocation { key: String, granule: String },
    /// Building the grid for one local file tuple failed.
    LoadFailure { index: usize, msg: String },
    /// The catalog search failed for a product id.
    Catalog { product_id: String, msg: String },
    /// The download batch failed as a whole.
    Download(String),
    /// The downloader returned a different number of files than links it was handed.
    DownloadCountMismatch { expected: usize, actual: usize },
    /// An archive could not be extracted.
    Extraction { path: PathBuf, msg: String },
    /// A bounding box that is out of range or has its corners swapped.
    InvalidBoundingBox(String),
    /// An orchestrator stage was called before the stage it depends on.
    NotReady(&'static str),
}

impl Display for LowResError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        use LowResError::*;

        match self {
            InvalidPattern(msg) => write!(f, "invalid product pattern: {}", msg),
            NoProductAvailable(patterns) => {
                write!(f, "`{}` not available for lowres loaders", patterns)
            }
            MalformedIdentifier { link, expected } => {
                write!(f, "malformed granule link `{}`, expected {}", link, expected)
            }
            UnmatchedGeolocation { key, granule } => write!(
                f,
                "no geolocation granule found for {} at timestamp {}",
                granule, key
            ),
            LoadFailure { index, msg } => write!(f, "loading tuple {} failed: {}", index, msg),
            Catalog { product_id, msg } => {
                write!(f, "catalog search for {} failed: {}", product_id, msg)
            }
            Download(msg) => write!(f, "download failed: {}", msg),
            DownloadCountMismatch { expected, actual } => write!(
                f,
                "downloader returned {} files for {} links",
                actual, expected
            ),
            Extraction { path, msg } => {
                write!(f, "error extracting {}: {}", path.display(), msg)
            }
            InvalidBoundingBox(msg) => write!(f, "invalid bounding box: {}", msg),
            NotReady(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for LowResError {}
