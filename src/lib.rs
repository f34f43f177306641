/*!
 * Find, download, and grid low resolution optical satellite products.
 *
 * VIIRS and Sentinel-3 SYN surface reflectance granules are searched for a time range and an area
 * of interest, spectral granules are paired with their geolocation granules by the acquisition
 * time encoded in their file names, and the downloaded files are handed to a regridding stack to
 * produce arrays clipped to the area of interest.
 */
pub use catalog::{Catalog, CmrCatalog};
pub use download::{Downloader, HttpDownloader};
pub use error::{LowResError, LowResResult};
pub use geo::BoundingBox;
pub use granule::{Granule, GranulePair, TimeRange};
pub use grid::{
    load_sen3_syn, load_viirs, BandSource, GeolocationSource, GriddedArray, InterpMethod, LoadFn,
    LoadOptions, Regridder, SwathRequest, ValueScaling,
};
pub use loader::{resolve, EarthDataLoader, LocalTuple, RemoteTuple};
pub use pairing::{pair, Pairing, UnmatchedInfo};
pub use product::{
    ProductDescriptor, BUILTIN_PRODUCTS, SENTINEL3A_SYN, SENTINEL3B_SYN, SENTINEL3C_SYN,
    SENTINEL3D_SYN, SENTINEL3_SYN, VIIRS,
};
pub use registry::{Duplicates, Patterns, ProductRegistry};

pub mod extract;
pub mod parse;

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod catalog;
mod download;
mod error;
mod geo;
mod granule;
mod grid;
mod loader;
mod pairing;
mod product;
mod registry;
