/*!
 * Static descriptions of the supported satellite products.
 *
 * A [ProductDescriptor] ties a catalog product id to the routines that know how to handle its
 * granules: which timestamp parser correlates it with its geolocation product, how to unpack a
 * downloaded file, and how to load the files onto a grid.
 */

use crate::{
    extract::{self, UnzipFn},
    grid::{self, LoadFn},
    parse::{self, ParseFn},
};
use std::fmt::{self, Display};

/// Everything the loaders need to know about one product family.
#[derive(Clone, Copy)]
pub struct ProductDescriptor {
    /// Human readable name, also matched against by the registry.
    pub name: &'static str,
    /// Catalog short name. May hold wildcards, e.g. `S3*_SY_2_SYN` for every Sentinel-3 mission.
    pub id: &'static str,
    /// Catalog short name of the companion geolocation product, if one is needed.
    pub geo_id: Option<&'static str>,
    pub parse: ParseFn,
    pub unzip: UnzipFn,
    pub load: LoadFn,
}

impl ProductDescriptor {
    /// Whether granules of this product have to be paired with geolocation granules.
    pub fn needs_geolocation(&self) -> bool {
        self.geo_id.is_some()
    }
}

impl fmt::Debug for ProductDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProductDescriptor")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("geo_id", &self.geo_id)
            .finish_non_exhaustive()
    }
}

/// Descriptors are identified by their name and ids, the routines follow from those.
impl PartialEq for ProductDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id && self.geo_id == other.geo_id
    }
}

impl Eq for ProductDescriptor {}

impl Display for ProductDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self.geo_id {
            Some(geo_id) => write!(f, "{:<20} {:<14} geolocation: {}", self.name, self.id, geo_id),
            None => write!(f, "{:<20} {}", self.name, self.id),
        }
    }
}

/// VIIRS near real time surface reflectance, paired with the 375m geolocation product.
pub const VIIRS: ProductDescriptor = ProductDescriptor {
    name: "VIIRSProduct",
    id: "VNP09_NRT",
    geo_id: Some("VNP03IMG"),
    parse: parse::viirs_nrt,
    unzip: extract::identity,
    load: grid::load_viirs,
};

/// Sentinel-3 SYN level 2 surface reflectance, any mission.
pub const SENTINEL3_SYN: ProductDescriptor = ProductDescriptor {
    name: "Sentinel3SYNProduct",
    id: "S3*_SY_2_SYN",
    geo_id: None,
    parse: parse::sen3_syn,
    unzip: extract::unzip_sen3_syn,
    load: grid::load_sen3_syn,
};

pub const SENTINEL3A_SYN: ProductDescriptor = ProductDescriptor {
    name: "Sentinel3ASYNProduct",
    id: "S3A_SY_2_SYN",
    ..SENTINEL3_SYN
};

pub const SENTINEL3B_SYN: ProductDescriptor = ProductDescriptor {
    name: "Sentinel3BSYNProduct",
    id: "S3B_SY_2_SYN",
    ..SENTINEL3_SYN
};

pub const SENTINEL3C_SYN: ProductDescriptor = ProductDescriptor {
    name: "Sentinel3CSYNProduct",
    id: "S3C_SY_2_SYN",
    ..SENTINEL3_SYN
};

pub const SENTINEL3D_SYN: ProductDescriptor = ProductDescriptor {
    name: "Sentinel3DSYNProduct",
    id: "S3D_SY_2_SYN",
    ..SENTINEL3_SYN
};

/// All built in products, in registry order.
pub const BUILTIN_PRODUCTS: &[ProductDescriptor] = &[
    VIIRS,
    SENTINEL3_SYN,
    SENTINEL3A_SYN,
    SENTINEL3B_SYN,
    SENTINEL3C_SYN,
    SENTINEL3D_SYN,
];
