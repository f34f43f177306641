/*!
 * Geographic extents.
 *
 * All the real geometry happens in the regridding stack, the only thing this crate needs is a way
 * to carry an area of interest around and hand it to the catalog and the loaders.
 */

use crate::error::LowResError;
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// A longitude/latitude aligned box in degrees, ordered the way the catalogs want it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /**
     * Create a new bounding box and check it for sanity.
     *
     * Antimeridian crossing is not supported, so `west` must be strictly less than `east`.
     */
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, LowResError> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(LowResError::InvalidBoundingBox(format!(
                "Lat/Lon must be finite: west={} south={} east={} north={}",
                west, south, east, north
            )));
        }

        if south >= north || west >= east {
            return Err(LowResError::InvalidBoundingBox(format!(
                concat!(
                    "Minimum Lat/Lon must be less than Maximum Lat/Lon:",
                    " west={} south={} east={} north={}"
                ),
                west, south, east, north
            )));
        }

        if south < -90.0 || north > 90.0 || west < -180.0 || east > 180.0 {
            return Err(LowResError::InvalidBoundingBox(format!(
                concat!(
                    "Lat/Lon are out of range (-90.0 to 90.0 and -180.0 to 180.0):",
                    " west={} south={} east={} north={}"
                ),
                west, south, east, north
            )));
        }

        Ok(BoundingBox {
            west,
            south,
            east,
            north,
        })
    }

    /// The corners as `[west, south, east, north]`.
    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl FromStr for BoundingBox {
    type Err = LowResError;

    /// Parse `west,south,east,north`.
    fn from_str(bbox_str: &str) -> Result<Self, Self::Err> {
        let corners: Vec<_> = bbox_str.split(',').map(str::trim).collect();

        if corners.len() != 4 {
            return Err(LowResError::InvalidBoundingBox(format!(
                "expected 4 comma separated values, got {}",
                corners.len()
            )));
        }

        let mut vals = [0.0f64; 4];
        for (val, corner) in vals.iter_mut().zip(&corners) {
            *val = corner.parse().map_err(|_| {
                LowResError::InvalidBoundingBox(format!("`{}` is not a number", corner))
            })?;
        }

        BoundingBox::new(vals[0], vals[1], vals[2], vals[3])
    }
}
