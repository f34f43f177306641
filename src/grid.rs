/*!
 * Turning downloaded swath files into regular grids.
 *
 * Reading the swaths, reprojecting, interpolating, and clipping is done by an external raster
 * stack behind the [Regridder] trait. What lives here is the per product knowledge of where the
 * bands and the geolocation arrays are stored in the downloaded files and how the values are
 * encoded.
 */

use crate::{error::LowResResult, geo::BoundingBox};
use ndarray::{Array3, ArrayView2, Axis};
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Interpolation used to fill grid cells that no swath pixel landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum InterpMethod {
    Linear,
    Nearest,
}

/// Knobs passed through to the regridder.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Target coordinate reference system.
    pub epsg_code: String,
    /// Extra swath pixels kept around the bounding box before regridding.
    pub buffer: usize,
    pub interp_method: InterpMethod,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            epsg_code: "EPSG:4326".to_owned(),
            buffer: 20,
            interp_method: InterpMethod::Linear,
        }
    }
}

/// How raw values in the band variables become reflectances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueScaling {
    /// Mask `_FillValue`, then apply `scale_factor` and `add_offset`. All bands must agree on them.
    FromAttributes,
    /// Values are already reflectances, missing data is NaN.
    AsStored,
}

/// Where the per pixel longitude and latitude arrays are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GeolocationSource {
    pub path: PathBuf,
    /// NetCDF group holding the variables, if not the root group.
    pub group: Option<&'static str>,
    pub lon: &'static str,
    pub lat: &'static str,
    /// Name of the along track dimension in the file.
    pub row_dim: &'static str,
    /// Name of the cross track dimension in the file.
    pub col_dim: &'static str,
}

/// A single spectral band to read.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSource {
    /// Label of the band in the output array.
    pub name: String,
    pub path: PathBuf,
    pub variable: String,
}

/// Everything a regridder needs to know to read one acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct SwathRequest {
    pub geolocation: GeolocationSource,
    pub bands: Vec<BandSource>,
    pub scaling: ValueScaling,
}

/// A stack of bands on a regular grid, clipped to the area of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedArray {
    /// Band labels, in the order of the first axis of `data`.
    pub bands: Vec<String>,
    /// Values indexed by `(band, y, x)`.
    pub data: Array3<f32>,
    pub crs: String,
    pub resolution: f64,
    pub bbox: BoundingBox,
}

impl GriddedArray {
    /// Look up a single band by label.
    pub fn band(&self, name: &str) -> Option<ArrayView2<'_, f32>> {
        self.bands
            .iter()
            .position(|b| b == name)
            .map(|idx| self.data.index_axis(Axis(0), idx))
    }
}

/// The external stack that reads swath files and grids them.
pub trait Regridder {
    fn regrid(
        &self,
        request: &SwathRequest,
        bbox: &BoundingBox,
        resolution: f64,
        options: &LoadOptions,
    ) -> LowResResult<GriddedArray>;
}

/// Signature of the per product load routines.
pub type LoadFn = fn(
    &[PathBuf],
    &BoundingBox,
    f64,
    &LoadOptions,
    &dyn Regridder,
) -> LowResResult<GriddedArray>;

/**
 * Load a VIIRS 375m surface reflectance granule with its geolocation granule.
 *
 * `files` must be the spectral HDF file followed by the geolocation NetCDF file.
 */
pub fn load_viirs(
    files: &[PathBuf],
    bbox: &BoundingBox,
    resolution: f64,
    options: &LoadOptions,
    regridder: &dyn Regridder,
) -> LowResResult<GriddedArray> {
    const BANDS: [&str; 3] = ["I1", "I2", "I3"];

    let (spectral, geolocation) = match files {
        [spectral, geolocation] => (spectral, geolocation),
        _ => {
            return Err(format!(
                "VIIRS needs a spectral and a geolocation file, got {} files",
                files.len()
            )
            .into())
        }
    };
    require_file(spectral)?;
    require_file(geolocation)?;

    let request = SwathRequest {
        geolocation: GeolocationSource {
            path: geolocation.clone(),
            group: Some("geolocation_data"),
            lon: "longitude",
            lat: "latitude",
            row_dim: "number_of_lines",
            col_dim: "number_of_pixels",
        },
        bands: BANDS
            .iter()
            .map(|b| BandSource {
                name: b.to_string(),
                path: spectral.clone(),
                variable: format!("375m Surface Reflectance Band {}", b),
            })
            .collect(),
        scaling: ValueScaling::FromAttributes,
    };

    run(&request, bbox, resolution, options, regridder)
}

/**
 * Load an extracted Sentinel-3 SYN product directory.
 *
 * `files` must be the single `.SEN3` directory produced by the archive extraction.
 */
pub fn load_sen3_syn(
    files: &[PathBuf],
    bbox: &BoundingBox,
    resolution: f64,
    options: &LoadOptions,
    regridder: &dyn Regridder,
) -> LowResResult<GriddedArray> {
    const BANDS: [u8; 16] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 16, 17, 18, 21];

    let dir = match files {
        [dir] => dir,
        _ => {
            return Err(format!(
                "Sentinel-3 SYN needs a single product directory, got {} files",
                files.len()
            )
            .into())
        }
    };
    if !dir.is_dir() {
        return Err(format!("{} is not an extracted SEN3 directory", dir.display()).into());
    }

    let geolocation = dir.join("geolocation.nc");
    require_file(&geolocation)?;

    let request = SwathRequest {
        geolocation: GeolocationSource {
            path: geolocation,
            group: None,
            lon: "lon",
            lat: "lat",
            row_dim: "rows",
            col_dim: "columns",
        },
        bands: BANDS
            .iter()
            .map(|b| {
                let name = format!("Oa{:02}", b);
                BandSource {
                    path: dir.join(format!("Syn_{}_reflectance.nc", name)),
                    variable: format!("SDR_{}", name),
                    name,
                }
            })
            .collect(),
        scaling: ValueScaling::AsStored,
    };

    run(&request, bbox, resolution, options, regridder)
}

fn run(
    request: &SwathRequest,
    bbox: &BoundingBox,
    resolution: f64,
    options: &LoadOptions,
    regridder: &dyn Regridder,
) -> LowResResult<GriddedArray> {
    if !(resolution > 0.0) {
        return Err(format!("resolution must be positive, got {}", resolution).into());
    }

    let grid = regridder.regrid(request, bbox, resolution, options)?;

    let nbands = grid.data.len_of(Axis(0));
    if nbands != request.bands.len() || grid.bands.len() != nbands {
        return Err(format!(
            "regridder returned {} bands ({} labels) for {} requested",
            nbands,
            grid.bands.len(),
            request.bands.len()
        )
        .into());
    }

    Ok(grid)
}

fn require_file(path: &Path) -> LowResResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(format!("missing file {}", path.display()).into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::RefCell, fs};

    /// Records the request and hands back a zero filled grid with one layer per band.
    #[derive(Default)]
    struct RecordingRegridder {
        seen: RefCell<Vec<SwathRequest>>,
    }

    impl Regridder for RecordingRegridder {
        fn regrid(
            &self,
            request: &SwathRequest,
            bbox: &BoundingBox,
            resolution: f64,
            options: &LoadOptions,
        ) -> LowResResult<GriddedArray> {
            self.seen.borrow_mut().push(request.clone());
            Ok(GriddedArray {
                bands: request.bands.iter().map(|b| b.name.clone()).collect(),
                data: Array3::zeros((request.bands.len(), 2, 3)),
                crs: options.epsg_code.clone(),
                resolution,
                bbox: *bbox,
            })
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(10.0, 45.0, 12.0, 46.0).unwrap()
    }

    #[test]
    fn test_load_viirs_builds_request() {
        let tmp = tempfile::tempdir().unwrap();
        let spectral = tmp.path().join("VNP09_NRT.A2024123.1200.002.hdf");
        let geo = tmp.path().join("VNP03IMG.A2024123.1200.002.nc");
        fs::write(&spectral, b"hdf").unwrap();
        fs::write(&geo, b"nc").unwrap();

        let regridder = RecordingRegridder::default();
        let grid = load_viirs(
            &[spectral.clone(), geo.clone()],
            &bbox(),
            0.004,
            &LoadOptions::default(),
            &regridder,
        )
        .unwrap();

        assert_eq!(grid.bands, ["I1", "I2", "I3"]);
        assert_eq!(grid.crs, "EPSG:4326");
        assert!(grid.band("I2").is_some());
        assert!(grid.band("M1").is_none());

        let seen = regridder.seen.borrow();
        let req = &seen[0];
        assert_eq!(req.geolocation.path, geo);
        assert_eq!(req.geolocation.group, Some("geolocation_data"));
        assert_eq!(req.scaling, ValueScaling::FromAttributes);
        assert_eq!(req.bands[0].path, spectral);
        assert_eq!(req.bands[0].variable, "375m Surface Reflectance Band I1");
    }

    #[test]
    fn test_load_viirs_needs_two_files() {
        let tmp = tempfile::tempdir().unwrap();
        let spectral = tmp.path().join("VNP09_NRT.A2024123.1200.002.hdf");
        fs::write(&spectral, b"hdf").unwrap();

        let regridder = RecordingRegridder::default();
        let opts = LoadOptions::default();

        assert!(load_viirs(&[spectral.clone()], &bbox(), 0.004, &opts, &regridder).is_err());

        // Second file does not exist.
        let missing = tmp.path().join("missing.nc");
        assert!(load_viirs(&[spectral, missing], &bbox(), 0.004, &opts, &regridder).is_err());
        assert!(regridder.seen.borrow().is_empty());
    }

    #[test]
    fn test_load_sen3_syn_builds_request() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("S3A_SY_2_SYN____20240102T101112.SEN3");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("geolocation.nc"), b"nc").unwrap();

        let regridder = RecordingRegridder::default();
        let grid = load_sen3_syn(
            &[dir.clone()],
            &bbox(),
            0.003,
            &LoadOptions::default(),
            &regridder,
        )
        .unwrap();

        assert_eq!(grid.bands.len(), 16);
        assert_eq!(grid.bands[0], "Oa01");
        assert_eq!(grid.bands[15], "Oa21");

        let seen = regridder.seen.borrow();
        let req = &seen[0];
        assert_eq!(req.scaling, ValueScaling::AsStored);
        assert_eq!(req.geolocation.lon, "lon");
        assert_eq!(req.bands[12].path, dir.join("Syn_Oa16_reflectance.nc"));
        assert_eq!(req.bands[12].variable, "SDR_Oa16");
    }

    #[test]
    fn test_load_sen3_syn_rejects_unextracted_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let zip = tmp.path().join("S3A_SY_2_SYN.zip");
        fs::write(&zip, b"PK").unwrap();

        let regridder = RecordingRegridder::default();
        let res = load_sen3_syn(&[zip], &bbox(), 0.003, &LoadOptions::default(), &regridder);
        assert!(res.is_err());
    }

    #[test]
    fn test_rejects_bad_resolution_and_band_mismatch() {
        struct Lying;
        impl Regridder for Lying {
            fn regrid(
                &self,
                _request: &SwathRequest,
                bbox: &BoundingBox,
                resolution: f64,
                options: &LoadOptions,
            ) -> LowResResult<GriddedArray> {
                Ok(GriddedArray {
                    bands: vec!["I1".to_owned()],
                    data: Array3::zeros((1, 1, 1)),
                    crs: options.epsg_code.clone(),
                    resolution,
                    bbox: *bbox,
                })
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let spectral = tmp.path().join("a.hdf");
        let geo = tmp.path().join("b.nc");
        fs::write(&spectral, b"hdf").unwrap();
        fs::write(&geo, b"nc").unwrap();
        let files = [spectral, geo];
        let opts = LoadOptions::default();

        assert!(load_viirs(&files, &bbox(), 0.0, &opts, &RecordingRegridder::default()).is_err());
        assert!(load_viirs(&files, &bbox(), 0.004, &opts, &Lying).is_err());
    }

    #[test]
    fn test_interp_method_names() {
        assert_eq!("nearest".parse::<InterpMethod>().unwrap(), InterpMethod::Nearest);
        assert_eq!(InterpMethod::Linear.to_string(), "linear");
        assert!("cubic".parse::<InterpMethod>().is_err());
    }
}
