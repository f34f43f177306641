/*!
 * The loader ties everything together.
 *
 * It resolves product patterns, searches the catalog for spectral and geolocation granules, pairs
 * them, downloads the files in a single batch, and loads each file tuple onto a grid.
 */

use crate::{
    catalog::Catalog,
    download::Downloader,
    error::LowResError,
    geo::BoundingBox,
    granule::{Granule, GranulePair, TimeRange},
    grid::{GriddedArray, LoadOptions, Regridder},
    pairing::{self, UnmatchedInfo},
    product::ProductDescriptor,
    registry::{Patterns, ProductRegistry},
};
use chrono::{DateTime, Utc};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// A searched granule tuple together with the product it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTuple {
    pub product: ProductDescriptor,
    pub granules: GranulePair,
}

impl RemoteTuple {
    /// Begin time of the spectral granule.
    pub fn begin(&self) -> DateTime<Utc> {
        self.granules.primary().begin
    }
}

/// The downloaded (and extracted) files of one [RemoteTuple].
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTuple {
    pub product: ProductDescriptor,
    pub begin: DateTime<Utc>,
    /// Files of every granule in the tuple, spectral granule first.
    pub files: Vec<PathBuf>,
}

/**
 * Search, download, and load granules of one or more products.
 *
 * ```no_run
 * use lowres::{BoundingBox, CmrCatalog, EarthDataLoader, HttpDownloader, TimeRange};
 * # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
 * let catalog = CmrCatalog::new(CmrCatalog::DEFAULT_URL)?;
 * let downloader = HttpDownloader::new(4, std::env::var("EARTHDATA_TOKEN").ok())?;
 *
 * let mut edl = EarthDataLoader::new("VNP09_NRT", Box::new(catalog), Box::new(downloader))?;
 *
 * let range = TimeRange::new("2024-05-01T00:00:00Z".parse()?, "2024-05-03T00:00:00Z".parse()?);
 * let bbox = BoundingBox::new(10.0, 45.0, 12.0, 46.0)?;
 * edl.search(&range, &bbox)?;
 * edl.download("data".as_ref())?;
 * # Ok(())
 * # }
 * ```
 */
pub struct EarthDataLoader {
    products: Vec<ProductDescriptor>,
    catalog: Box<dyn Catalog>,
    downloader: Box<dyn Downloader>,
    remote: Option<Vec<RemoteTuple>>,
    unmatched: Vec<UnmatchedInfo>,
    local: Option<Vec<LocalTuple>>,
}

/// Match patterns against a registry, failing if nothing matched.
pub fn resolve<'a, P>(
    registry: &ProductRegistry,
    patterns: P,
) -> Result<Vec<ProductDescriptor>, LowResError>
where
    P: Into<Patterns<'a>>,
{
    let patterns = patterns.into();
    let products = registry.find(patterns.clone())?;

    if products.is_empty() {
        return Err(LowResError::NoProductAvailable(patterns.to_string()));
    }

    Ok(products)
}

impl EarthDataLoader {
    /// Create a loader for the built in products matching `patterns`.
    pub fn new<'a, P>(
        patterns: P,
        catalog: Box<dyn Catalog>,
        downloader: Box<dyn Downloader>,
    ) -> Result<Self, LowResError>
    where
        P: Into<Patterns<'a>>,
    {
        Self::with_registry(ProductRegistry::global(), patterns, catalog, downloader)
    }

    /// Create a loader for the products of `registry` matching `patterns`.
    pub fn with_registry<'a, P>(
        registry: &ProductRegistry,
        patterns: P,
        catalog: Box<dyn Catalog>,
        downloader: Box<dyn Downloader>,
    ) -> Result<Self, LowResError>
    where
        P: Into<Patterns<'a>>,
    {
        let products = resolve(registry, patterns)?;

        Ok(EarthDataLoader {
            products,
            catalog,
            downloader,
            remote: None,
            unmatched: vec![],
            local: None,
        })
    }

    /// The products this loader works on.
    pub fn products(&self) -> &[ProductDescriptor] {
        &self.products
    }

    /// Results of the last search, `None` before the first one.
    pub fn remote(&self) -> Option<&[RemoteTuple]> {
        self.remote.as_deref()
    }

    /// Spectral granules the last search dropped for lack of geolocation.
    pub fn unmatched(&self) -> &[UnmatchedInfo] {
        &self.unmatched
    }

    /// Results of the last download, `None` before the first one.
    pub fn local(&self) -> Option<&[LocalTuple]> {
        self.local.as_deref()
    }

    /**
     * Search the catalog for all products and pair up the granules.
     *
     * The tuples of all products are merged and ordered by the begin time of their spectral
     * granule. Granules without geolocation are logged, left out, and available from
     * [unmatched](EarthDataLoader::unmatched). Any earlier download results are discarded.
     */
    pub fn search(
        &mut self,
        range: &TimeRange,
        bbox: &BoundingBox,
    ) -> Result<&[RemoteTuple], LowResError> {
        let mut remote: Vec<RemoteTuple> = vec![];
        let mut unmatched: Vec<UnmatchedInfo> = vec![];

        for product in &self.products {
            let spectral = self.search_one(product.id, range, bbox)?;

            let geolocation = match product.geo_id {
                Some(geo_id) => Some(self.search_one(geo_id, range, bbox)?),
                None => None,
            };

            let pairing = pairing::pair(&spectral, geolocation.as_deref(), product.parse)?;

            for info in &pairing.unmatched {
                log::warn!("skip granule: {}", info.to_error());
            }
            log::info!(
                "{}: {} granule tuples, {} without geolocation",
                product.id,
                pairing.pairs.len(),
                pairing.unmatched.len()
            );

            remote.extend(pairing.pairs.into_iter().map(|granules| RemoteTuple {
                product: *product,
                granules,
            }));
            unmatched.extend(pairing.unmatched);
        }

        remote.sort_by_key(RemoteTuple::begin);

        self.unmatched = unmatched;
        self.local = None;
        Ok(self.remote.insert(remote).as_slice())
    }

    fn search_one(
        &self,
        product_id: &str,
        range: &TimeRange,
        bbox: &BoundingBox,
    ) -> Result<Vec<Granule>, LowResError> {
        self.catalog
            .search(product_id, range, bbox)
            .map_err(|err| LowResError::Catalog {
                product_id: product_id.to_owned(),
                msg: err.to_string(),
            })
    }

    /**
     * Download all searched granules into `output_dir`.
     *
     * Every data link of every granule goes to the downloader in one batch. The returned files
     * are regrouped into tuples matching the searched ones and run through the archive extraction
     * of their product.
     */
    pub fn download(&mut self, output_dir: &Path) -> Result<&[LocalTuple], LowResError> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(LowResError::NotReady("search for granules before downloading"))?;

        fs::create_dir_all(output_dir).map_err(|err| {
            LowResError::Download(format!("creating {}: {}", output_dir.display(), err))
        })?;

        let links: Vec<String> = remote
            .iter()
            .flat_map(|t| t.granules.granules())
            .flat_map(|g| g.links.iter().cloned())
            .collect();

        log::info!("downloading {} files to {}", links.len(), output_dir.display());
        let paths = self
            .downloader
            .download(&links, output_dir)
            .map_err(|err| LowResError::Download(err.to_string()))?;

        if paths.len() != links.len() {
            return Err(LowResError::DownloadCountMismatch {
                expected: links.len(),
                actual: paths.len(),
            });
        }

        let mut paths = paths.into_iter();
        let mut local = Vec::with_capacity(remote.len());
        for tuple in remote {
            let mut files = vec![];
            for granule in tuple.granules.granules() {
                if granule.links.is_empty() {
                    log::warn!("granule {} has no data links", granule.id);
                }

                for path in paths.by_ref().take(granule.links.len()) {
                    let file = (tuple.product.unzip)(&path).map_err(|err| {
                        LowResError::Extraction {
                            path: path.clone(),
                            msg: err.to_string(),
                        }
                    })?;
                    files.push(file);
                }
            }

            local.push(LocalTuple {
                product: tuple.product,
                begin: tuple.begin(),
                files,
            });
        }

        Ok(self.local.insert(local).as_slice())
    }

    /**
     * Load every downloaded tuple onto a grid.
     *
     * One result per tuple, in download order. A tuple that fails to load is logged and reported
     * as [LowResError::LoadFailure] in its slot, the remaining tuples are still loaded.
     */
    pub fn load(
        &self,
        bbox: &BoundingBox,
        resolution: f64,
        options: &LoadOptions,
        regridder: &dyn Regridder,
    ) -> Result<Vec<Result<GriddedArray, LowResError>>, LowResError> {
        let local = self
            .local
            .as_ref()
            .ok_or(LowResError::NotReady("download granules before loading"))?;

        let results: Vec<_> = local
            .iter()
            .enumerate()
            .map(|(index, tuple)| {
                (tuple.product.load)(&tuple.files, bbox, resolution, options, regridder).map_err(
                    |err| {
                        let err = LowResError::LoadFailure {
                            index,
                            msg: err.to_string(),
                        };
                        log::warn!("{} ({})", err, tuple.product.id);
                        err
                    },
                )
            })
            .collect();

        let nfailed = results.iter().filter(|r| r.is_err()).count();
        log::info!("loaded {} of {} tuples", results.len() - nfailed, results.len());

        Ok(results)
    }
}
