use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use lowres::{
    BoundingBox, CmrCatalog, Downloader, EarthDataLoader, HttpDownloader, LowResResult,
    ProductRegistry, TimeRange,
};
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Find and download VIIRS and Sentinel-3 SYN surface reflectance granules.
///
/// Spectral granules are paired with their geolocation granules, granules without geolocation are
/// reported and skipped.
///
#[derive(Debug, Parser)]
#[clap(name = "lowres")]
#[clap(author, version, about)]
struct LowResOptions {
    /// Verbose output
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the known products matching the patterns.
    Products {
        /// Product patterns, shell style wildcards allowed.
        #[clap(default_value = "*")]
        patterns: Vec<String>,
    },

    /// Search the catalog and list the paired granules.
    Search(SearchArgs),

    /// Search the catalog, then download and extract the paired granules.
    Download {
        #[clap(flatten)]
        search: SearchArgs,

        /// Directory to put the downloaded files in.
        #[clap(short, long)]
        output_dir: PathBuf,

        /// Number of download threads.
        ///
        /// If this is not specified, the "LOWRES_THREADS" environment variable is checked, then
        /// the number of CPUs is used.
        #[clap(short, long)]
        #[clap(env = "LOWRES_THREADS")]
        threads: Option<usize>,

        /// NASA Earthdata bearer token.
        #[clap(long)]
        #[clap(env = "EARTHDATA_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Product patterns, e.g. VNP09_NRT or 'S3?_SY_2_SYN'. May be given more than once.
    #[clap(short, long, required = true)]
    product: Vec<String>,

    /// The start time (UTC) in the format YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
    #[clap(parse(try_from_str=parse_datetime))]
    start: DateTime<Utc>,

    /// The end time (UTC) in the format YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
    #[clap(parse(try_from_str=parse_datetime))]
    end: DateTime<Utc>,

    /// Bounding box as west,south,east,north
    #[clap(short, long, allow_hyphen_values = true)]
    bbox: BoundingBox,

    /// Base URL of the CMR search API.
    #[clap(long)]
    #[clap(env = "CMR_URL", default_value = CmrCatalog::DEFAULT_URL)]
    cmr_url: String,
}

impl Display for SearchArgs {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "    Products: {}", self.product.join(", "))?;
        writeln!(f, "       Start: {}", self.start)?;
        writeln!(f, "         End: {}", self.end)?;
        writeln!(f, "Bounding Box: {}", self.bbox)?;
        writeln!(f, "     Catalog: {}", self.cmr_url)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Parse a command line datetime, a bare date means midnight.
fn parse_datetime(dt_str: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    let naive = match NaiveDateTime::parse_from_str(dt_str, TIME_FORMAT) {
        Ok(naive) => naive,
        Err(_) => NaiveDateTime::parse_from_str(&format!("{}T00:00:00", dt_str), TIME_FORMAT)?,
    };

    Ok(Utc.from_utc_datetime(&naive))
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> LowResResult<()> {
    let opts = LowResOptions::parse();

    let crate_level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("lowres", crate_level)
        .init()?;

    match opts.command {
        Command::Products { patterns } => list_products(&patterns),
        Command::Search(search) => {
            let mut edl = loader(&search, Box::new(SearchOnly))?;
            let range = TimeRange::new(search.start, search.end);

            for tuple in edl.search(&range, &search.bbox)? {
                let ids: Vec<&str> = tuple.granules.granules().map(|g| g.id.as_str()).collect();
                println!("{} {:<14} {}", tuple.begin(), tuple.product.id, ids.join("  "));
            }

            Ok(())
        }
        Command::Download {
            search,
            output_dir,
            threads,
            token,
        } => {
            let threads = threads.unwrap_or_else(num_cpus::get);
            let downloader = HttpDownloader::new(threads, token)?;
            let mut edl = loader(&search, Box::new(downloader))?;
            let range = TimeRange::new(search.start, search.end);

            edl.search(&range, &search.bbox)?;
            for tuple in edl.download(&output_dir)? {
                let files: Vec<_> = tuple.files.iter().map(|f| f.display().to_string()).collect();
                println!("{} {:<14} {}", tuple.begin, tuple.product.id, files.join("  "));
            }

            Ok(())
        }
    }
}

fn list_products(patterns: &[String]) -> LowResResult<()> {
    let products = ProductRegistry::global().find(patterns)?;

    if products.is_empty() {
        log::warn!("No products match {}", patterns.join(", "));
    }

    for product in products {
        println!("{}", product);
    }

    Ok(())
}

fn loader(search: &SearchArgs, downloader: Box<dyn Downloader>) -> LowResResult<EarthDataLoader> {
    log::debug!("{}", search);

    let catalog = CmrCatalog::new(search.cmr_url.as_str())?;

    Ok(EarthDataLoader::new(
        &search.product,
        Box::new(catalog),
        downloader,
    )?)
}

/// Stands in for a downloader when only searching.
struct SearchOnly;

impl Downloader for SearchOnly {
    fn download(&self, links: &[String], _dest: &Path) -> LowResResult<Vec<PathBuf>> {
        Err(format!("not downloading {} files while only searching", links.len()).into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        assert_eq!(
            parse_datetime("2024-05-02").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("2024-05-02T13:45:10").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 2, 13, 45, 10).unwrap()
        );
        assert!(parse_datetime("May 2nd").is_err());
    }

    #[test]
    fn test_search_never_downloads() {
        let links = ["https://host/VNP09_NRT.A2024123.1200.002.hdf".to_owned()];
        assert!(SearchOnly.download(&links, Path::new(".")).is_err());
    }

    #[test]
    fn test_download_args() {
        let opts = LowResOptions::try_parse_from([
            "lowres",
            "download",
            "-p",
            "VNP09_NRT",
            "-p",
            "S3A_SY_2_SYN",
            "2024-05-01",
            "2024-05-02",
            "--bbox",
            "-10.5,40,-8,42",
            "-o",
            "/tmp/lowres",
            "-t",
            "3",
        ])
        .unwrap();

        match opts.command {
            Command::Download {
                search, threads, ..
            } => {
                assert_eq!(search.product, ["VNP09_NRT", "S3A_SY_2_SYN"]);
                assert_eq!(search.bbox.west, -10.5);
                assert_eq!(threads, Some(3));
            }
            _ => panic!("expected the download command"),
        }
    }
}
