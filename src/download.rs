/*!
 * Batch downloads.
 *
 * The loaders hand a whole batch of links to a [Downloader] in one call so that the implementation
 * can share connections and threads across all of them. The result must line up with the input
 * link for link, the loaders rely on that to regroup the files.
 */

use crate::error::{LowResError, LowResResult};
use crossbeam_channel::{bounded, unbounded};
use reqwest::blocking::Client;
use rustc_hash::FxHashMap as HashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

/// Something that can fetch a batch of remote files into a directory.
pub trait Downloader {
    /**
     * Download every link into `dest`.
     *
     * On success there is exactly one local path per link, in link order. If anything goes wrong
     * the whole batch fails.
     */
    fn download(&self, links: &[String], dest: &Path) -> LowResResult<Vec<PathBuf>>;
}

/// Downloads over HTTP(S) with a pool of worker threads.
///
/// Files already present in the destination directory are not downloaded again.
pub struct HttpDownloader {
    client: Client,
    threads: usize,
    token: Option<String>,
}

const CHANNEL_SIZE: usize = 100;

impl HttpDownloader {
    /// Create a downloader using `threads` workers, sending `token` as a bearer token if given.
    pub fn new(threads: usize, token: Option<String>) -> LowResResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("lowres/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpDownloader {
            client,
            threads: threads.max(1),
            token,
        })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, links: &[String], dest: &Path) -> LowResResult<Vec<PathBuf>> {
        fs::create_dir_all(dest)?;

        let batch = Batch::new(links, dest)?;

        let (to_workers, from_main) = bounded::<(usize, String, PathBuf)>(CHANNEL_SIZE);
        let (to_main, from_workers) = unbounded::<(usize, Result<(), String>)>();

        let nthreads = self.threads.min(batch.jobs.len().max(1));
        let mut workers = Vec::with_capacity(nthreads);
        for i in 0..nthreads {
            let jobs = from_main.clone();
            let results = to_main.clone();
            let client = self.client.clone();
            let token = self.token.clone();

            let jh = thread::Builder::new()
                .name(format!("lowres-download-{}", i))
                .spawn(move || {
                    for (idx, link, target) in jobs {
                        let res = fetch(&client, token.as_deref(), &link, &target)
                            .map_err(|err| format!("{}: {}", link, err));
                        if results.send((idx, res)).is_err() {
                            break;
                        }
                    }
                })?;
            workers.push(jh);
        }
        drop(from_main);
        drop(to_main);

        for (idx, (link, target)) in batch.jobs.iter().enumerate() {
            if to_workers
                .send((idx, link.clone(), target.clone()))
                .is_err()
            {
                break;
            }
        }
        drop(to_workers);

        let mut done = vec![false; batch.jobs.len()];
        let mut failures = vec![];
        for (idx, res) in from_workers {
            match res {
                Ok(()) => done[idx] = true,
                Err(msg) => {
                    log::error!("download failed {}", msg);
                    failures.push(msg);
                }
            }
        }

        for jh in workers {
            if jh.join().is_err() {
                failures.push("download worker panicked".to_owned());
            }
        }

        if !failures.is_empty() {
            return Err(LowResError::Download(failures.join("; ")).into());
        }
        if let Some(idx) = done.iter().position(|d| !d) {
            let link = &batch.jobs[idx].0;
            return Err(LowResError::Download(format!("no result for {}", link)).into());
        }

        Ok(batch.paths())
    }
}

/**
 * The distinct files of a batch.
 *
 * Links that land on the same local file are fetched once, by the first of them. Every input link
 * still gets its own entry in the output.
 */
#[derive(Debug)]
struct Batch {
    /// One `(link, target)` per distinct target, in first seen order.
    jobs: Vec<(String, PathBuf)>,
    /// Index into `jobs` for every input link.
    job_of: Vec<usize>,
}

impl Batch {
    fn new(links: &[String], dest: &Path) -> Result<Self, LowResError> {
        let mut jobs: Vec<(String, PathBuf)> = Vec::with_capacity(links.len());
        let mut job_of = Vec::with_capacity(links.len());
        let mut by_target: HashMap<PathBuf, usize> = HashMap::default();

        for link in links {
            let target = dest.join(local_name(link)?);

            let idx = match by_target.get(&target) {
                Some(&idx) => {
                    if jobs[idx].0 != *link {
                        log::warn!(
                            "{} and {} share the file {}, fetching only the first",
                            jobs[idx].0,
                            link,
                            target.display()
                        );
                    }
                    idx
                }
                None => {
                    by_target.insert(target.clone(), jobs.len());
                    jobs.push((link.clone(), target));
                    jobs.len() - 1
                }
            };
            job_of.push(idx);
        }

        Ok(Batch { jobs, job_of })
    }

    /// Local path for every input link, in input order.
    fn paths(&self) -> Vec<PathBuf> {
        self.job_of
            .iter()
            .map(|&idx| self.jobs[idx].1.clone())
            .collect()
    }
}

/// File name for a link, the last path segment without query or fragment.
fn local_name(link: &str) -> Result<String, LowResError> {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_owned()),
        _ => Err(LowResError::Download(format!(
            "cannot derive a file name from {}",
            link
        ))),
    }
}

fn fetch(client: &Client, token: Option<&str>, link: &str, target: &Path) -> LowResResult<()> {
    if target.metadata().map(|md| md.len() > 0).unwrap_or(false) {
        log::debug!("{} already downloaded", target.display());
        return Ok(());
    }

    let mut request = client.get(link);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let mut response = request.send()?.error_for_status()?;

    // Partial downloads never sit at the final path.
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);
    let mut f = fs::File::create(&partial)?;
    let nbytes = response.copy_to(&mut f)?;
    drop(f);
    fs::rename(&partial, target)?;

    log::debug!("downloaded {} ({} bytes)", target.display(), nbytes);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(
            local_name("https://host/a/b/VNP09_NRT.A2024123.1200.002.hdf").unwrap(),
            "VNP09_NRT.A2024123.1200.002.hdf"
        );
        assert_eq!(
            local_name("https://host/a/S3A_SY_2_SYN.zip?token=abc#frag").unwrap(),
            "S3A_SY_2_SYN.zip"
        );
        assert!(local_name("https://host/a/").is_err());
    }

    #[test]
    fn test_existing_files_are_not_fetched() {
        let tmp = tempfile::tempdir().unwrap();
        let links = vec![
            "https://invalid.example/one.hdf".to_owned(),
            "https://invalid.example/two.nc".to_owned(),
        ];
        fs::write(tmp.path().join("one.hdf"), b"1").unwrap();
        fs::write(tmp.path().join("two.nc"), b"2").unwrap();

        let downloader = HttpDownloader::new(4, None).unwrap();
        let paths = downloader.download(&links, tmp.path()).unwrap();

        assert_eq!(
            paths,
            [tmp.path().join("one.hdf"), tmp.path().join("two.nc")]
        );
    }

    #[test]
    fn test_batch_fetches_repeated_links_once() {
        let dest = Path::new("/data");
        let links = vec![
            "https://host/a/S3A_SY_2_SYN.zip".to_owned(),
            "https://host/b/VNP09_NRT.hdf".to_owned(),
            "https://host/a/S3A_SY_2_SYN.zip".to_owned(),
            "https://mirror/S3A_SY_2_SYN.zip?x=1".to_owned(),
        ];

        let batch = Batch::new(&links, dest).unwrap();
        assert_eq!(
            batch.jobs,
            [
                (links[0].clone(), dest.join("S3A_SY_2_SYN.zip")),
                (links[1].clone(), dest.join("VNP09_NRT.hdf")),
            ]
        );
        assert_eq!(batch.job_of, [0, 1, 0, 0]);
        assert_eq!(
            batch.paths(),
            [
                dest.join("S3A_SY_2_SYN.zip"),
                dest.join("VNP09_NRT.hdf"),
                dest.join("S3A_SY_2_SYN.zip"),
                dest.join("S3A_SY_2_SYN.zip"),
            ]
        );
    }

    #[test]
    fn test_repeated_links_keep_their_slots() {
        let tmp = tempfile::tempdir().unwrap();
        let link = "https://invalid.example/S3A_SY_2_SYN.zip".to_owned();
        fs::write(tmp.path().join("S3A_SY_2_SYN.zip"), b"PK").unwrap();

        let downloader = HttpDownloader::new(2, None).unwrap();
        let paths = downloader
            .download(&[link.clone(), link], tmp.path())
            .unwrap();

        let expected = tmp.path().join("S3A_SY_2_SYN.zip");
        assert_eq!(paths, [expected.clone(), expected]);
    }

    #[test]
    fn test_empty_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = HttpDownloader::new(2, None).unwrap();
        assert!(downloader.download(&[], tmp.path()).unwrap().is_empty());
    }
}
