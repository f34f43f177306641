/*!
 * Derive timestamp keys from granule file names.
 *
 * Each product family encodes the acquisition time in its file names differently. The key for a
 * granule is pulled out of the file name of its primary data link, and a spectral granule and its
 * geolocation granule produce the same key when they come from the same acquisition.
 *
 * A link that does not have the expected shape is an error. Guessing a key would risk pairing
 * unrelated granules without anyone noticing.
 */

use crate::{error::LowResError, granule::Granule};

/// String derived from a file name that identifies an acquisition.
pub type TimestampKey = String;

/// Signature shared by all the timestamp parsers.
pub type ParseFn = fn(&Granule) -> Result<TimestampKey, LowResError>;

/**
 * VIIRS near real time products.
 *
 * File names look like `VNP09_NRT.A2024123.1200.002.2024123134512.hdf`. The key is the julian date
 * and the time fields joined, without the leading `A`, e.g. `20241231200`. Geolocation files
 * (`VNP03IMG.A2024123.1200...`) share those fields.
 */
pub fn viirs_nrt(g: &Granule) -> Result<TimestampKey, LowResError> {
    const EXPECTED: &str = "at least 3 '.' separated fields, the date after a one character prefix";

    let link = primary_link(g, EXPECTED)?;
    let fields: Vec<&str> = file_name(link).split('.').collect();

    match fields.get(1..3) {
        Some(&[date, time]) if date.len() > 1 && date.is_char_boundary(1) && !time.is_empty() => {
            let mut key = String::with_capacity(date.len() + time.len() - 1);
            key.push_str(&date[1..]);
            key.push_str(time);
            Ok(key)
        }
        _ => Err(malformed(link, EXPECTED)),
    }
}

/// Sentinel-3 OLCI near real time products, the second `.` separated field of the file name.
pub fn sen3_olci_nrt(g: &Granule) -> Result<TimestampKey, LowResError> {
    const EXPECTED: &str = "at least 2 '.' separated fields";

    let link = primary_link(g, EXPECTED)?;
    match file_name(link).split('.').nth(1) {
        Some(field) if !field.is_empty() => Ok(field.to_owned()),
        _ => Err(malformed(link, EXPECTED)),
    }
}

/**
 * Sentinel-3 SYN level 2 products.
 *
 * File names look like
 * `S3A_SY_2_SYN____20240102T101112_20240102T101412_20240103T194500_0179_043_136_2160_PS1_O_NT_002.zip`.
 * The padding after `SYN` is made of underscores, so the sensing start time is the eighth `_`
 * separated field.
 */
pub fn sen3_syn(g: &Granule) -> Result<TimestampKey, LowResError> {
    const EXPECTED: &str = "at least 8 '_' separated fields";

    let link = primary_link(g, EXPECTED)?;
    match file_name(link).split('_').nth(7) {
        Some(field) if !field.is_empty() => Ok(field.to_owned()),
        _ => Err(malformed(link, EXPECTED)),
    }
}

fn primary_link<'a>(g: &'a Granule, expected: &'static str) -> Result<&'a str, LowResError> {
    g.primary_link().ok_or_else(|| LowResError::MalformedIdentifier {
        link: format!("<granule {} has no data links>", g.id),
        expected,
    })
}

/// Last path segment of a link.
fn file_name(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

fn malformed(link: &str, expected: &'static str) -> LowResError {
    LowResError::MalformedIdentifier {
        link: link.to_owned(),
        expected,
    }
}
