/*!
 * Join spectral granules with their geolocation granules.
 */

use crate::{
    error::LowResError,
    granule::{Granule, GranulePair},
    parse::{ParseFn, TimestampKey},
};
use rustc_hash::FxHashMap as HashMap;

/// A spectral granule that was dropped because no geolocation granule had its timestamp key.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedInfo {
    pub key: TimestampKey,
    pub granule: Granule,
}

impl UnmatchedInfo {
    /// The report as an error value, for logging or surfacing to a caller.
    pub fn to_error(&self) -> LowResError {
        LowResError::UnmatchedGeolocation {
            key: self.key.clone(),
            granule: self.granule.id.clone(),
        }
    }
}

/// Output of [pair].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairing {
    /// Pairs in the order of the spectral granules they were built from.
    pub pairs: Vec<GranulePair>,
    /// Spectral granules left out of `pairs`, in input order.
    pub unmatched: Vec<UnmatchedInfo>,
}

/**
 * Pair spectral granules with geolocation granules by timestamp key.
 *
 * With `geolocation` set to `None` the product needs no geolocation and every spectral granule is
 * returned on its own, without parsing anything.
 *
 * Otherwise every geolocation granule is keyed with `parse`. If two of them produce the same key
 * the later one wins, catalogs are expected to be de-duplicated already. Spectral granules are
 * then looked up in input order. Those without a geolocation granule are reported in
 * [Pairing::unmatched] and left out of the pairs, that is not an error.
 *
 * The only failure is a granule whose link `parse` cannot handle.
 */
pub fn pair(
    spectral: &[Granule],
    geolocation: Option<&[Granule]>,
    parse: ParseFn,
) -> Result<Pairing, LowResError> {
    let geolocation = match geolocation {
        Some(geo) => geo,
        None => {
            return Ok(Pairing {
                pairs: spectral.iter().cloned().map(GranulePair::Single).collect(),
                unmatched: vec![],
            })
        }
    };

    let mut by_key: HashMap<TimestampKey, &Granule> = HashMap::default();
    by_key.reserve(geolocation.len());
    for geo in geolocation {
        let key = parse(geo)?;
        if let Some(prev) = by_key.insert(key, geo) {
            log::debug!("geolocation granule {} replaced by {}", prev.id, geo.id);
        }
    }

    let mut pairing = Pairing::default();
    for granule in spectral {
        let key = parse(granule)?;
        match by_key.get(&key) {
            Some(geo) => pairing
                .pairs
                .push(GranulePair::Paired(granule.clone(), (*geo).clone())),
            None => pairing.unmatched.push(UnmatchedInfo {
                key,
                granule: granule.clone(),
            }),
        }
    }

    Ok(pairing)
}
