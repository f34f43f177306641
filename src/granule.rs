/*!
 * Granules as returned by a catalog search, and the tuples they get grouped into.
 */

use chrono::{DateTime, Utc};

/**
 * A single remote data unit found by a catalog search.
 *
 * The crate never changes a granule after the catalog hands it over. It only reads the data links
 * to derive timestamp keys and the begin time to order results.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Granule {
    /// Catalog identifier, e.g. the CMR concept id or granule UR.
    pub id: String,
    /// Remote data links in catalog order. The first one names the primary data file.
    pub links: Vec<String>,
    /// Start of the temporal extent of the granule.
    pub begin: DateTime<Utc>,
}

impl Granule {
    pub fn new(id: impl Into<String>, links: Vec<String>, begin: DateTime<Utc>) -> Self {
        Granule {
            id: id.into(),
            links,
            begin,
        }
    }

    /// The primary data link, if the catalog provided any.
    pub fn primary_link(&self) -> Option<&str> {
        self.links.first().map(String::as_str)
    }
}

/// A spectral granule, optionally with the geolocation granule of the same acquisition.
#[derive(Debug, Clone, PartialEq)]
pub enum GranulePair {
    /// The product is self contained, no geolocation needed.
    Single(Granule),
    /// Spectral granule first, geolocation second.
    Paired(Granule, Granule),
}

impl GranulePair {
    /// The spectral granule.
    pub fn primary(&self) -> &Granule {
        match self {
            GranulePair::Single(g) => g,
            GranulePair::Paired(g, _) => g,
        }
    }

    /// The geolocation granule, if paired.
    pub fn geolocation(&self) -> Option<&Granule> {
        match self {
            GranulePair::Single(_) => None,
            GranulePair::Paired(_, geo) => Some(geo),
        }
    }

    /// Number of granules in the tuple, 1 or 2.
    pub fn arity(&self) -> usize {
        match self {
            GranulePair::Single(_) => 1,
            GranulePair::Paired(..) => 2,
        }
    }

    /// Iterate the granules in tuple order.
    pub fn granules(&self) -> impl Iterator<Item = &Granule> {
        std::iter::once(self.primary()).chain(self.geolocation())
    }
}

/// A closed time interval to search in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeRange { start, end }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn granule(id: &str) -> Granule {
        Granule::new(
            id,
            vec![format!("https://host/{}.nc", id)],
            Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_pair_accessors() {
        let single = GranulePair::Single(granule("a"));
        assert_eq!(single.arity(), 1);
        assert_eq!(single.primary().id, "a");
        assert!(single.geolocation().is_none());
        assert_eq!(single.granules().count(), 1);

        let paired = GranulePair::Paired(granule("b"), granule("c"));
        assert_eq!(paired.arity(), 2);
        let ids: Vec<_> = paired.granules().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn test_primary_link() {
        let g = granule("a");
        assert_eq!(g.primary_link(), Some("https://host/a.nc"));

        let empty = Granule::new("empty", vec![], g.begin);
        assert_eq!(empty.primary_link(), None);
    }
}
