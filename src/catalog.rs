/*!
 * Granule search.
 *
 * The loaders only depend on the [Catalog] trait. [CmrCatalog] implements it against the NASA
 * Common Metadata Repository granule search.
 */

use crate::{
    error::LowResResult,
    geo::BoundingBox,
    granule::{Granule, TimeRange},
};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Something that can find granules of a product.
pub trait Catalog {
    /// Find the granules of `product_id` overlapping the time range and area, in catalog order.
    fn search(
        &self,
        product_id: &str,
        range: &TimeRange,
        bbox: &BoundingBox,
    ) -> LowResResult<Vec<Granule>>;
}

/// Client for the CMR `granules.umm_json` search endpoint.
pub struct CmrCatalog {
    client: Client,
    base_url: String,
    page_size: usize,
}

impl CmrCatalog {
    pub const DEFAULT_URL: &'static str = "https://cmr.earthdata.nasa.gov/search";

    const SEARCH_AFTER: &'static str = "CMR-Search-After";

    /// Create a client for the CMR instance at `base_url`, e.g. [CmrCatalog::DEFAULT_URL].
    pub fn new(base_url: impl Into<String>) -> LowResResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("lowres/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(CmrCatalog {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            page_size: 2000,
        })
    }

    /// Query string parameters for a search.
    fn query_params(
        &self,
        product_id: &str,
        range: &TimeRange,
        bbox: &BoundingBox,
    ) -> Vec<(&'static str, String)> {
        const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

        let mut params = vec![
            ("short_name", product_id.to_owned()),
            (
                "temporal",
                format!(
                    "{},{}",
                    range.start.format(TIME_FORMAT),
                    range.end.format(TIME_FORMAT)
                ),
            ),
            ("bounding_box", bbox.to_string()),
            ("page_size", self.page_size.to_string()),
            ("sort_key", "start_date".to_owned()),
        ];

        if product_id.contains(['*', '?']) {
            params.push(("options[short_name][pattern]", "true".to_owned()));
        }

        params
    }
}

impl Catalog for CmrCatalog {
    fn search(
        &self,
        product_id: &str,
        range: &TimeRange,
        bbox: &BoundingBox,
    ) -> LowResResult<Vec<Granule>> {
        let url = format!("{}/granules.umm_json", self.base_url);
        let params = self.query_params(product_id, range, bbox);

        let mut granules = vec![];
        let mut search_after: Option<String> = None;
        loop {
            let mut request = self.client.get(&url).query(&params);
            if let Some(ref token) = search_after {
                request = request.header(Self::SEARCH_AFTER, token);
            }

            let response = request.send()?.error_for_status()?;
            search_after = response
                .headers()
                .get(Self::SEARCH_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            let page = granules_from_umm(&response.text()?)?;
            let page_len = page.len();
            log::debug!("{} granules in page for {}", page_len, product_id);
            granules.extend(page);

            if page_len < self.page_size || search_after.is_none() {
                break;
            }
        }

        log::info!("found {} granules for {}", granules.len(), product_id);
        Ok(granules)
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                     UMM JSON decoding
 *-----------------------------------------------------------------------------------------------*/
#[derive(Debug, Deserialize)]
struct UmmResponse {
    #[serde(default)]
    items: Vec<UmmItem>,
}

#[derive(Debug, Deserialize)]
struct UmmItem {
    meta: UmmMeta,
    umm: Umm,
}

#[derive(Debug, Deserialize)]
struct UmmMeta {
    #[serde(rename = "concept-id")]
    concept_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Umm {
    #[serde(rename = "GranuleUR")]
    granule_ur: Option<String>,
    #[serde(default)]
    related_urls: Vec<RelatedUrl>,
    temporal_extent: Option<TemporalExtent>,
}

#[derive(Debug, Deserialize)]
struct RelatedUrl {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TemporalExtent {
    range_date_time: Option<RangeDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RangeDateTime {
    beginning_date_time: DateTime<Utc>,
}

/**
 * Decode a page of CMR UMM JSON results.
 *
 * Data links are the related URLs of type `GET DATA`. Items without a begin time cannot be
 * ordered and are skipped with a warning.
 */
fn granules_from_umm(body: &str) -> LowResResult<Vec<Granule>> {
    let response: UmmResponse = serde_json::from_str(body)?;

    let granules = response
        .items
        .into_iter()
        .filter_map(|item| {
            let UmmItem { meta, umm } = item;

            let begin = match umm.temporal_extent.and_then(|t| t.range_date_time) {
                Some(range) => range.beginning_date_time,
                None => {
                    log::warn!("skipping granule {} without a begin time", meta.concept_id);
                    return None;
                }
            };

            let links = umm
                .related_urls
                .into_iter()
                .filter(|u| u.kind == "GET DATA")
                .map(|u| u.url)
                .collect();

            let id = umm.granule_ur.unwrap_or(meta.concept_id);
            Some(Granule::new(id, links, begin))
        })
        .collect();

    Ok(granules)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    const PAGE: &str = r#"{
        "hits": 2,
        "took": 41,
        "items": [
            {
                "meta": {"concept-id": "G1000-LANCEMODIS", "provider-id": "LANCEMODIS"},
                "umm": {
                    "GranuleUR": "VNP09_NRT.A2024123.1200.002",
                    "TemporalExtent": {
                        "RangeDateTime": {
                            "BeginningDateTime": "2024-05-02T12:00:00.000Z",
                            "EndingDateTime": "2024-05-02T12:06:00.000Z"
                        }
                    },
                    "RelatedUrls": [
                        {"URL": "https://host/VNP09_NRT.A2024123.1200.002.hdf", "Type": "GET DATA"},
                        {"URL": "https://host/browse.jpg", "Type": "GET RELATED VISUALIZATION"}
                    ]
                }
            },
            {
                "meta": {"concept-id": "G1001-LANCEMODIS"},
                "umm": {
                    "RelatedUrls": [
                        {"URL": "https://host/VNP09_NRT.A2024123.1206.002.hdf", "Type": "GET DATA"}
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn test_granules_from_umm() {
        let granules = granules_from_umm(PAGE).unwrap();

        assert_eq!(granules.len(), 1);
        let g = &granules[0];
        assert_eq!(g.id, "VNP09_NRT.A2024123.1200.002");
        assert_eq!(g.links, ["https://host/VNP09_NRT.A2024123.1200.002.hdf"]);
        assert_eq!(g.begin, Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_granules_from_umm_empty_and_garbage() {
        assert!(granules_from_umm(r#"{"hits": 0, "items": []}"#)
            .unwrap()
            .is_empty());
        assert!(granules_from_umm("<html>Service Unavailable</html>").is_err());
    }

    fn param<'a>(params: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_query_params() {
        let cmr = CmrCatalog::new("https://cmr.example.com/search/").unwrap();
        assert_eq!(cmr.base_url, "https://cmr.example.com/search");

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 3, 6, 30, 0).unwrap(),
        );
        let bbox = BoundingBox::new(10.0, 45.0, 12.5, 46.0).unwrap();

        let params = cmr.query_params("VNP09_NRT", &range, &bbox);
        assert_eq!(param(&params, "short_name"), Some("VNP09_NRT"));
        assert_eq!(
            param(&params, "temporal"),
            Some("2024-05-01T00:00:00Z,2024-05-03T06:30:00Z")
        );
        assert_eq!(param(&params, "bounding_box"), Some("10,45,12.5,46"));
        assert_eq!(param(&params, "options[short_name][pattern]"), None);

        let params = cmr.query_params("S3*_SY_2_SYN", &range, &bbox);
        assert_eq!(param(&params, "options[short_name][pattern]"), Some("true"));
    }
}
