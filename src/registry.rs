/*!
 * Look up product descriptors by pattern.
 *
 * Patterns are shell style globs (`*` any run of characters, `?` a single character) and are
 * compared without regard to case against both the id and the name of each descriptor.
 */

use crate::{error::LowResError, product::ProductDescriptor, product::BUILTIN_PRODUCTS};
use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;

static GLOBAL_REGISTRY: Lazy<ProductRegistry> =
    Lazy::new(|| ProductRegistry::new(BUILTIN_PRODUCTS));

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// One or many product patterns, or none at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patterns<'a> {
    Absent,
    One(&'a str),
    Many(Vec<&'a str>),
}

impl<'a> Patterns<'a> {
    fn validated(&self) -> Result<Vec<&'a str>, LowResError> {
        let patterns = match self {
            Patterns::Absent => {
                return Err(LowResError::InvalidPattern("no patterns given".to_owned()))
            }
            Patterns::One(p) => vec![*p],
            Patterns::Many(ps) if ps.is_empty() => {
                return Err(LowResError::InvalidPattern(
                    "empty list of patterns".to_owned(),
                ))
            }
            Patterns::Many(ps) => ps.clone(),
        };

        if patterns.iter().any(|p| p.is_empty()) {
            return Err(LowResError::InvalidPattern("empty pattern".to_owned()));
        }

        Ok(patterns)
    }
}

impl<'a> std::fmt::Display for Patterns<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Patterns::Absent => write!(f, "<none>"),
            Patterns::One(p) => write!(f, "{}", p),
            Patterns::Many(ps) => write!(f, "{}", ps.join(", ")),
        }
    }
}

impl<'a> From<&'a str> for Patterns<'a> {
    fn from(p: &'a str) -> Self {
        Patterns::One(p)
    }
}

impl<'a> From<&'a String> for Patterns<'a> {
    fn from(p: &'a String) -> Self {
        Patterns::One(p.as_str())
    }
}

impl<'a> From<&'a [&'a str]> for Patterns<'a> {
    fn from(ps: &'a [&'a str]) -> Self {
        Patterns::Many(ps.to_vec())
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for Patterns<'a> {
    fn from(ps: [&'a str; N]) -> Self {
        Patterns::Many(ps.to_vec())
    }
}

impl<'a> From<Vec<&'a str>> for Patterns<'a> {
    fn from(ps: Vec<&'a str>) -> Self {
        Patterns::Many(ps)
    }
}

impl<'a> From<&'a [String]> for Patterns<'a> {
    fn from(ps: &'a [String]) -> Self {
        Patterns::Many(ps.iter().map(String::as_str).collect())
    }
}

impl<'a> From<&'a Vec<String>> for Patterns<'a> {
    fn from(ps: &'a Vec<String>) -> Self {
        Patterns::from(ps.as_slice())
    }
}

impl<'a, T> From<Option<T>> for Patterns<'a>
where
    T: Into<Patterns<'a>>,
{
    fn from(ps: Option<T>) -> Self {
        ps.map(Into::into).unwrap_or(Patterns::Absent)
    }
}

/// What to do with a descriptor matched by more than one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    /// Report it once per matching pattern.
    Keep,
    /// Report it only at its first match.
    Remove,
}

/// A read only, ordered set of product descriptors.
#[derive(Debug, Clone)]
pub struct ProductRegistry {
    products: Vec<ProductDescriptor>,
}

impl ProductRegistry {
    /// Build a registry, descriptors are enumerated in the order given.
    pub fn new(products: &[ProductDescriptor]) -> Self {
        ProductRegistry {
            products: products.to_vec(),
        }
    }

    /// The registry of all built in products. Built on first use.
    pub fn global() -> &'static ProductRegistry {
        &GLOBAL_REGISTRY
    }

    /// All descriptors in enumeration order.
    pub fn products(&self) -> &[ProductDescriptor] {
        &self.products
    }

    /**
     * Find the descriptors matching the patterns.
     *
     * The matches for each pattern are concatenated in pattern order. A descriptor matched by
     * several patterns shows up once for each of them. A pattern that matches nothing contributes
     * nothing, it is not an error.
     *
     * Fails with [LowResError::InvalidPattern] if there are no patterns, any pattern is empty, or
     * a pattern is not a valid glob.
     */
    pub fn find<'a, P>(&self, patterns: P) -> Result<Vec<ProductDescriptor>, LowResError>
    where
        P: Into<Patterns<'a>>,
    {
        self.find_with(patterns, Duplicates::Keep)
    }

    /// Same as [find](ProductRegistry::find), with a choice about repeated matches.
    pub fn find_with<'a, P>(
        &self,
        patterns: P,
        duplicates: Duplicates,
    ) -> Result<Vec<ProductDescriptor>, LowResError>
    where
        P: Into<Patterns<'a>>,
    {
        let patterns = patterns.into().validated()?;

        let mut found: Vec<ProductDescriptor> = Vec::new();
        for pattern in patterns {
            let glob = Pattern::new(pattern)
                .map_err(|err| LowResError::InvalidPattern(format!("`{}`: {}", pattern, err)))?;

            for product in &self.products {
                if !(glob.matches_with(product.id, MATCH_OPTIONS)
                    || glob.matches_with(product.name, MATCH_OPTIONS))
                {
                    continue;
                }

                if duplicates == Duplicates::Remove && found.contains(product) {
                    continue;
                }

                log::debug!("pattern `{}` matched {}", pattern, product.id);
                found.push(*product);
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::product;

    #[test]
    fn test_global_registry() {
        let reg = ProductRegistry::global();
        assert_eq!(reg.products().len(), product::BUILTIN_PRODUCTS.len());

        assert_eq!(reg.find("vnp09_nrt").unwrap(), [product::VIIRS]);
        assert_eq!(reg.find("viirsproduct").unwrap(), [product::VIIRS]);
    }

    #[test]
    fn test_sentinel3_family_pattern() {
        let reg = ProductRegistry::global();

        // The family descriptor has the pattern as its id, so it matches too.
        let found = reg.find("S3*_SY_2_SYN").unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            [
                "S3*_SY_2_SYN",
                "S3A_SY_2_SYN",
                "S3B_SY_2_SYN",
                "S3C_SY_2_SYN",
                "S3D_SY_2_SYN"
            ]
        );

        assert_eq!(reg.find("s3a_sy_2_syn").unwrap(), [product::SENTINEL3A_SYN]);
        assert_eq!(
            reg.find("Sentinel3?SYNProduct").unwrap(),
            [
                product::SENTINEL3A_SYN,
                product::SENTINEL3B_SYN,
                product::SENTINEL3C_SYN,
                product::SENTINEL3D_SYN
            ]
        );
    }

    #[test]
    fn test_duplicates() {
        let reg = ProductRegistry::global();

        let kept = reg.find(["VNP*", "VIIRS*"]).unwrap();
        assert_eq!(kept, [product::VIIRS, product::VIIRS]);

        let removed = reg
            .find_with(["VNP*", "VIIRS*"], Duplicates::Remove)
            .unwrap();
        assert_eq!(removed, [product::VIIRS]);
    }

    #[test]
    fn test_bad_glob() {
        let reg = ProductRegistry::global();
        assert!(matches!(
            reg.find("S3[A"),
            Err(LowResError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_patterns_from() {
        let owned = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(Patterns::from(&owned), Patterns::Many(vec!["a", "b"]));
        assert_eq!(Patterns::from(None::<&str>), Patterns::Absent);
        assert_eq!(Patterns::from(Some("a")), Patterns::One("a"));
        assert_eq!(Patterns::from(["a", "b"]).to_string(), "a, b");
    }
}
