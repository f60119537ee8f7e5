//! Delaware counties and the cities that belong to them
//!
//! The dataset only carries a city column, so a county selection is expanded
//! into a city-set predicate through this map. Each city is assigned to
//! exactly one county; towns that straddle a county line (Milford, Smyrna,
//! Clayton) are listed under Kent, where their municipal seat is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Delaware county
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum County {
    Sussex,
    Kent,
    #[serde(rename = "New Castle")]
    NewCastle,
}

impl County {
    pub const ALL: [County; 3] = [County::Sussex, County::Kent, County::NewCastle];

    /// Display name as it appears in the selection buttons
    pub fn name(&self) -> &'static str {
        match self {
            County::Sussex => "Sussex",
            County::Kent => "Kent",
            County::NewCastle => "New Castle",
        }
    }

    /// Cities served by this county
    pub fn cities(&self) -> &'static [&'static str] {
        match self {
            County::Sussex => &[
                "Seaford",
                "Georgetown",
                "Millsboro",
                "Laurel",
                "Milton",
                "Lewes",
                "Selbyville",
                "Ocean View",
                "Long Neck",
                "Bridgeville",
                "Delmar",
                "Millville",
                "Blades",
                "Rehoboth Beach",
                "Greenwood",
                "Bethany Beach",
                "Dagsboro",
                "Frankford",
            ],
            County::Kent => &[
                "Dover",
                "Milford",
                "Smyrna",
                "Clayton",
                "Camden",
                "Rising Sun-Lebanon",
                "Highland Acres",
                "Harrington",
                "Dover Base Housing",
                "Riverview",
                "Kent Acres",
                "Cheswold",
                "Wyoming",
                "Woodside East",
                "Felton",
                "Rodney Village",
                "Frederica",
                "Houston",
                "Bowers",
                "Magnolia",
                "Kenton",
                "Little Creek",
                "Woodside",
                "Leipsic",
                "Viola",
                "Farmington",
                "Hartly",
            ],
            County::NewCastle => &[
                "Wilmington",
                "Newark",
                "Middletown",
                "Bear",
                "Glasgow",
                "Brookside",
                "Hockessin",
                "Pike Creek Valley",
                "Claymont",
                "North Star",
                "Wilmington Manor",
                "Pike Creek",
                "Edgemoor",
                "Elsmere",
                "New Castle",
                "Greenville",
                "Townsend",
                "Delaware City",
                "Bellefonte",
                "Newport",
                "Arden",
                "Odessa",
                "Ardentown",
                "Ardencroft",
            ],
        }
    }
}

impl fmt::Display for County {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognized county name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown county: {0} (expected Sussex, Kent or New Castle)")]
pub struct UnknownCounty(pub String);

impl FromStr for County {
    type Err = UnknownCounty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "sussex" => Ok(County::Sussex),
            "kent" => Ok(County::Kent),
            "newcastle" => Ok(County::NewCastle),
            _ => Err(UnknownCounty(s.to_string())),
        }
    }
}

/// Static county to city-set mapping
#[derive(Debug, Clone)]
pub struct CountyMap {
    cities: BTreeMap<County, Vec<String>>,
}

impl CountyMap {
    /// The Delaware mapping
    pub fn delaware() -> Self {
        let cities = County::ALL
            .iter()
            .map(|county| {
                let names = county.cities().iter().map(|c| c.to_string()).collect();
                (*county, names)
            })
            .collect();
        Self { cities }
    }

    /// Cities for a county, in display order
    pub fn cities(&self, county: County) -> &[String] {
        self.cities.get(&county).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reverse lookup
    pub fn county_of(&self, city: &str) -> Option<County> {
        self.cities
            .iter()
            .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(city)))
            .map(|(county, _)| *county)
    }

    pub fn iter(&self) -> impl Iterator<Item = (County, &[String])> {
        self.cities.iter().map(|(county, names)| (*county, names.as_slice()))
    }
}

lazy_static! {
    /// Process-wide county map, built on first use
    pub static ref DELAWARE_COUNTIES: CountyMap = CountyMap::delaware();
}
