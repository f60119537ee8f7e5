//! Violation records and result sets
//!
//! Field names on the wire follow the SODA columns of the Delaware
//! restaurant inspection dataset (`restname`, `restcity`, `insp_date`, ...).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A single inspection violation row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    #[serde(rename = "restname")]
    pub restaurant_name: String,
    #[serde(rename = "restaddress", default)]
    pub address: String,
    #[serde(rename = "restcity", default)]
    pub city: String,
    #[serde(rename = "restzip", default)]
    pub zip_code: String,
    #[serde(rename = "insp_date", deserialize_with = "deserialize_inspection_date")]
    pub inspection_date: NaiveDate,
    #[serde(rename = "insp_type", default, skip_serializing_if = "Option::is_none")]
    pub inspection_type: Option<String>,
    #[serde(rename = "violation", default)]
    pub violation_code: String,
    #[serde(rename = "vio_desc", default)]
    pub violation_description: String,
}

impl ViolationRecord {
    /// Key for list rendering. Rows have no stable id, so position is part of it.
    pub fn row_key(&self, index: usize) -> String {
        format!("{}|{}|{}", self.restaurant_name, self.inspection_date, index)
    }
}

/// Parse a SODA floating timestamp (`2024-03-12T00:00:00.000`) or a bare date
pub fn parse_inspection_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn deserialize_inspection_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_inspection_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid inspection date: {raw}")))
}

/// Everything the views need for one filter selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Matches across the whole dataset, not just the returned rows
    pub total_count: u64,
    /// Newest inspection first, capped at the configured row limit
    pub rows: Vec<ViolationRecord>,
    /// Distinct, alphabetical
    pub cities: Vec<String>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sort newest inspection first. Stable, so ties keep their fetched order.
pub fn sort_newest_first(rows: &mut [ViolationRecord]) {
    rows.sort_by(|a, b| b.inspection_date.cmp(&a.inspection_date));
}

/// De-duplicate and alphabetize city names, dropping blanks
pub fn normalize_cities<I, S>(cities: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = cities
        .into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
pub(crate) fn sample_record(name: &str, city: &str, zip: &str, date: &str) -> ViolationRecord {
    ViolationRecord {
        restaurant_name: name.to_string(),
        address: "1 Main St".to_string(),
        city: city.to_string(),
        zip_code: zip.to_string(),
        inspection_date: parse_inspection_date(date).expect("valid test date"),
        inspection_type: Some("Complaint".to_string()),
        violation_code: "3-501.16".to_string(),
        violation_description: "Cold holding temperature".to_string(),
    }
}
