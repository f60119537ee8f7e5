//! Predicate construction
//!
//! [`QueryBuilder::build`] turns a [`FilterState`] into a [`Predicate`]: a
//! list of AND-combined conditions. The same predicate renders to a SoQL
//! `$where` clause for remote filtering or evaluates against records in
//! memory for local filtering.

use serde::{Deserialize, Serialize};

use crate::county::{CountyMap, DELAWARE_COUNTIES};
use crate::filter::{FilterMode, FilterState};
use crate::record::ViolationRecord;

/// Inspection types kept by the complaint/follow-up base predicate
pub const COMPLAINT_FOLLOW_UP: [&str; 2] = ["Complaint", "Follow-up"];

/// Predicate applied under every filter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasePredicate {
    /// All inspection types
    #[default]
    None,
    /// Only complaint and follow-up inspections
    ComplaintFollowUp,
}

/// One condition over a violation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Condition {
    InspectionTypeIn(Vec<String>),
    CityIn(Vec<String>),
    CityEquals(String),
    ZipEquals(String),
    /// Case-insensitive substring; `%` and `_` in the text are LIKE wildcards
    NameContains(String),
}

impl Condition {
    /// SoQL fragment for this condition
    pub fn to_soql(&self) -> String {
        match self {
            Condition::InspectionTypeIn(types) => format!("insp_type in({})", quote_list(types)),
            Condition::CityIn(cities) => format!("restcity in({})", quote_list(cities)),
            Condition::CityEquals(city) => format!("restcity={}", quote(city)),
            Condition::ZipEquals(zip) => format!("restzip={}", quote(zip)),
            Condition::NameContains(text) => {
                format!("upper(restname) like upper({})", quote(&format!("%{}%", text)))
            }
        }
    }

    /// Evaluate in memory with the same semantics as the remote filter
    pub fn matches(&self, record: &ViolationRecord) -> bool {
        match self {
            Condition::InspectionTypeIn(types) => record
                .inspection_type
                .as_deref()
                .is_some_and(|t| types.iter().any(|x| x == t)),
            Condition::CityIn(cities) => cities.iter().any(|c| *c == record.city),
            Condition::CityEquals(city) => record.city == *city,
            Condition::ZipEquals(zip) => record.zip_code == *zip,
            Condition::NameContains(text) => like_matches(
                &record.restaurant_name.to_uppercase(),
                &format!("%{}%", text.to_uppercase()),
            ),
        }
    }
}

/// AND-combined conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// `$where` clause, or `None` when nothing filters
    pub fn to_soql(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        Some(
            self.conditions
                .iter()
                .map(Condition::to_soql)
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }

    pub fn matches(&self, record: &ViolationRecord) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Quote a SoQL string literal, doubling embedded single quotes
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SoQL `LIKE`: `%` matches any run of characters, `_` exactly one
pub fn like_matches(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut v, mut p) = (0, 0);
    // Last `%` seen and the value position it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, v));
                p += 1;
            }
            Some(&c) if c == '_' || c == value[v] => {
                v += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    backtrack = Some((star, absorbed + 1));
                    p = star + 1;
                    v = absorbed + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

fn quote_list(values: &[String]) -> String {
    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",")
}

/// Pure mapping from filter state to predicate
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: BasePredicate,
    counties: &'static CountyMap,
}

impl QueryBuilder {
    pub fn new(base: BasePredicate) -> Self {
        Self {
            base,
            counties: &DELAWARE_COUNTIES,
        }
    }

    pub fn base(&self) -> BasePredicate {
        self.base
    }

    pub fn build(&self, state: &FilterState) -> Predicate {
        let mut conditions = Vec::new();

        if self.base == BasePredicate::ComplaintFollowUp {
            conditions.push(Condition::InspectionTypeIn(
                COMPLAINT_FOLLOW_UP.iter().map(|t| t.to_string()).collect(),
            ));
        }

        let selection = match state.mode() {
            FilterMode::None => None,
            FilterMode::County => state
                .selected_county()
                .map(|county| Condition::CityIn(self.counties.cities(county).to_vec())),
            FilterMode::City => Some(state.selected_city())
                .filter(|city| !city.is_empty())
                .map(|city| Condition::CityEquals(city.to_string())),
            FilterMode::Zipcode => state
                .active_zip_code()
                .map(|zip| Condition::ZipEquals(zip.to_string())),
            FilterMode::Restaurant => state
                .active_search()
                .map(|text| Condition::NameContains(text.to_string())),
        };
        conditions.extend(selection);

        Predicate::new(conditions)
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(BasePredicate::default())
    }
}
