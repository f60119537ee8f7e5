//! Filter selection state
//!
//! Only one filter dimension is active at a time. Switching mode wipes every
//! parameter so a lingering zip code can never leak into a county filter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::county::County;

/// Longest zip code the input accepts
pub const ZIP_CODE_LEN: usize = 5;

/// Shortest search text that produces a name predicate
pub const MIN_SEARCH_LEN: usize = 3;

/// Which filter dimension is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    None,
    County,
    City,
    Zipcode,
    Restaurant,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::None => "none",
            FilterMode::County => "county",
            FilterMode::City => "city",
            FilterMode::Zipcode => "zipcode",
            FilterMode::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "all" => Ok(FilterMode::None),
            "county" => Ok(FilterMode::County),
            "city" => Ok(FilterMode::City),
            "zip" | "zipcode" => Ok(FilterMode::Zipcode),
            "restaurant" | "name" => Ok(FilterMode::Restaurant),
            other => Err(format!("Unknown filter mode: {}", other)),
        }
    }
}

/// Current filter selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    mode: FilterMode,
    selected_county: Option<County>,
    selected_city: String,
    selected_zip_code: String,
    search_text: String,
    debounced_search_text: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn selected_county(&self) -> Option<County> {
        self.selected_county
    }

    pub fn selected_city(&self) -> &str {
        &self.selected_city
    }

    pub fn selected_zip_code(&self) -> &str {
        &self.selected_zip_code
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn debounced_search_text(&self) -> &str {
        &self.debounced_search_text
    }

    /// Switch mode and clear every parameter, including those of the new mode
    pub fn set_mode(&mut self, mode: FilterMode) {
        *self = Self {
            mode,
            ..Self::default()
        };
    }

    /// Returns false when county mode is not active
    pub fn select_county(&mut self, county: County) -> bool {
        if self.mode != FilterMode::County {
            return false;
        }
        self.selected_county = Some(county);
        true
    }

    /// Returns false when city mode is not active
    pub fn select_city(&mut self, city: impl Into<String>) -> bool {
        if self.mode != FilterMode::City {
            return false;
        }
        self.selected_city = city.into();
        true
    }

    /// Accepts anything, truncated to five characters. Whether it is a usable
    /// zip code is decided by [`FilterState::active_zip_code`].
    pub fn set_zip_code(&mut self, zip: &str) -> bool {
        if self.mode != FilterMode::Zipcode {
            return false;
        }
        self.selected_zip_code = zip.trim().chars().take(ZIP_CODE_LEN).collect();
        true
    }

    /// Raw keystroke text; nothing downstream reads it until it settles
    pub fn set_search_text(&mut self, text: impl Into<String>) -> bool {
        if self.mode != FilterMode::Restaurant {
            return false;
        }
        self.search_text = text.into();
        true
    }

    /// Settled search text delivered by the debouncer
    pub fn set_debounced_search_text(&mut self, text: impl Into<String>) -> bool {
        if self.mode != FilterMode::Restaurant {
            return false;
        }
        self.debounced_search_text = text.into();
        true
    }

    /// Zip code, if it is exactly five digits
    pub fn active_zip_code(&self) -> Option<&str> {
        let zip = self.selected_zip_code.as_str();
        (zip.len() == ZIP_CODE_LEN && zip.chars().all(|c| c.is_ascii_digit())).then_some(zip)
    }

    /// Settled search text, if long enough to search on
    pub fn active_search(&self) -> Option<&str> {
        let text = self.debounced_search_text.as_str();
        (text.chars().count() >= MIN_SEARCH_LEN).then_some(text)
    }
}
