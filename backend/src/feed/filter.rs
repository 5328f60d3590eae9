use serde::{Deserialize, Serialize};

/// Search criteria selected on the public listing pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub location: Option<String>,
    #[serde(alias = "type")]
    pub property_type: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(alias = "beds")]
    pub min_beds: Option<i16>,
    #[serde(alias = "baths")]
    pub min_baths: Option<i16>,
}

impl SearchFilters {
    /// Trims text fields and drops the ones left empty.
    pub fn normalized(mut self) -> Self {
        self.location = non_blank(self.location);
        self.property_type = non_blank(self.property_type);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_type(mut self, property_type: impl Into<String>) -> Self {
        self.property_type = Some(property_type.into());
        self
    }

    pub fn with_price_band(mut self, band: PriceBand) -> Self {
        let (min, max) = band.bounds();
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == SearchFilters::default()
    }

    pub fn clear(&mut self) {
        *self = SearchFilters::default();
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Quick price presets offered next to the search box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceBand {
    #[serde(rename = "0-5M")]
    UpTo5M,
    #[serde(rename = "5-15M")]
    From5MTo15M,
    #[serde(rename = "15M+")]
    Above15M,
}

const FIVE_MILLION: i64 = 5_000_000;
const FIFTEEN_MILLION: i64 = 15_000_000;

impl PriceBand {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "0-5M" => Some(PriceBand::UpTo5M),
            "5-15M" => Some(PriceBand::From5MTo15M),
            "15M+" => Some(PriceBand::Above15M),
            _ => None,
        }
    }

    /// Inclusive `(min, max)` bounds. Band lower bounds are exclusive, hence the `+ 1`.
    pub fn bounds(&self) -> (Option<i64>, Option<i64>) {
        match self {
            PriceBand::UpTo5M => (None, Some(FIVE_MILLION)),
            PriceBand::From5MTo15M => (Some(FIVE_MILLION + 1), Some(FIFTEEN_MILLION)),
            PriceBand::Above15M => (Some(FIFTEEN_MILLION + 1), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_filters_are_dropped() {
        let filters = SearchFilters {
            location: Some("   ".into()),
            property_type: Some(" Casa ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(filters.location, None);
        assert_eq!(filters.property_type.as_deref(), Some("Casa"));
    }

    #[test]
    fn price_bands_do_not_overlap() {
        let (_, up_to) = PriceBand::UpTo5M.bounds();
        let (mid_min, mid_max) = PriceBand::From5MTo15M.bounds();
        let (top_min, top_max) = PriceBand::Above15M.bounds();
        assert_eq!(up_to, Some(5_000_000));
        assert_eq!(mid_min, Some(5_000_001));
        assert_eq!(mid_max, Some(15_000_000));
        assert_eq!(top_min, Some(15_000_001));
        assert_eq!(top_max, None);
        assert_eq!(PriceBand::parse("5-15M"), Some(PriceBand::From5MTo15M));
        assert_eq!(PriceBand::parse("cheap"), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut filters = SearchFilters::default()
            .with_location("Monterrey")
            .with_price_band(PriceBand::Above15M);
        assert!(!filters.is_empty());
        filters.clear();
        assert!(filters.is_empty());
    }
}
