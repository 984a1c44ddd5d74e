//! Rate table and the response envelope served to callers

use crate::core::config::CurrencySources;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub const STATUS_OK: u16 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub name: String,
    pub rate: f64,
}

impl RateEntry {
    pub fn new(name: &str, rate: f64) -> Self {
        Self {
            name: name.to_string(),
            rate,
        }
    }
}

/// Currency code to per-source rates. Keeps insertion order, both in memory
/// and when serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    currencies: Vec<(String, Vec<RateEntry>)>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entries for `currency`.
    pub fn with(mut self, currency: &str, entries: Vec<RateEntry>) -> Self {
        self.insert(currency, entries);
        self
    }

    pub fn insert(&mut self, currency: &str, entries: Vec<RateEntry>) {
        match self.currencies.iter_mut().find(|(code, _)| code == currency) {
            Some((_, existing)) => *existing = entries,
            None => self.currencies.push((currency.to_string(), entries)),
        }
    }

    pub fn get(&self, currency: &str) -> Option<&[RateEntry]> {
        self.currencies
            .iter()
            .find(|(code, _)| code == currency)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn rate(&self, currency: &str, source: &str) -> Option<f64> {
        self.get(currency)?
            .iter()
            .find(|entry| entry.name == source)
            .map(|entry| entry.rate)
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.iter().all(|(_, entries)| entries.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RateEntry])> {
        self.currencies
            .iter()
            .map(|(code, entries)| (code.as_str(), entries.as_slice()))
    }

    /// Folds the outcome of a refresh pass into the table.
    ///
    /// `fresh[c][s]` is the rate fetched for `sources[c].sources[s]`, or `None`
    /// if that fetch failed. Failed sources keep their previous entry. The
    /// result lists configured currencies and sources in configuration order;
    /// entries the configuration does not know about are kept after them.
    pub(crate) fn merge_pass(&mut self, sources: &[CurrencySources], fresh: &[Vec<Option<f64>>]) {
        let mut previous = std::mem::take(&mut self.currencies);

        for (config, rates) in sources.iter().zip(fresh) {
            let mut prior = previous
                .iter()
                .position(|(code, _)| *code == config.currency)
                .map(|pos| previous.remove(pos).1)
                .unwrap_or_default();

            let mut entries = Vec::with_capacity(config.sources.len());
            for (source, rate) in config.sources.iter().zip(rates) {
                let prior_pos = prior.iter().position(|e| e.name == source.name);
                let stale = prior_pos.map(|pos| prior.remove(pos));
                match rate {
                    Some(rate) => entries.push(RateEntry::new(&source.name, *rate)),
                    None => entries.extend(stale),
                }
            }
            entries.append(&mut prior);

            if !entries.is_empty() {
                self.currencies.push((config.currency.clone(), entries));
            }
        }

        self.currencies.append(&mut previous);
    }
}

impl Serialize for RateTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.currencies.len()))?;
        for (code, entries) in &self.currencies {
            map.serialize_entry(code, entries)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatesData {
    pub rates: RateTable,
}

/// `{status: 200, data: {rates: {...}}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatesResponse {
    pub status: u16,
    pub data: RatesData,
}

impl RatesResponse {
    pub fn ok(rates: RateTable) -> Self {
        Self {
            status: STATUS_OK,
            data: RatesData { rates },
        }
    }

    pub fn rates(&self) -> &RateTable {
        &self.data.rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SourceSpec;

    fn usd_sources() -> Vec<CurrencySources> {
        vec![CurrencySources {
            currency: "USD".to_string(),
            sources: vec![
                SourceSpec::new("Bitstamp", "http://a", "last"),
                SourceSpec::new("Bitcoin.com", "http://b", "price"),
            ],
        }]
    }

    #[test]
    fn test_response_serialization_keeps_order_and_numbers() {
        let table = RateTable::new()
            .with("USD", vec![RateEntry::new("Bitstamp", 237.9)])
            .with("EUR", vec![RateEntry::new("Bitstamp", 190.1)]);
        let json = serde_json::to_string(&RatesResponse::ok(table)).unwrap();
        assert_eq!(
            json,
            r#"{"status":200,"data":{"rates":{"USD":[{"name":"Bitstamp","rate":237.9}],"EUR":[{"name":"Bitstamp","rate":190.1}]}}}"#
        );
    }

    #[test]
    fn test_empty_table() {
        assert!(RateTable::new().is_empty());
        assert!(RateTable::new().with("USD", vec![]).is_empty());
        let json = serde_json::to_string(&RatesResponse::ok(RateTable::new())).unwrap();
        assert_eq!(json, r#"{"status":200,"data":{"rates":{}}}"#);
    }

    #[test]
    fn test_merge_pass_mixes_fresh_and_stale() {
        let mut table = RateTable::new().with(
            "USD",
            vec![
                RateEntry::new("Bitstamp", 220.2),
                RateEntry::new("Bitcoin.com", 220.2),
            ],
        );

        table.merge_pass(&usd_sources(), &[vec![Some(237.9), None]]);

        assert_eq!(
            table.get("USD").unwrap(),
            &[
                RateEntry::new("Bitstamp", 237.9),
                RateEntry::new("Bitcoin.com", 220.2)
            ]
        );
    }

    #[test]
    fn test_merge_pass_orders_new_entries_by_configuration() {
        let mut table = RateTable::new().with("USD", vec![RateEntry::new("Bitcoin.com", 1.0)]);

        table.merge_pass(&usd_sources(), &[vec![Some(2.0), None]]);

        assert_eq!(
            table.get("USD").unwrap(),
            &[
                RateEntry::new("Bitstamp", 2.0),
                RateEntry::new("Bitcoin.com", 1.0)
            ]
        );
    }

    #[test]
    fn test_merge_pass_leaves_never_fetched_sources_absent() {
        let mut table = RateTable::new();
        table.merge_pass(&usd_sources(), &[vec![None, None]]);
        assert!(table.is_empty());
        assert!(table.get("USD").is_none());

        table.merge_pass(&usd_sources(), &[vec![None, Some(3.0)]]);
        assert_eq!(
            table.get("USD").unwrap(),
            &[RateEntry::new("Bitcoin.com", 3.0)]
        );
    }

    #[test]
    fn test_merge_pass_keeps_unconfigured_entries() {
        let mut table = RateTable::new()
            .with("GBP", vec![RateEntry::new("Kraken", 150.0)])
            .with(
                "USD",
                vec![
                    RateEntry::new("Coinbase", 9.0),
                    RateEntry::new("Bitstamp", 1.0),
                ],
            );

        table.merge_pass(&usd_sources(), &[vec![None, Some(2.0)]]);

        let order: Vec<&str> = table.iter().map(|(code, _)| code).collect();
        assert_eq!(order, vec!["USD", "GBP"]);
        assert_eq!(
            table.get("USD").unwrap(),
            &[
                RateEntry::new("Bitstamp", 1.0),
                RateEntry::new("Bitcoin.com", 2.0),
                RateEntry::new("Coinbase", 9.0)
            ]
        );
        assert_eq!(table.rate("GBP", "Kraken"), Some(150.0));
    }
}
