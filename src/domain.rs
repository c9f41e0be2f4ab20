// ===============================
// src/domain.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : domain.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{Catalog, OpenItems};
use crate::error::ApplyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }
}

/// One fixed-catalog counter. Serialized as `{"buy":n,"sell":m}` or a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Counter {
    Split {
        #[serde(default)]
        buy: u64,
        #[serde(default)]
        sell: u64,
    },
    Single(u64),
}

impl Counter {
    pub fn zero(directional: bool) -> Self {
        if directional {
            Counter::Split { buy: 0, sell: 0 }
        } else {
            Counter::Single(0)
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(self, Counter::Split { .. })
    }

    /// Convert to the catalog's shape. Split -> single keeps the total;
    /// single -> split cannot know the direction and starts at zero.
    fn reshape(self, directional: bool) -> Self {
        match (self, directional) {
            (Counter::Split { buy, sell }, false) => Counter::Single(buy.saturating_add(sell)),
            (Counter::Single(_), true) => Counter::zero(true),
            (same, _) => same,
        }
    }
}

/// Which part of the tally an `apply` touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Fixed,
    Open,
}

impl Applied {
    pub fn as_str(&self) -> &'static str {
        match self {
            Applied::Fixed => "fixed",
            Applied::Open => "open",
        }
    }
}

/// The whole state for one calendar day. This is also the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTally {
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "null_counters")]
    pub fixed: BTreeMap<String, Counter>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub buy_map: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sell_map: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count_map: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "zero_as_none")]
    pub message_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_text: String,
}

impl DailyTally {
    pub fn fresh(date: NaiveDate, catalog: &Catalog) -> Self {
        let fixed = catalog
            .items()
            .iter()
            .map(|it| (it.key.clone(), Counter::zero(it.directional)))
            .collect();
        Self {
            date,
            fixed,
            buy_map: BTreeMap::new(),
            sell_map: BTreeMap::new(),
            count_map: BTreeMap::new(),
            message_id: None,
            last_text: String::new(),
        }
    }

    /// Bring a loaded tally in line with the current catalog: every catalog
    /// item present with the configured shape. Entries for items that left the
    /// catalog are kept so old counts are not silently lost from the file.
    pub fn reconcile(&mut self, catalog: &Catalog) {
        for it in catalog.items() {
            let c = self
                .fixed
                .entry(it.key.clone())
                .or_insert_with(|| Counter::zero(it.directional));
            if c.is_directional() != it.directional {
                tracing::warn!(item = %it.key, "stored counter shape differs from catalog, reshaping");
                *c = c.reshape(it.directional);
            }
        }
    }

    pub fn apply(
        &mut self,
        catalog: &Catalog,
        kind: &str,
        direction: Option<Direction>,
    ) -> Result<Applied, ApplyError> {
        if let Some(item) = catalog.get(kind) {
            let counter = self
                .fixed
                .entry(item.key.clone())
                .or_insert_with(|| Counter::zero(item.directional));
            match (counter, direction) {
                (Counter::Split { buy, .. }, Some(Direction::Buy)) => *buy += 1,
                (Counter::Split { sell, .. }, Some(Direction::Sell)) => *sell += 1,
                (Counter::Split { .. }, None) => {
                    return Err(ApplyError::DirectionRequired(kind.to_string()))
                }
                (Counter::Single(n), _) => *n += 1,
            }
            return Ok(Applied::Fixed);
        }

        let map = match (catalog.open(), direction) {
            (OpenItems::Off, _) => return Err(ApplyError::UnrecognizedKind(kind.to_string())),
            (OpenItems::Single, _) => &mut self.count_map,
            (OpenItems::Split, Some(Direction::Buy)) => &mut self.buy_map,
            (OpenItems::Split, Some(Direction::Sell)) => &mut self.sell_map,
            (OpenItems::Split, None) => {
                return Err(ApplyError::DirectionRequired(kind.to_string()))
            }
        };
        *map.entry(kind.to_string()).or_insert(0) += 1;
        Ok(Applied::Open)
    }

    /// Counters only, as returned to HTTP callers.
    pub fn snapshot(&self, open: OpenItems) -> Snapshot {
        let (buy_map, sell_map, count_map) = match open {
            OpenItems::Off => (None, None, None),
            OpenItems::Single => (None, None, Some(self.count_map.clone())),
            OpenItems::Split => (Some(self.buy_map.clone()), Some(self.sell_map.clone()), None),
        };
        Snapshot {
            date: self.date,
            fixed: self.fixed.clone(),
            buy_map,
            sell_map,
            count_map,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub fixed: BTreeMap<String, Counter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_map: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_map: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_map: Option<BTreeMap<String, u64>>,
}

// Older files may carry `null` instead of an empty object.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// A `null` counter is dropped; `reconcile` puts a zero back for catalog items.
fn null_counters<'de, D>(d: D) -> Result<BTreeMap<String, Counter>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<Counter>>>::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.map(|c| (k, c)))
        .collect())
}

// 0 meant "no message yet" in older files.
fn zero_as_none<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(d)?.filter(|id| *id != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn catalog(open: OpenItems) -> Catalog {
        Catalog::new(
            vec![
                CatalogItem { key: "sword5".into(), directional: true },
                CatalogItem { key: "megasword".into(), directional: false },
            ],
            open,
        )
        .unwrap()
    }

    #[test]
    fn fixed_item_counts_per_direction() {
        let cat = catalog(OpenItems::Split);
        let mut t = DailyTally::fresh(date(), &cat);
        assert_eq!(t.apply(&cat, "sword5", Some(Direction::Buy)), Ok(Applied::Fixed));
        t.apply(&cat, "sword5", Some(Direction::Sell)).unwrap();
        t.apply(&cat, "sword5", Some(Direction::Sell)).unwrap();
        assert_eq!(t.fixed["sword5"], Counter::Split { buy: 1, sell: 2 });
    }

    #[test]
    fn single_item_ignores_direction() {
        let cat = catalog(OpenItems::Split);
        let mut t = DailyTally::fresh(date(), &cat);
        t.apply(&cat, "megasword", None).unwrap();
        t.apply(&cat, "megasword", Some(Direction::Sell)).unwrap();
        assert_eq!(t.fixed["megasword"], Counter::Single(2));
    }

    #[test]
    fn split_item_without_direction_is_rejected() {
        let cat = catalog(OpenItems::Split);
        let mut t = DailyTally::fresh(date(), &cat);
        assert_eq!(
            t.apply(&cat, "sword5", None),
            Err(ApplyError::DirectionRequired("sword5".into()))
        );
        assert_eq!(t, DailyTally::fresh(date(), &cat));
    }

    #[test]
    fn open_items_are_created_on_first_use() {
        let cat = catalog(OpenItems::Split);
        let mut t = DailyTally::fresh(date(), &cat);
        assert_eq!(t.apply(&cat, "custom_item", Some(Direction::Buy)), Ok(Applied::Open));
        t.apply(&cat, "custom_item", Some(Direction::Buy)).unwrap();
        t.apply(&cat, "other", Some(Direction::Sell)).unwrap();
        assert_eq!(t.buy_map.get("custom_item"), Some(&2));
        assert_eq!(t.sell_map.get("other"), Some(&1));
        assert!(t.sell_map.get("custom_item").is_none());
    }

    #[test]
    fn strict_catalog_rejects_unknown_names() {
        let cat = catalog(OpenItems::Off);
        let mut t = DailyTally::fresh(date(), &cat);
        assert_eq!(
            t.apply(&cat, "custom_item", Some(Direction::Buy)),
            Err(ApplyError::UnrecognizedKind("custom_item".into()))
        );
    }

    #[test]
    fn single_open_mode_uses_count_map() {
        let cat = catalog(OpenItems::Single);
        let mut t = DailyTally::fresh(date(), &cat);
        t.apply(&cat, "pickaxe", None).unwrap();
        t.apply(&cat, "pickaxe", Some(Direction::Buy)).unwrap();
        assert_eq!(t.count_map.get("pickaxe"), Some(&2));
        assert!(t.buy_map.is_empty());
    }

    #[test]
    fn decodes_nulls_and_zero_message_id() {
        let raw = r#"{"date":"2026-10-16","fixed":null,"buy_map":null,"message_id":0}"#;
        let t: DailyTally = serde_json::from_str(raw).unwrap();
        assert!(t.fixed.is_empty());
        assert!(t.buy_map.is_empty());
        assert!(t.sell_map.is_empty());
        assert_eq!(t.message_id, None);
        assert_eq!(t.last_text, "");
    }

    #[test]
    fn null_counter_keeps_the_rest_of_the_file() {
        let raw = r#"{"date":"2026-10-16","fixed":{"sword5":null,"megasword":4},
            "message_id":7,"last_text":"x"}"#;
        let mut t: DailyTally = serde_json::from_str(raw).unwrap();
        assert_eq!(t.message_id, Some(7));
        assert_eq!(t.last_text, "x");
        assert!(!t.fixed.contains_key("sword5"));

        t.reconcile(&catalog(OpenItems::Split));
        assert_eq!(t.fixed["sword5"], Counter::Split { buy: 0, sell: 0 });
        assert_eq!(t.fixed["megasword"], Counter::Single(4));
    }

    #[test]
    fn reconcile_fills_and_reshapes() {
        let cat = catalog(OpenItems::Split);
        let mut t = DailyTally::fresh(date(), &Catalog::new(vec![], OpenItems::Split).unwrap());
        t.fixed.insert("megasword".into(), Counter::Split { buy: 2, sell: 3 });
        t.fixed.insert("retired".into(), Counter::Single(7));
        t.reconcile(&cat);
        assert_eq!(t.fixed["sword5"], Counter::Split { buy: 0, sell: 0 });
        assert_eq!(t.fixed["megasword"], Counter::Single(5));
        assert_eq!(t.fixed["retired"], Counter::Single(7));
    }

    #[test]
    fn snapshot_follows_open_mode() {
        let cat = catalog(OpenItems::Off);
        let t = DailyTally::fresh(date(), &cat);
        let v = serde_json::to_value(t.snapshot(OpenItems::Off)).unwrap();
        assert!(v.get("buy_map").is_none());
        assert_eq!(v["fixed"]["sword5"], serde_json::json!({"buy": 0, "sell": 0}));
        assert_eq!(v["fixed"]["megasword"], serde_json::json!(0));
    }
}
