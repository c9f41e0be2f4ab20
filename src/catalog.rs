// ===============================
// src/catalog.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : catalog.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::collections::HashSet;

use crate::error::ConfigError;

/// Item keys tracked when `CATALOG` is not set, in display order.
pub const DEFAULT_ITEMS: &[&str] = &[
    "5nomend",
    "sword5",
    "sword6",
    "7nomend",
    "sword7",
    "megasword",
    "бошмаки",
    "шлем",
    "нагрудник",
    "штаны",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub key: String,
    /// true -> counted as buy/sell pair, false -> a single undirected count
    pub directional: bool,
}

/// How names outside the fixed catalog are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenItems {
    /// strict catalog: unknown names are rejected
    Off,
    /// one undirected count per name
    Single,
    /// buy and sell maps
    Split,
}

impl OpenItems {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "strict" => Some(OpenItems::Off),
            "single" => Some(OpenItems::Single),
            "split" | "buy_sell" => Some(OpenItems::Split),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenItems::Off => "off",
            OpenItems::Single => "single",
            OpenItems::Split => "split",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    open: OpenItems,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>, open: OpenItems) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for it in &items {
            if it.key.trim().is_empty() {
                return Err(ConfigError::Catalog("empty item key".into()));
            }
            if !seen.insert(it.key.as_str()) {
                return Err(ConfigError::Catalog(format!("duplicate item key '{}'", it.key)));
            }
        }
        Ok(Self { items, open })
    }

    /// Parse `CATALOG` syntax: `key,key:single,...`
    pub fn parse(list: &str, open: OpenItems) -> Result<Self, ConfigError> {
        let mut items = Vec::new();
        for raw in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let item = match raw.rsplit_once(':') {
                Some((key, "single")) => CatalogItem { key: key.trim().to_string(), directional: false },
                Some((key, "split")) => CatalogItem { key: key.trim().to_string(), directional: true },
                Some((_, other)) => {
                    return Err(ConfigError::Catalog(format!("unknown item mode '{other}' in '{raw}'")))
                }
                None => CatalogItem { key: raw.to_string(), directional: true },
            };
            items.push(item);
        }
        if items.is_empty() {
            return Err(ConfigError::Catalog("no items".into()));
        }
        Self::new(items, open)
    }

    pub fn default_with(open: OpenItems) -> Self {
        let items = DEFAULT_ITEMS
            .iter()
            .map(|k| CatalogItem { key: (*k).to_string(), directional: true })
            .collect();
        Self { items, open }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|it| it.key == key)
    }

    pub fn open(&self) -> OpenItems {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_per_item() {
        let c = Catalog::parse("sword5, megasword:single ,shield:split", OpenItems::Off).unwrap();
        assert_eq!(c.items().len(), 3);
        assert!(c.get("sword5").unwrap().directional);
        assert!(!c.get("megasword").unwrap().directional);
        assert!(c.get("shield").unwrap().directional);
        assert_eq!(c.open(), OpenItems::Off);
    }

    #[test]
    fn rejects_duplicates_and_garbage() {
        assert!(Catalog::parse("a,b,a", OpenItems::Split).is_err());
        assert!(Catalog::parse(" , ", OpenItems::Split).is_err());
        assert!(Catalog::parse("a:weird", OpenItems::Split).is_err());
    }

    #[test]
    fn default_catalog_keeps_display_order() {
        let c = Catalog::default_with(OpenItems::Split);
        let keys: Vec<&str> = c.items().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, DEFAULT_ITEMS);
    }

    #[test]
    fn open_mode_strings() {
        assert_eq!(OpenItems::parse("STRICT"), Some(OpenItems::Off));
        assert_eq!(OpenItems::parse("single"), Some(OpenItems::Single));
        assert_eq!(OpenItems::parse("split"), Some(OpenItems::Split));
        assert_eq!(OpenItems::parse("maybe"), None);
    }
}
