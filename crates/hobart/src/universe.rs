//! Asset universes.
//!
//! An uncached computation always runs over the full universe so that the stored panel
//! serves every later asset subset.

use hobart_data::{Asset, InMemoryMarketData, MarketDataProvider};

/// Trait for asset universes.
pub trait Universe: Send + Sync {
    /// Every asset in the universe, ordered by id.
    fn assets(&self) -> Vec<Asset>;

    /// Check if an asset is in the universe.
    fn contains(&self, asset: &Asset) -> bool {
        self.assets().contains(asset)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.assets().len()
    }
}

/// Fixed list of assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticUniverse {
    assets: Vec<Asset>,
}

impl StaticUniverse {
    /// Create from a list of assets (deduplicated by id).
    pub fn new(assets: impl IntoIterator<Item = Asset>) -> Self {
        let mut assets: Vec<Asset> = assets.into_iter().collect();
        assets.sort();
        assets.dedup();
        Self { assets }
    }

    /// Resolve tickers through a market data provider.
    pub fn from_symbols(
        market: &dyn MarketDataProvider,
        tickers: &[&str],
    ) -> hobart_data::Result<Self> {
        Ok(Self::new(market.get_assets(tickers)?))
    }
}

impl Universe for StaticUniverse {
    fn assets(&self) -> Vec<Asset> {
        self.assets.clone()
    }

    fn contains(&self, asset: &Asset) -> bool {
        self.assets.binary_search(asset).is_ok()
    }

    fn size(&self) -> usize {
        self.assets.len()
    }
}

impl Universe for InMemoryMarketData {
    fn assets(&self) -> Vec<Asset> {
        Self::assets(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hobart_data::{CLOSE_RETURN, OPEN_RETURN, Panel};

    #[test]
    fn test_static_universe() {
        let universe = StaticUniverse::new([
            Asset::new(3, "C"),
            Asset::new(1, "A"),
            Asset::new(3, "C"),
        ]);

        assert_eq!(universe.size(), 2);
        assert!(universe.contains(&Asset::new(1, "A")));
        assert!(!universe.contains(&Asset::new(2, "B")));
        assert_eq!(universe.assets()[0].symbol, "A");
    }

    #[test]
    fn test_from_symbols() {
        let date = NaiveDate::from_ymd_opt(2017, 1, 3).unwrap();
        let mut panel = Panel::new([OPEN_RETURN, CLOSE_RETURN]);
        panel.insert(date, Asset::new(24, "AAPL"), vec![0.0, 0.0]).unwrap();
        panel.insert(date, Asset::new(5061, "MSFT"), vec![0.0, 0.0]).unwrap();
        let market = InMemoryMarketData::from_returns(panel).unwrap();

        let universe = StaticUniverse::from_symbols(&market, &["msft"]).unwrap();
        assert_eq!(universe.assets(), vec![Asset::new(5061, "MSFT")]);
        assert!(StaticUniverse::from_symbols(&market, &["NOPE"]).is_err());
        assert_eq!(Universe::size(&market), 2);
    }
}
