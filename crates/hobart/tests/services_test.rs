//! Integration tests for the signal services over synthetic market data.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use hobart::data::{
    Asset, CLOSE_RETURN, FactorSeries, InMemoryMarketData, MarketDataProvider, MemoryTier,
    OPEN_RETURN, Panel, PanelCache, PriceField, RemoteTier, SessionCalendar, SqliteBackend,
    TieredCache, TradingCalendar,
};
use hobart::events::{EventSet, GroupLabel};
use hobart::{
    EventStudyService, MARKET_FACTORS_KEY, MarketFactorService, ResidualReturnsService,
    ServiceError, SignalConfig, StaticFactors, StaticUniverse,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, month, day).unwrap()
}

fn spy() -> Asset {
    Asset::new(8554, "SPY")
}

fn alpha_asset() -> Asset {
    Asset::new(1, "AAA")
}

fn noise_asset() -> Asset {
    Asset::new(2, "BBB")
}

fn wave(i: usize, step: usize, modulus: usize, scale: f64) -> f64 {
    ((i * step % modulus) as f64 / modulus as f64 - 0.5) * scale
}

/// Market provider counting `get_returns` calls.
#[derive(Debug)]
struct CountingMarket {
    inner: InMemoryMarketData,
    calls: AtomicUsize,
}

impl CountingMarket {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TradingCalendar for CountingMarket {
    fn valid_trading_start(&self, date: NaiveDate) -> hobart::data::Result<NaiveDate> {
        self.inner.valid_trading_start(date)
    }

    fn valid_trading_end(&self, date: NaiveDate) -> hobart::data::Result<NaiveDate> {
        self.inner.valid_trading_end(date)
    }

    fn n_trading_days_from(&self, n: i32, date: NaiveDate) -> hobart::data::Result<Vec<NaiveDate>> {
        self.inner.n_trading_days_from(n, date)
    }
}

impl MarketDataProvider for CountingMarket {
    fn get_returns(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        assets: Option<&[Asset]>,
    ) -> hobart::data::Result<Panel> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_returns(start, end, assets)
    }

    fn get_assets(&self, tickers: &[&str]) -> hobart::data::Result<Vec<Asset>> {
        self.inner.get_assets(tickers)
    }
}

/// Weekday sessions of the first half of 2016. `AAA` moves 1.5x the benchmark, `BBB` is
/// unrelated to it.
fn market() -> Arc<CountingMarket> {
    let calendar = SessionCalendar::weekdays(d(1, 4), d(6, 30), &[]);
    let mut panel = Panel::new([OPEN_RETURN, CLOSE_RETURN]);
    for (i, date) in calendar.sessions().iter().enumerate() {
        let market_close = wave(i, 37, 53, 0.02);
        let market_open = wave(i, 41, 59, 0.02);
        panel.insert(*date, spy(), vec![market_open, market_close]).unwrap();
        panel
            .insert(
                *date,
                alpha_asset(),
                vec![
                    0.0004 + 1.5 * market_open + wave(i, 61, 97, 0.0005),
                    0.0004 + 1.5 * market_close + wave(i, 67, 101, 0.0005),
                ],
            )
            .unwrap();
        panel
            .insert(
                *date,
                noise_asset(),
                vec![wave(i, 29, 89, 0.015), wave(i, 31, 83, 0.015)],
            )
            .unwrap();
    }
    Arc::new(CountingMarket {
        inner: InMemoryMarketData::new(panel, calendar).unwrap(),
        calls: AtomicUsize::new(0),
    })
}

fn config() -> SignalConfig {
    SignalConfig {
        history_start: d(2, 15),
        history_end: d(5, 31),
        residual_window: 20,
        market_factor_window: 10,
        workers: Some(2),
        ..SignalConfig::default()
    }
}

fn universe() -> Arc<StaticUniverse> {
    Arc::new(StaticUniverse::new([alpha_asset(), noise_asset()]))
}

fn residual_service(
    market: &Arc<CountingMarket>,
    cache: &Arc<TieredCache>,
    factors: Option<Arc<StaticFactors>>,
) -> ResidualReturnsService {
    ResidualReturnsService::new(
        market.clone(),
        cache.clone(),
        universe(),
        factors.map(|f| f as Arc<dyn hobart::FactorProvider>),
        config(),
    )
}

fn memory_cache() -> Arc<TieredCache> {
    Arc::new(TieredCache::without_remote(MemoryTier::new()))
}

#[test]
fn test_market_neutral_is_computed_once() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let first = service
        .get_market_neutral_residual_returns(None, None, None, PriceField::Close)
        .unwrap();
    let calls = market.calls();
    assert!(calls > 0);

    let second = service
        .get_market_neutral_residual_returns(None, None, None, PriceField::Close)
        .unwrap();
    assert_eq!(market.calls(), calls);
    assert_eq!(first, second);
    assert_eq!(
        first.columns(),
        &["return", "alpha", "beta", "residual_return"]
    );
}

#[test]
fn test_market_neutral_output_span() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let panel = service
        .get_market_neutral_residual_returns(None, None, None, PriceField::Close)
        .unwrap();

    // window + 1 sessions of lead-in leave two residual dates before the history start
    let expected_first = market.n_trading_days_from(-2, d(2, 15)).unwrap()[0];
    let dates = panel.dates();
    assert_eq!(dates.first(), Some(&expected_first));
    assert_eq!(dates.last(), Some(&d(5, 31)));
    assert_eq!(panel.assets(), vec![alpha_asset(), noise_asset()]);
}

#[test]
fn test_residual_identity_and_gate() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let panel = service
        .get_market_neutral_residual_returns(None, None, None, PriceField::Close)
        .unwrap();
    let benchmark = market
        .get_returns(d(1, 4), d(6, 30), Some(&[spy()]))
        .unwrap();

    for (key, row) in panel.iter() {
        let (ret, alpha, beta, residual) = (row[0], row[1], row[2], row[3]);
        if beta == 0.0 {
            assert_eq!(alpha, 0.0);
            assert_eq!(residual, ret);
        } else {
            let market_return = benchmark.value(key.date, &spy(), CLOSE_RETURN).unwrap();
            assert_relative_eq!(
                residual,
                ret - alpha - beta * market_return,
                epsilon = 1e-12
            );
        }
    }

    let last = panel.get(d(5, 31), &alpha_asset()).unwrap();
    assert_relative_eq!(last[2], 1.5, epsilon = 0.05);
}

#[test]
fn test_results_are_filtered_but_cache_holds_universe() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let panel = service
        .get_market_neutral_residual_returns(
            Some(d(3, 1)),
            Some(d(3, 4)),
            Some(&[noise_asset()]),
            PriceField::Close,
        )
        .unwrap();
    assert_eq!(panel.len(), 4);
    assert_eq!(panel.assets(), vec![noise_asset()]);
    assert_eq!(panel.dates(), vec![d(3, 1), d(3, 2), d(3, 3), d(3, 4)]);

    let stored = cache
        .get(&ResidualReturnsService::market_neutral_key(PriceField::Close))
        .unwrap()
        .unwrap();
    assert_eq!(stored.assets(), vec![alpha_asset(), noise_asset()]);
    assert!(stored.len() > panel.len());
}

#[test]
fn test_price_fields_are_cached_separately() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let open = service
        .get_market_neutral_residual_returns(None, None, None, PriceField::Open)
        .unwrap();
    let close = service
        .get_market_neutral_residual_returns(None, None, None, PriceField::Close)
        .unwrap();
    assert_ne!(open, close);
    assert!(cache.get("market_neutral_residual_returns_on_open").unwrap().is_some());
    assert!(cache.get("market_neutral_residual_returns_on_close").unwrap().is_some());
}

#[test]
fn test_inverted_range_is_rejected() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let result = service.get_market_neutral_residual_returns(
        Some(d(4, 1)),
        Some(d(3, 1)),
        None,
        PriceField::Close,
    );
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
}

fn factor_model() -> Arc<StaticFactors> {
    let calendar = SessionCalendar::weekdays(d(1, 4), d(6, 30), &[]);
    let mut series = FactorSeries::new(["mkt", "smb"]);
    for (i, date) in calendar.sessions().iter().enumerate() {
        series
            .insert(*date, vec![wave(i, 37, 53, 0.02), wave(i, 43, 71, 0.01)])
            .unwrap();
    }
    Arc::new(StaticFactors::new("two-factor", series))
}

#[test]
fn test_multi_factor_residuals() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, Some(factor_model()));

    let panel = service
        .get_multi_factor_residual_returns(None, Some(d(5, 31)), None, PriceField::Close)
        .unwrap();
    assert_eq!(
        panel.columns(),
        &["return", "alpha", "beta_mkt", "beta_smb", "residual_return"]
    );
    let last = panel.get(d(5, 31), &alpha_asset()).unwrap();
    assert_relative_eq!(last[2], 1.5, epsilon = 0.05);
    assert!(
        cache
            .get("multi_factor_residual_returns_on_close")
            .unwrap()
            .is_some()
    );
}

#[test]
fn test_multi_factor_rejects_open() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, Some(factor_model()));

    let result = service.get_multi_factor_residual_returns(None, None, None, PriceField::Open);
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    assert_eq!(market.calls(), 0);
}

#[test]
fn test_multi_factor_requires_provider() {
    let market = market();
    let cache = memory_cache();
    let service = residual_service(&market, &cache, None);

    let result = service.get_multi_factor_residual_returns(None, None, None, PriceField::Close);
    assert!(matches!(result, Err(ServiceError::MissingCollaborator(_))));
}

#[test]
fn test_market_factors() {
    let market = market();
    let cache = memory_cache();
    let service = MarketFactorService::new(market.clone(), cache.clone(), universe(), config());

    let panel = service
        .get_market_factors(Some(d(5, 2)), Some(d(5, 31)), Some(&[alpha_asset()]))
        .unwrap();
    assert_eq!(panel.columns(), &["alpha", "beta"]);
    assert_eq!(panel.assets(), vec![alpha_asset()]);
    for (_, row) in panel.iter() {
        assert_relative_eq!(row[1], 1.5, epsilon = 0.1);
    }

    let stored = cache.get(MARKET_FACTORS_KEY).unwrap().unwrap();
    assert_eq!(stored.assets().len(), 2);
}

#[test]
fn test_market_factors_pulled_from_remote() {
    let mut published = Panel::new(["alpha", "beta"]);
    published
        .insert(d(3, 1), alpha_asset(), vec![0.001, 1.4])
        .unwrap();
    published
        .insert(d(3, 1), noise_asset(), vec![0.0, 0.0])
        .unwrap();
    let backend = SqliteBackend::in_memory().unwrap();
    backend
        .publish("research/market_factors.arrow", &published)
        .unwrap();

    let market = market();
    let cache = Arc::new(TieredCache::new(
        MemoryTier::new(),
        RemoteTier::new(backend),
    ));
    let service = MarketFactorService::new(market.clone(), cache, universe(), config());

    let panel = service
        .get_market_factors(None, None, Some(&[alpha_asset()]))
        .unwrap();
    assert_eq!(market.calls(), 0);
    assert_eq!(panel.value(d(3, 1), &alpha_asset(), "beta"), Some(1.4));
    assert_eq!(panel.len(), 1);
}

#[test]
fn test_event_study_end_to_end() {
    let market = market();
    let cache = memory_cache();
    let residuals = Arc::new(residual_service(&market, &cache, None));
    let study = EventStudyService::new(residuals.clone());

    let mut events = EventSet::new(["decile"]).unwrap();
    events
        .push(d(3, 16), alpha_asset(), vec![GroupLabel::Int(1)])
        .unwrap();
    events
        .push(d(4, 20), alpha_asset(), vec![GroupLabel::Int(1)])
        .unwrap();
    events
        .push(d(4, 6), noise_asset(), vec![GroupLabel::Int(2)])
        .unwrap();

    let result = study
        .run_event_study(&events, PriceField::Close, 3, 2)
        .unwrap();
    assert_eq!(result.len(), 12);

    let top = result.rows_for(&[GroupLabel::Int(1)]);
    let times: Vec<i32> = top.iter().map(|r| r.event_time).collect();
    assert_eq!(times, vec![-3, -2, -1, 0, 1, 2]);
    assert!(top.iter().all(|r| r.count == 2));

    // the single-event group reproduces that asset's residuals around 2016-04-06
    let panel = residuals
        .get_market_neutral_residual_returns(
            Some(d(4, 1)),
            Some(d(4, 8)),
            Some(&[noise_asset()]),
            PriceField::Close,
        )
        .unwrap();
    let expected: Vec<f64> = [d(4, 1), d(4, 4), d(4, 5), d(4, 6), d(4, 7), d(4, 8)]
        .iter()
        .map(|date| panel.value(*date, &noise_asset(), "residual_return").unwrap())
        .collect();

    let single = result.rows_for(&[GroupLabel::Int(2)]);
    let mut cumulative = 0.0;
    for (row, value) in single.iter().zip(&expected) {
        cumulative += value;
        assert_eq!(row.count, 1);
        assert_relative_eq!(row.residual_return, *value, epsilon = 1e-12);
        assert_relative_eq!(row.cumulative_residual_return, cumulative, epsilon = 1e-12);
    }
}

#[test]
fn test_event_study_fills_missing_residuals() {
    let market = market();
    let cache = memory_cache();
    let residuals = Arc::new(residual_service(&market, &cache, None));
    let study = EventStudyService::new(residuals);

    // SPY is outside the universe, so it has no residuals at all
    let mut events = EventSet::new(["bucket"]).unwrap();
    events.push(d(3, 16), spy(), vec!["index".into()]).unwrap();

    let result = study
        .run_event_study(&events, PriceField::Close, 2, 2)
        .unwrap();
    assert_eq!(result.len(), 5);
    for row in result.rows() {
        assert_eq!(row.residual_return, 0.0);
        assert_eq!(row.cumulative_residual_return, 0.0);
        assert_eq!(row.count, 1);
    }
}

#[test]
fn test_event_study_without_events() {
    let market = market();
    let cache = memory_cache();
    let study = EventStudyService::new(Arc::new(residual_service(&market, &cache, None)));

    let events = EventSet::new(["decile"]).unwrap();
    let result = study
        .run_event_study(&events, PriceField::Close, 5, 5)
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(market.calls(), 0);
}
