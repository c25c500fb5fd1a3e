pub mod bar;
pub mod cache;
pub mod loader;

pub use bar::{format_instant, parse_instant, PriceBar, PriceSeries, RangeBound};
pub use cache::CachedPriceSource;
pub use loader::{filter_by_symbol, load_csv, CsvPriceSource, InMemoryPriceSource, PriceSource};
