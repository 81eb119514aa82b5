//! Manifold Trading Bot Library
//!
//! Two tools for Manifold prediction markets:
//!
//! 1. **Market selection**: Pick the open binary markets closing around a
//!    target day, ranked by bad tags, bettor count and lateness, and write
//!    them to a report file.
//!
//! 2. **Betting bot**: Read market URLs (a selection report works), gather
//!    context, decide BUY_YES / BUY_NO / DO_NOTHING and optionally bet.

pub mod bot;
pub mod config;
pub mod executor;
pub mod scanner;
pub mod selection;
pub mod services;
pub mod strategies;
pub mod types;

pub use bot::{Bot, HttpMarketFetcher, MarketFetcher, MockMarketFetcher, RunSummary};
pub use config::Config;
pub use executor::{Bettor, ExecutionResult, HttpBettor};
pub use scanner::{ListingSource, ManifoldScanner};
pub use selection::{select_markets, BettorRange, FilterConfig, Market, SelectionError, SelectionParams};
pub use strategies::{DecisionMaker, ForecastDecisionMaker, RandomDecisionMaker};
pub use types::{Choice, Decision, MarketData, Outcome};
