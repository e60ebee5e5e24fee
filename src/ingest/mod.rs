/// Upstream data sources.
///
/// Each source gets its own file: URL construction plus response parsing,
/// no transport. Requests go through `crate::fetch::Fetcher`.

pub mod noaa;
pub mod openweather;

#[cfg(test)]
pub(crate) mod fixtures;
