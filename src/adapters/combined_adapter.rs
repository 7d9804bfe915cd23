//! Aggregation of several data providers behind one [`DataPort`].

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::error::ExplodersError;
use crate::domain::market_chart::RawSeries;
use crate::ports::data_port::DataPort;

pub type SharedDataPort = Box<dyn DataPort + Send + Sync>;

/// Merges providers in the order given. An asset belongs to the first
/// provider that lists it, compared case-insensitively; later listings of
/// the same symbol are dropped. Fetches use the owner's own spelling, so a
/// lowercased request still reaches `PEPE.csv`. A provider whose listing
/// fails contributes nothing.
pub struct CombinedDataPort {
    providers: Vec<SharedDataPort>,
    index: OnceLock<Listing>,
}

#[derive(Debug, Default)]
struct Listing {
    assets: Vec<String>,
    /// Lowercased symbol to owning provider and its listed spelling.
    owners: HashMap<String, (usize, String)>,
}

impl CombinedDataPort {
    pub fn new(providers: Vec<SharedDataPort>) -> Self {
        Self {
            providers,
            index: OnceLock::new(),
        }
    }

    fn listing(&self) -> &Listing {
        self.index.get_or_init(|| {
            let mut listing = Listing::default();
            for (i, provider) in self.providers.iter().enumerate() {
                let assets = match provider.list_assets() {
                    Ok(a) => a,
                    Err(e) => {
                        warn!(provider = provider.name(), error = %e, "provider listing failed");
                        continue;
                    }
                };
                let before = listing.assets.len();
                for asset in assets {
                    let key = asset.to_lowercase();
                    if !listing.owners.contains_key(&key) {
                        listing.owners.insert(key, (i, asset.clone()));
                        listing.assets.push(asset);
                    }
                }
                info!(
                    provider = provider.name(),
                    added = listing.assets.len() - before,
                    "merged provider listing"
                );
            }
            listing
        })
    }
}

impl DataPort for CombinedDataPort {
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RawSeries, ExplodersError> {
        let (owner, listed) = self
            .listing()
            .owners
            .get(&asset.to_lowercase())
            .and_then(|(i, listed)| Some((self.providers.get(*i)?, listed)))
            .ok_or_else(|| ExplodersError::Unavailable {
                asset: asset.to_string(),
                reason: "no provider lists this asset".into(),
            })?;
        owner.fetch_series(listed, start_date, end_date)
    }

    fn list_assets(&self) -> Result<Vec<String>, ExplodersError> {
        Ok(self.listing().assets.clone())
    }

    fn name(&self) -> &str {
        "combined"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        assets: Vec<&'static str>,
        price: f64,
    }

    impl DataPort for Fixed {
        /// Serves only the exact spellings it lists.
        fn fetch_series(
            &self,
            asset: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<RawSeries, ExplodersError> {
            if !self.assets.iter().any(|listed| *listed == asset) {
                return Err(ExplodersError::Unavailable {
                    asset: asset.into(),
                    reason: format!("{} has no {asset}", self.name),
                });
            }
            Ok(RawSeries {
                prices: vec![(0, self.price)],
                ..Default::default()
            })
        }

        fn list_assets(&self) -> Result<Vec<String>, ExplodersError> {
            Ok(self.assets.iter().map(|s| s.to_string()).collect())
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    struct Down;

    impl DataPort for Down {
        fn fetch_series(
            &self,
            asset: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<RawSeries, ExplodersError> {
            Err(ExplodersError::Unavailable {
                asset: asset.into(),
                reason: "down".into(),
            })
        }

        fn list_assets(&self) -> Result<Vec<String>, ExplodersError> {
            Err(ExplodersError::Io(std::io::Error::other("connection refused")))
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn combined() -> CombinedDataPort {
        CombinedDataPort::new(vec![
            Box::new(Fixed {
                name: "first",
                assets: vec!["pepe", "bonk"],
                price: 1.0,
            }),
            Box::new(Down),
            Box::new(Fixed {
                name: "second",
                assets: vec!["PEPE", "wif"],
                price: 2.0,
            }),
        ])
    }

    #[test]
    fn first_writer_wins_case_insensitive() {
        let port = combined();
        assert_eq!(port.list_assets().unwrap(), vec!["pepe", "bonk", "wif"]);
    }

    #[test]
    fn fetch_routes_to_owner() {
        let port = combined();
        assert_eq!(port.fetch_series("PEPE", day(), day()).unwrap().prices[0].1, 1.0);
        assert_eq!(port.fetch_series("wif", day(), day()).unwrap().prices[0].1, 2.0);
    }

    #[test]
    fn fetch_uses_listed_spelling() {
        let port = CombinedDataPort::new(vec![Box::new(Fixed {
            name: "upper",
            assets: vec!["PEPE", "Bonk"],
            price: 3.0,
        })]);
        assert_eq!(port.fetch_series("pepe", day(), day()).unwrap().prices[0].1, 3.0);
        assert_eq!(port.fetch_series("BONK", day(), day()).unwrap().prices[0].1, 3.0);
    }

    #[test]
    fn unknown_asset_is_unavailable() {
        let port = combined();
        let err = port.fetch_series("ghost", day(), day()).unwrap_err();
        assert!(matches!(err, ExplodersError::Unavailable { .. }));
    }
}
