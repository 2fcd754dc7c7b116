//! In-memory aggregate store for per-user mint totals

use {
    crate::conversion,
    alloy::primitives::{Address, U256, U512},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// One user's accumulated totals, as persisted and served.
///
/// Amounts travel as decimal strings so no JSON consumer ever rounds them
/// through a float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAggregate {
    pub user: Address,
    #[serde(with = "dec_str")]
    pub primary_amount: U512,
    #[serde(with = "dec_str")]
    pub secondary_amount: U512,
}

/// Running totals per user address.
///
/// The ingestion engine is the only writer; the query service reads sorted
/// snapshots through a shared handle. Totals are 512 bits wide while event
/// amounts are 256, so accumulation has no overflow path for any reachable
/// event history.
#[derive(Debug, Clone, Default)]
pub struct MintAggregator {
    totals: HashMap<Address, Totals>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    primary: U512,
    secondary: U512,
}

impl MintAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted snapshot.
    pub fn from_entries(entries: Vec<UserAggregate>) -> Self {
        let totals = entries
            .into_iter()
            .map(|entry| {
                (
                    entry.user,
                    Totals {
                        primary: entry.primary_amount,
                        secondary: entry.secondary_amount,
                    },
                )
            })
            .collect();
        Self { totals }
    }

    /// Fold one mint event into the user's totals.
    ///
    /// The secondary accrual is fixed at apply time from the event's cycle:
    /// `floor(amount * 100 / round(factor * 100))` in integer arithmetic.
    pub fn apply(&mut self, user: Address, amount: U256, cycle_id: u32) {
        let delta = secondary_delta(amount, cycle_id);
        let entry = self.totals.entry(user).or_default();
        entry.primary += U512::from(amount);
        entry.secondary += delta;
    }

    /// Current totals for one user.
    pub fn get(&self, user: &Address) -> Option<UserAggregate> {
        self.totals.get(user).map(|totals| UserAggregate {
            user: *user,
            primary_amount: totals.primary,
            secondary_amount: totals.secondary,
        })
    }

    /// Number of users with at least one accrual.
    pub fn user_count(&self) -> usize {
        self.totals.len()
    }

    /// Full aggregate, sorted by primary amount descending. Ties break on
    /// user address so snapshots are deterministic.
    pub fn snapshot(&self) -> Vec<UserAggregate> {
        let mut entries: Vec<UserAggregate> = self
            .totals
            .iter()
            .map(|(user, totals)| UserAggregate {
                user: *user,
                primary_amount: totals.primary,
                secondary_amount: totals.secondary,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.primary_amount
                .cmp(&a.primary_amount)
                .then_with(|| a.user.cmp(&b.user))
        });
        entries
    }
}

/// Base-denomination accrual for one event:
/// `floor(amount * 100 / round(factor * 100))`, widened to 512 bits so the
/// multiply is exact for full-range amounts.
pub fn secondary_delta(amount: U256, cycle_id: u32) -> U512 {
    let scale = conversion::conversion_scale(cycle_id);
    U512::from(amount) * U512::from(100u64) / U512::from(scale)
}

/// Decimal-string serde for amount fields.
pub(crate) mod dec_str {
    use {
        serde::{de, Deserialize, Deserializer, Serializer},
        std::{fmt::Display, str::FromStr},
    };

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
