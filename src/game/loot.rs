//! Loot on the ground and the population controller that decides how much of it to spawn

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::Vec2;
use super::ids::LootId;

/// An uncollected item lying on a road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    pub id: LootId,
    #[serde(rename = "type")]
    pub loot_type: usize,
    pub position: Vec2,
}

/// Spawned, uncollected loot of one session
#[derive(Debug, Clone, Default)]
pub struct LootField {
    items: BTreeMap<LootId, LootItem>,
    next_id: u64,
}

impl LootField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new item under the next id
    pub fn spawn(&mut self, loot_type: usize, position: Vec2) -> LootId {
        let id = LootId(self.next_id);
        self.next_id += 1;
        self.items.insert(
            id,
            LootItem {
                id,
                loot_type,
                position,
            },
        );
        id
    }

    pub fn take(&mut self, id: LootId) -> Option<LootItem> {
        self.items.remove(&id)
    }

    pub fn get(&self, id: LootId) -> Option<&LootItem> {
        self.items.get(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in id order
    pub fn iter(&self) -> impl Iterator<Item = &LootItem> {
        self.items.values()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Rebuild from persisted items. The counter never moves backwards past a restored id.
    pub fn restore(items: Vec<LootItem>, next_id: u64) -> Self {
        let next_id = items
            .iter()
            .map(|item| item.id.0 + 1)
            .max()
            .unwrap_or(0)
            .max(next_id);
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            next_id,
        }
    }
}

/// Periodic spawn settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootGeneratorConfig {
    /// Base interval the probability refers to
    pub period: Duration,
    /// Chance of closing the loot shortage within one period
    pub probability: f64,
}

impl Default for LootGeneratorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            probability: 0.5,
        }
    }
}

/// Time-driven population controller
#[derive(Debug, Clone)]
pub struct LootGenerator {
    config: LootGeneratorConfig,
    time_without_loot: Duration,
}

impl LootGenerator {
    pub fn new(config: LootGeneratorConfig) -> Self {
        Self {
            config,
            time_without_loot: Duration::ZERO,
        }
    }

    pub fn config(&self) -> LootGeneratorConfig {
        self.config
    }

    /// Number of items to spawn after `delta` has elapsed.
    ///
    /// Never more than the shortage of loot relative to looters.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        delta: Duration,
        loot_count: usize,
        looter_count: usize,
        rng: &mut R,
    ) -> usize {
        let roll = rng.gen_range(0.0..=1.0);
        self.generate_with_roll(delta, loot_count, looter_count, roll)
    }

    /// Same as [`generate`](Self::generate) with the random factor supplied by the caller
    pub fn generate_with_roll(
        &mut self,
        delta: Duration,
        loot_count: usize,
        looter_count: usize,
        roll: f64,
    ) -> usize {
        self.time_without_loot = self.time_without_loot.saturating_add(delta);
        let shortage = looter_count.saturating_sub(loot_count);
        if shortage == 0 {
            return 0;
        }

        let period = self.config.period.as_secs_f64();
        let ratio = if period > 0.0 {
            self.time_without_loot.as_secs_f64() / period
        } else {
            f64::INFINITY
        };
        let probability =
            ((1.0 - (1.0 - self.config.probability).powf(ratio)) * roll).clamp(0.0, 1.0);
        let generated = ((shortage as f64) * probability).round() as usize;

        if generated > 0 {
            self.time_without_loot = Duration::ZERO;
        }
        generated.min(shortage)
    }
}

/// Items needed so every actor has loot to chase; a surplus asks for none
pub fn rebalance_count(actor_count: usize, loot_count: usize) -> usize {
    actor_count.saturating_sub(loot_count)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn generator(period_secs: u64, probability: f64) -> LootGenerator {
        LootGenerator::new(LootGeneratorConfig {
            period: Duration::from_secs(period_secs),
            probability,
        })
    }

    #[test]
    fn rebalance_closes_the_gap() {
        assert_eq!(rebalance_count(4, 1), 3);
        assert_eq!(rebalance_count(1, 0), 1);
        assert_eq!(rebalance_count(2, 5), 0);
    }

    #[test]
    fn certain_probability_fills_the_shortage_after_one_period() {
        let mut gen = generator(1, 1.0);
        assert_eq!(gen.generate_with_roll(Duration::from_secs(1), 1, 4, 1.0), 3);
    }

    #[test]
    fn no_shortage_means_no_loot() {
        let mut gen = generator(1, 1.0);
        assert_eq!(gen.generate_with_roll(Duration::from_secs(10), 4, 4, 1.0), 0);
        assert_eq!(gen.generate_with_roll(Duration::from_secs(10), 6, 4, 1.0), 0);
    }

    #[test]
    fn waiting_time_accumulates_until_something_spawns() {
        let mut gen = generator(10, 0.5);
        // half of one period: 1 - 0.5^0.05 ~= 0.034, rounds to zero for one looter
        assert_eq!(gen.generate_with_roll(Duration::from_millis(500), 0, 1, 1.0), 0);
        // ten more periods accumulate onto the same timer
        assert_eq!(gen.generate_with_roll(Duration::from_secs(100), 0, 1, 1.0), 1);
        // timer was reset by the spawn
        assert_eq!(gen.generate_with_roll(Duration::from_millis(500), 0, 1, 1.0), 0);
    }

    #[test]
    fn huge_deltas_saturate_the_wait() {
        let mut gen = generator(5, 0.5);
        for _ in 0..2000 {
            assert_eq!(gen.generate_with_roll(Duration::from_millis(u64::MAX), 3, 3, 1.0), 0);
        }
        assert_eq!(gen.generate_with_roll(Duration::from_millis(u64::MAX), 0, 2, 1.0), 2);
    }

    #[test]
    fn zero_roll_spawns_nothing() {
        let mut gen = generator(1, 1.0);
        assert_eq!(gen.generate_with_roll(Duration::from_secs(5), 0, 10, 0.0), 0);
    }

    #[test]
    fn random_generation_stays_within_the_shortage() {
        let mut gen = generator(1, 0.7);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for step in 0..500 {
            let loot = step % 7;
            let looters = step % 11;
            let spawned = gen.generate(Duration::from_millis(250), loot, looters, &mut rng);
            assert!(spawned <= looters.saturating_sub(loot));
        }
    }

    #[test]
    fn field_ids_strictly_increase() {
        let mut field = LootField::new();
        let a = field.spawn(0, Vec2::ZERO);
        let b = field.spawn(1, Vec2::ZERO);
        field.take(b).unwrap();
        let c = field.spawn(0, Vec2::ZERO);
        assert!(a < b && b < c);
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn restored_field_keeps_counting_past_existing_ids() {
        let items = vec![LootItem {
            id: LootId(9),
            loot_type: 0,
            position: Vec2::ZERO,
        }];
        let mut field = LootField::restore(items, 3);
        assert_eq!(field.spawn(0, Vec2::ZERO), LootId(10));
    }
}
