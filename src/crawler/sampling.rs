//! Song sampling and year filtering for catalog fan-out

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Picks at most `max_songs` of `items`
///
/// With `choose_random` the subset is drawn with a generator seeded from
/// `seed` and returned in catalog order, so the same seed and catalog always
/// give the same songs. Otherwise the first `max_songs` are kept.
pub fn sample_songs<T: Clone>(
    items: &[T],
    max_songs: Option<usize>,
    choose_random: bool,
    seed: u64,
) -> Vec<T> {
    let limit = max_songs.unwrap_or(items.len()).min(items.len());

    if !choose_random {
        return items[..limit].to_vec();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, items.len(), limit).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| items[i].clone()).collect()
}

/// Inclusive year bounds of an artist target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearFilter {
    pub year_after: Option<i32>,
    pub year_before: Option<i32>,
    pub include_unknown_year: bool,
}

impl YearFilter {
    pub fn is_bounded(&self) -> bool {
        self.year_after.is_some() || self.year_before.is_some()
    }

    /// An unknown year passes only when unknown years are wanted or no
    /// bound is set
    pub fn accepts(&self, year: Option<i32>) -> bool {
        match year {
            None => self.include_unknown_year || !self.is_bounded(),
            Some(year) => {
                self.year_after.map_or(true, |after| year >= after)
                    && self.year_before.map_or(true, |before| year <= before)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<u32> {
        (0..20).collect()
    }

    #[test]
    fn test_first_songs_without_random() {
        assert_eq!(sample_songs(&catalog(), Some(3), false, 1), vec![0, 1, 2]);
        assert_eq!(sample_songs(&catalog(), None, false, 1).len(), 20);
        assert_eq!(sample_songs(&[1, 2], Some(5), false, 1), vec![1, 2]);
    }

    #[test]
    fn test_random_sample_is_reproducible() {
        let first = sample_songs(&catalog(), Some(5), true, 123456);
        let second = sample_songs(&catalog(), Some(5), true, 123456);

        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        assert!(first.windows(2).all(|w| w[0] < w[1]), "catalog order kept");
    }

    #[test]
    fn test_random_sample_without_limit_keeps_everything() {
        assert_eq!(sample_songs(&catalog(), None, true, 7), catalog());
    }

    #[test]
    fn test_year_filter_bounds_are_inclusive() {
        let filter = YearFilter {
            year_after: Some(1970),
            year_before: Some(1979),
            include_unknown_year: false,
        };
        assert!(filter.accepts(Some(1970)));
        assert!(filter.accepts(Some(1979)));
        assert!(!filter.accepts(Some(1969)));
        assert!(!filter.accepts(Some(1980)));
        assert!(!filter.accepts(None));
    }

    #[test]
    fn test_year_filter_single_bound() {
        let filter = YearFilter {
            year_after: Some(1990),
            ..Default::default()
        };
        assert!(filter.accepts(Some(2020)));
        assert!(!filter.accepts(Some(1989)));
    }

    #[test]
    fn test_unknown_year() {
        assert!(YearFilter::default().accepts(None));

        let filter = YearFilter {
            year_before: Some(1980),
            include_unknown_year: true,
            ..Default::default()
        };
        assert!(filter.accepts(None));
    }
}
