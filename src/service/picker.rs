//! 随机复习词条选择

use rand::Rng;

use crate::domain::EntryId;

/// 从候选ID中随机选一个，尽量避开 `exclude`
///
/// - 没有候选时返回 `None`
/// - 只有一个候选时直接返回它，即使它等于 `exclude`
/// - 否则均匀抽取，抽到 `exclude` 就重抽，直到得到不同的ID
///
/// 候选ID应互不相同；若全部等于 `exclude`，返回第一个。
pub fn pick_random_id<R>(ids: &[EntryId], exclude: Option<EntryId>, rng: &mut R) -> Option<EntryId>
where
    R: Rng + ?Sized,
{
    match ids {
        [] => None,
        [only] => Some(*only),
        _ => {
            let Some(exclude) = exclude else {
                return Some(ids[rng.gen_range(0..ids.len())]);
            };
            if ids.iter().all(|id| *id == exclude) {
                return Some(ids[0]);
            }
            loop {
                let id = ids[rng.gen_range(0..ids.len())];
                if id != exclude {
                    return Some(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_empty_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_random_id(&[], Some(1), &mut rng), None);
        assert_eq!(pick_random_id(&[], None, &mut rng), None);
    }

    #[test]
    fn test_single_candidate_repeats() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            assert_eq!(pick_random_id(&[7], Some(7), &mut rng), Some(7));
        }
    }

    #[test]
    fn test_excluded_id_never_returned() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            assert_eq!(pick_random_id(&[1, 2], Some(1), &mut rng), Some(2));
        }

        let ids = [10, 20, 30, 40];
        for _ in 0..500 {
            let picked = pick_random_id(&ids, Some(30), &mut rng).unwrap();
            assert_ne!(picked, 30);
            assert!(ids.contains(&picked));
        }
    }

    #[test]
    fn test_every_other_candidate_reachable() {
        let mut rng = StdRng::seed_from_u64(4);
        let ids = [1, 2, 3, 4, 5];
        let seen: HashSet<_> = (0..1000)
            .filter_map(|_| pick_random_id(&ids, Some(3), &mut rng))
            .collect();
        assert_eq!(seen, HashSet::from([1, 2, 4, 5]));
    }
}
