//! Role dealing: quota → shuffled tokens → assignment plus graveyard.

use lycan_protocol::{RoleId, RoleQuota, UserId};
use rand::Rng;

use crate::GameError;

/// Result of one deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    /// One role per participant, in the join order that was passed in.
    pub assignment: Vec<(UserId, RoleId)>,
    /// Tokens left over after every participant got one.
    pub graveyard: Vec<RoleId>,
}

/// Expands a quota into its multiset of tokens, in catalog order.
pub fn role_tokens(quota: &RoleQuota) -> Vec<RoleId> {
    quota
        .iter()
        .flat_map(|(role, count)| std::iter::repeat_n(role, count as usize))
        .collect()
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Deals `quota` to `participants`.
///
/// The first `participants.len()` shuffled tokens go to participants in
/// order; the rest become the graveyard.
///
/// # Errors
/// [`GameError::NotEnoughRoles`] if the quota has fewer tokens than
/// participants. Nothing is assigned in that case.
pub fn deal<R: Rng + ?Sized>(
    quota: &RoleQuota,
    participants: &[UserId],
    rng: &mut R,
) -> Result<Deal, GameError> {
    let mut tokens = role_tokens(quota);
    if tokens.len() < participants.len() {
        return Err(GameError::NotEnoughRoles {
            roles: tokens.len(),
            participants: participants.len(),
        });
    }

    shuffle(&mut tokens, rng);
    let graveyard = tokens.split_off(participants.len());
    let assignment = participants.iter().copied().zip(tokens).collect();

    Ok(Deal {
        assignment,
        graveyard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn users(n: u64) -> Vec<UserId> {
        (1..=n).map(UserId).collect()
    }

    #[test]
    fn test_role_tokens_expands_counts() {
        let quota = RoleQuota::from_counts([
            (RoleId::Villager, 2),
            (RoleId::Werewolf, 1),
        ]);
        assert_eq!(
            role_tokens(&quota),
            vec![RoleId::Villager, RoleId::Villager, RoleId::Werewolf]
        );
    }

    #[test]
    fn test_deal_assigns_in_join_order_and_keeps_leftovers() {
        let quota = RoleQuota::from_counts([
            (RoleId::Villager, 3),
            (RoleId::Werewolf, 2),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let players = users(3);

        let deal = deal(&quota, &players, &mut rng).unwrap();

        let order: Vec<_> = deal.assignment.iter().map(|(u, _)| *u).collect();
        assert_eq!(order, players);
        assert_eq!(deal.graveyard.len(), 2);

        let mut all: Vec<_> = deal.assignment.iter().map(|(_, r)| *r).collect();
        all.extend(&deal.graveyard);
        all.sort();
        let mut expected = role_tokens(&quota);
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_deal_too_few_roles_returns_error() {
        let quota = RoleQuota::from_counts([(RoleId::Werewolf, 1)]);
        let mut rng = StdRng::seed_from_u64(1);
        let err = deal(&quota, &users(2), &mut rng).unwrap_err();
        assert_eq!(
            err,
            GameError::NotEnoughRoles {
                roles: 1,
                participants: 2
            }
        );
    }

    #[test]
    fn test_deal_same_seed_same_result() {
        let quota = RoleQuota::from_counts([
            (RoleId::Villager, 3),
            (RoleId::Werewolf, 2),
            (RoleId::Seer, 1),
        ]);
        let a = deal(&quota, &users(4), &mut StdRng::seed_from_u64(99)).unwrap();
        let b = deal(&quota, &users(4), &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffle_every_position_reachable() {
        // 3 items, 6000 shuffles: each item should land in each slot
        // roughly 2000 times.
        let mut rng = StdRng::seed_from_u64(2024);
        let mut hits = [[0u32; 3]; 3];
        for _ in 0..6000 {
            let mut items = [0usize, 1, 2];
            shuffle(&mut items, &mut rng);
            for (slot, item) in items.iter().enumerate() {
                hits[*item][slot] += 1;
            }
        }
        for row in hits {
            for count in row {
                assert!((1700..2300).contains(&count), "skewed: {hits:?}");
            }
        }
    }

    #[test]
    fn test_shuffle_empty_and_single_are_untouched() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut empty: [u8; 0] = [];
        shuffle(&mut empty, &mut rng);
        let mut one = [5];
        shuffle(&mut one, &mut rng);
        assert_eq!(one, [5]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn deal_fails_iff_quota_is_short(
                villagers in 0u32..6,
                werewolves in 0u32..4,
                seers in 0u32..2,
                n in 0u64..10,
                seed in 0u64..1000,
            ) {
                let quota = RoleQuota::from_counts([
                    (RoleId::Villager, villagers),
                    (RoleId::Werewolf, werewolves),
                    (RoleId::Seer, seers),
                ]);
                let total = quota.total();
                let players = users(n);
                let mut rng = StdRng::seed_from_u64(seed);

                match deal(&quota, &players, &mut rng) {
                    Ok(d) => {
                        prop_assert!(total >= players.len());
                        prop_assert_eq!(d.assignment.len(), players.len());
                        prop_assert_eq!(d.graveyard.len(), total - players.len());
                    }
                    Err(_) => prop_assert!(total < players.len()),
                }
            }
        }
    }
}
