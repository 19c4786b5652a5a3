use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{LeagueMember, RosterEntry};
use crate::duel::SideLabel;

/// A rated player taken from a roster snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub rating: f64,
    pub side: SideLabel,
}

impl Participant {
    pub fn new(user_id: Uuid, rating: Option<f64>, side: Option<&str>) -> Self {
        Self {
            user_id,
            rating: rating.unwrap_or(0.0),
            side: SideLabel::new(side),
        }
    }

    /// Builds a participant from a confirmed roster row and the player's league standing, if any.
    pub fn from_roster(entry: &RosterEntry, member: Option<&LeagueMember>) -> Self {
        Self::new(
            entry.user_id,
            member.and_then(|m| m.rating),
            entry.team_side.as_deref(),
        )
    }
}

/// Two disjoint teams that together hold every balanced participant exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team_a: Vec<Participant>,
    pub team_b: Vec<Participant>,
}

impl TeamAssignment {
    pub fn rating_sums(&self) -> (f64, f64) {
        (sum(&self.team_a), sum(&self.team_b))
    }

    /// The absolute difference between both teams' total rating.
    pub fn rating_gap(&self) -> f64 {
        let (a, b) = self.rating_sums();
        (a - b).abs()
    }
}

fn sum(team: &[Participant]) -> f64 {
    team.iter().map(|p| p.rating).sum()
}

/// Splits players into two teams of similar total rating.
///
/// Players are visited from the highest rating down, each joining whichever team
/// currently has the lower total. Ties go to team A, and players with equal
/// ratings keep their input order.
pub fn balance(mut players: Vec<Participant>) -> TeamAssignment {
    players.sort_by(|a, b| b.rating.total_cmp(&a.rating));

    let mut assignment = TeamAssignment {
        team_a: Vec::with_capacity(players.len() / 2 + 1),
        team_b: Vec::with_capacity(players.len() / 2 + 1),
    };
    let (mut sum_a, mut sum_b) = (0.0, 0.0);

    for player in players {
        if sum_a <= sum_b {
            sum_a += player.rating;
            assignment.team_a.push(player);
        } else {
            sum_b += player.rating;
            assignment.team_b.push(player);
        }
    }

    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rated(ratings: &[f64]) -> Vec<Participant> {
        ratings
            .iter()
            .map(|r| Participant::new(Uuid::new_v4(), Some(*r), None))
            .collect()
    }

    #[test]
    fn empty_roster_gives_empty_teams() {
        let assignment = balance(Vec::new());
        assert!(assignment.team_a.is_empty());
        assert!(assignment.team_b.is_empty());
    }

    #[test]
    fn tops_up_the_lighter_side() {
        let players = rated(&[3.0, 9.0, 5.0, 4.0]);
        let ids: Vec<Uuid> = players.iter().map(|p| p.user_id).collect();

        let assignment = balance(players);

        // 9 -> A, 5 -> B, 4 -> B (9 > 5), 3 -> A (9 <= 9)
        let team_a: Vec<Uuid> = assignment.team_a.iter().map(|p| p.user_id).collect();
        let team_b: Vec<Uuid> = assignment.team_b.iter().map(|p| p.user_id).collect();
        assert_eq!(team_a, vec![ids[1], ids[0]]);
        assert_eq!(team_b, vec![ids[2], ids[3]]);
        assert_eq!(assignment.rating_sums(), (12.0, 9.0));
    }

    #[test]
    fn equal_sums_favour_team_a() {
        let players = rated(&[2.0, 2.0]);
        let first = players[0].user_id;

        let assignment = balance(players);

        assert_eq!(assignment.team_a[0].user_id, first);
        assert_eq!(assignment.team_b.len(), 1);
    }

    #[test]
    fn equal_ratings_keep_input_order() {
        let players = rated(&[1.0, 1.0, 1.0, 1.0]);
        let ids: Vec<Uuid> = players.iter().map(|p| p.user_id).collect();

        let assignment = balance(players);

        let team_a: Vec<Uuid> = assignment.team_a.iter().map(|p| p.user_id).collect();
        let team_b: Vec<Uuid> = assignment.team_b.iter().map(|p| p.user_id).collect();
        assert_eq!(team_a, vec![ids[0], ids[2]]);
        assert_eq!(team_b, vec![ids[1], ids[3]]);
    }

    #[test]
    fn one_heavy_player_can_outweigh_several() {
        let assignment = balance(rated(&[10.0, 1.0, 1.0, 1.0]));

        assert_eq!(assignment.team_a.len(), 1);
        assert_eq!(assignment.team_b.len(), 3);
        assert_eq!(assignment.rating_gap(), 7.0);
    }

    #[test]
    fn missing_and_negative_ratings_are_accepted() {
        let players = vec![
            Participant::new(Uuid::new_v4(), None, Some(" a ")),
            Participant::new(Uuid::new_v4(), Some(-2.5), None),
            Participant::new(Uuid::new_v4(), Some(1.0), Some("B")),
        ];

        let assignment = balance(players);

        assert_eq!(assignment.team_a.len() + assignment.team_b.len(), 3);
        assert_eq!(assignment.team_a[0].rating, 1.0);
        assert_eq!(assignment.team_b[0].rating, 0.0);
        assert_eq!(assignment.team_b[0].side.as_str(), "A");
    }

    proptest! {
        #[test]
        fn every_player_lands_on_exactly_one_team(
            ratings in prop::collection::vec(0.0f64..100.0, 1..40)
        ) {
            let players = rated(&ratings);
            let mut expected: Vec<Uuid> = players.iter().map(|p| p.user_id).collect();

            let assignment = balance(players);

            let mut actual: Vec<Uuid> = assignment
                .team_a
                .iter()
                .chain(assignment.team_b.iter())
                .map(|p| p.user_id)
                .collect();
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn even_ratings_split_evenly(rating in 0.5f64..100.0, count in 1usize..40) {
            let assignment = balance(rated(&vec![rating; count]));
            let diff = assignment.team_a.len() as i64 - assignment.team_b.len() as i64;
            prop_assert!(
                diff.abs() <= 1,
                "sizes {} and {}",
                assignment.team_a.len(),
                assignment.team_b.len()
            );
        }

        #[test]
        fn gap_never_exceeds_the_highest_rating(
            ratings in prop::collection::vec(0.0f64..100.0, 0..40)
        ) {
            let highest = ratings.iter().cloned().fold(0.0, f64::max);
            let assignment = balance(rated(&ratings));
            prop_assert!(assignment.rating_gap() <= highest + 1e-9);
        }
    }
}
