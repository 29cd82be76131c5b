use crate::models::{FilterSelection, PlayerRecord};

/// Keep the players matching both the region and the VIP dimension.
///
/// Order is preserved and the input is left untouched.
pub fn filter_players(players: &[PlayerRecord], selection: &FilterSelection) -> Vec<PlayerRecord> {
    if selection.is_unfiltered() {
        return players.to_vec();
    }

    players
        .iter()
        .filter(|p| selection.matches(p))
        .cloned()
        .collect()
}
