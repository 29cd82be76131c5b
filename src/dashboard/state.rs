//! Dashboard state.
//!
//! Holds the full dataset and base summary as received from the backend, the
//! active filter, and the subset and summary derived from them. Loaded data is
//! replaced wholesale and shared through `Arc`, so readers always see one
//! consistent snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::calculate::{build_summary, clusters_by_category, filter_players, legacy_distribution, recompute, CategoryCluster};
use crate::models::{FilterSelection, LegacyBucket, PlayerRecord, Summary, Taxonomy};

/// Identifies one dataset load. Only the most recently issued ticket may
/// complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Cached dataset plus the view derived for the active filter.
#[derive(Debug, Clone)]
pub struct DashboardState {
    taxonomy: Arc<Taxonomy>,
    players: Arc<Vec<PlayerRecord>>,
    base_summary: Arc<Summary>,
    filter: FilterSelection,
    current_players: Arc<Vec<PlayerRecord>>,
    current_summary: Arc<Summary>,
    latest_ticket: u64,
    loaded: bool,
}

impl DashboardState {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            taxonomy,
            players: Arc::new(Vec::new()),
            base_summary: Arc::new(Summary::default()),
            filter: FilterSelection::all(),
            current_players: Arc::new(Vec::new()),
            current_summary: Arc::new(Summary::default()),
            latest_ticket: 0,
            loaded: false,
        }
    }

    /// Start a load, superseding any load still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        debug!("Starting dataset load #{}", self.latest_ticket);
        LoadTicket(self.latest_ticket)
    }

    /// Whether `ticket` belongs to the newest load.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest_ticket
    }

    /// Install a loaded dataset.
    ///
    /// Returns `false`, leaving the state untouched, when a newer load was
    /// started after `ticket` was issued. Without a server summary the base
    /// summary is computed from the players.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        players: Vec<PlayerRecord>,
        summary: Option<Summary>,
    ) -> bool {
        if !self.is_current(ticket) {
            warn!(
                "Discarding stale dataset load #{} (latest is #{})",
                ticket.0, self.latest_ticket
            );
            return false;
        }

        let base = match summary {
            Some(summary) => summary,
            None => {
                debug!("No server summary, building one from {} players", players.len());
                build_summary(&players, &self.taxonomy)
            }
        };

        info!("Loaded {} players", players.len());
        self.players = Arc::new(players);
        self.base_summary = Arc::new(base);
        self.loaded = true;
        self.refresh();
        true
    }

    /// Change the active filter and recompute the derived view.
    pub fn set_filter(&mut self, filter: FilterSelection) -> Arc<Summary> {
        self.filter = filter;
        self.refresh();
        Arc::clone(&self.current_summary)
    }

    fn refresh(&mut self) {
        let subset = filter_players(&self.players, &self.filter);
        let summary = recompute(&self.players, &self.base_summary, &self.filter, &self.taxonomy);

        debug!(
            "Filter {} / {} selects {} of {} players",
            self.filter.regiao,
            self.filter.vip,
            subset.len(),
            self.players.len()
        );

        self.current_players = Arc::new(subset);
        self.current_summary = Arc::new(summary);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    pub fn filter(&self) -> FilterSelection {
        self.filter
    }

    /// Full, unfiltered dataset.
    pub fn players(&self) -> Arc<Vec<PlayerRecord>> {
        Arc::clone(&self.players)
    }

    /// Summary as received (or built) at load time.
    pub fn base_summary(&self) -> Arc<Summary> {
        Arc::clone(&self.base_summary)
    }

    /// Players matching the active filter.
    pub fn current_players(&self) -> Arc<Vec<PlayerRecord>> {
        Arc::clone(&self.current_players)
    }

    /// Summary for the active filter.
    pub fn current_summary(&self) -> Arc<Summary> {
        Arc::clone(&self.current_summary)
    }

    /// Per-category member lists over the filtered players.
    pub fn clusters(&self, limit: usize) -> Vec<CategoryCluster> {
        clusters_by_category(&self.current_players, &self.taxonomy, limit)
    }

    /// Filtered players collapsed onto the six legacy buckets.
    pub fn legacy_distribution(&self) -> BTreeMap<LegacyBucket, f64> {
        legacy_distribution(&self.current_players, &self.taxonomy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Region, RegionFilter, VipFilter, VipTier};

    fn players() -> Vec<PlayerRecord> {
        vec![
            PlayerRecord::new("a", "⭐ Elite")
                .with_region(Region::Br)
                .with_vip(VipTier::new(2).unwrap())
                .with_scores(80.0, 80.0, 80.0, 80.0),
            PlayerRecord::new("b", "📊 Estável")
                .with_region(Region::Es)
                .with_scores(40.0, 40.0, 40.0, 40.0),
        ]
    }

    fn state() -> DashboardState {
        DashboardState::new(Arc::new(Taxonomy::current()))
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = state();
        assert!(!state.is_loaded());
        assert!(state.players().is_empty());
        assert_eq!(state.current_summary().total_jogadores, 0);
        assert!(state.filter().is_unfiltered());
    }

    #[test]
    fn test_load_without_summary_builds_base() {
        let mut state = state();
        let ticket = state.begin_load();

        assert!(state.complete_load(ticket, players(), None));
        assert!(state.is_loaded());
        assert_eq!(state.base_summary().total_jogadores, 2);
        assert!(state.base_summary().analise_regiao.is_some());
        assert_eq!(state.current_summary(), state.base_summary());
    }

    #[test]
    fn test_load_keeps_server_summary() {
        let mut state = state();
        let server = Summary {
            total_jogadores: 999,
            ..Summary::default()
        };

        let ticket = state.begin_load();
        state.complete_load(ticket, players(), Some(server.clone()));

        assert_eq!(*state.base_summary(), server);
        assert_eq!(*state.current_summary(), server);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut state = state();
        let first = state.begin_load();
        let second = state.begin_load();

        assert!(state.complete_load(second, players(), None));
        assert!(!state.complete_load(first, Vec::new(), None));
        assert_eq!(state.players().len(), 2);
    }

    #[test]
    fn test_older_ticket_completing_first_is_still_stale() {
        let mut state = state();
        let first = state.begin_load();
        let _second = state.begin_load();

        assert!(!state.complete_load(first, players(), None));
        assert!(!state.is_loaded());
    }

    #[test]
    fn test_set_filter_recomputes() {
        let mut state = state();
        let ticket = state.begin_load();
        state.complete_load(ticket, players(), None);

        let summary = state.set_filter(FilterSelection::new(
            RegionFilter::All,
            VipFilter::Only(VipTier::new(2).unwrap()),
        ));

        assert_eq!(summary.total_jogadores, 1);
        assert_eq!(state.current_players().len(), 1);
        assert_eq!(state.players().len(), 2);
    }

    #[test]
    fn test_filter_survives_reload() {
        let mut state = state();
        state.set_filter(FilterSelection::new(RegionFilter::Only(Region::Es), VipFilter::All));

        let ticket = state.begin_load();
        state.complete_load(ticket, players(), None);

        assert_eq!(state.current_players().len(), 1);
        assert_eq!(state.current_summary().regiao_atual.as_deref(), Some("es"));
    }

    #[test]
    fn test_clusters_and_legacy_view_follow_filter() {
        let mut state = state();
        let ticket = state.begin_load();
        state.complete_load(ticket, players(), None);
        state.set_filter(FilterSelection::new(RegionFilter::Only(Region::Br), VipFilter::All));

        let clusters = state.clusters(50);
        let elite = clusters.iter().find(|c| c.key == "elite").unwrap();
        assert_eq!(elite.total, 1);
        assert_eq!(clusters.iter().map(|c| c.total).sum::<usize>(), 1);

        assert_eq!(state.legacy_distribution()[&LegacyBucket::Elite], 100.0);
    }

    #[test]
    fn test_independent_instances() {
        let mut one = state();
        let two = state();

        let ticket = one.begin_load();
        one.complete_load(ticket, players(), None);

        assert!(one.is_loaded());
        assert!(!two.is_loaded());
    }
}
