use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::{
    analyze_vip, distribution, filter_players, percent, round2, ScoreMeans, COHORT_TOP_LIMIT,
    RISK_LIST_LIMIT, TOP_PLAYERS_LIMIT,
};
use crate::models::{
    CounterStats, FilterSelection, PlayerRecord, Region, RegionAnalysis, RiskKind, Summary,
    Taxonomy,
};

/// The first `limit` players by descending `score_geral`.
///
/// The sort is stable, so players with equal scores keep their input order.
/// The input slice is not reordered.
pub fn rank_by_score(players: &[PlayerRecord], limit: usize) -> Vec<PlayerRecord> {
    let mut ranked: Vec<&PlayerRecord> = players.iter().collect();
    ranked.sort_by(|a, b| b.score_geral.total_cmp(&a.score_geral));
    ranked.into_iter().take(limit).cloned().collect()
}

/// Top 10 players by `score_geral`.
pub fn top_players(players: &[PlayerRecord]) -> Vec<PlayerRecord> {
    rank_by_score(players, TOP_PLAYERS_LIMIT)
}

/// Up to 50 players of the taxonomy's risk category of the given kind.
///
/// Empty when the taxonomy has no category flagged for that risk.
pub fn risk_players(players: &[PlayerRecord], kind: RiskKind, taxonomy: &Taxonomy) -> Vec<PlayerRecord> {
    let Some(category) = taxonomy.risk_category(kind) else {
        return Vec::new();
    };

    let members: Vec<PlayerRecord> = players
        .iter()
        .filter(|p| taxonomy.resolve(&p.categoria).is_some_and(|c| c.key == category.key))
        .cloned()
        .collect();

    rank_by_score(&members, RISK_LIST_LIMIT)
}

/// Members of one taxonomy category, ready for a cluster table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCluster {
    pub key: String,
    pub label: String,
    pub badge_class: String,
    /// Suggested CRM action for the segment.
    pub acao_crm: String,
    pub total: usize,
    pub players: Vec<PlayerRecord>,
}

/// Every taxonomy category with its highest-scoring members.
///
/// `total` counts all members; `players` is truncated to `limit`.
pub fn clusters_by_category(
    players: &[PlayerRecord],
    taxonomy: &Taxonomy,
    limit: usize,
) -> Vec<CategoryCluster> {
    taxonomy
        .categories
        .iter()
        .map(|category| {
            let members: Vec<PlayerRecord> = players
                .iter()
                .filter(|p| taxonomy.resolve(&p.categoria).is_some_and(|c| c.key == category.key))
                .cloned()
                .collect();

            CategoryCluster {
                key: category.key.clone(),
                label: category.label.clone(),
                badge_class: taxonomy.badge_class(&category.label).to_string(),
                acao_crm: taxonomy.crm_action(&category.label).to_string(),
                total: members.len(),
                players: rank_by_score(&members, limit),
            }
        })
        .collect()
}

/// Per-region statistics for every region with at least one player.
pub fn analyze_regions(players: &[PlayerRecord], taxonomy: &Taxonomy) -> BTreeMap<String, RegionAnalysis> {
    let mut regions = BTreeMap::new();

    for region in Region::ALL {
        let members: Vec<PlayerRecord> = players
            .iter()
            .filter(|p| p.regiao == Some(region))
            .cloned()
            .collect();

        if members.is_empty() {
            continue;
        }

        let means = ScoreMeans::from_players(&members);
        let active = members.iter().filter(|p| p.ativo).count();

        regions.insert(
            region.code().to_string(),
            RegionAnalysis {
                codigo: region.code().to_string(),
                nome: region.display_name().to_string(),
                quantidade: members.len() as u64,
                percentual: round2(percent(members.len(), players.len())),
                score_geral_medio: means.geral,
                score_login_medio: means.login,
                score_engajamento_medio: means.engajamento,
                score_compras_medio: means.compras,
                percentual_ativos: round2(percent(active, members.len())),
                distribuicao_categorias: distribution(&members, taxonomy),
                top_3: rank_by_score(&members, COHORT_TOP_LIMIT),
            },
        );
    }

    regions
}

/// Every field derived from `players` alone.
fn aggregate(players: &[PlayerRecord], taxonomy: &Taxonomy) -> Summary {
    let means = ScoreMeans::from_players(players);
    let active = players.iter().filter(|p| p.ativo).count();

    Summary {
        total_jogadores: players.len() as u64,
        percentual_ativos: round2(percent(active, players.len())),
        media_saude_login: means.login,
        media_saude_engajamento: means.engajamento,
        media_saude_compras: means.compras,
        media_pontuacao_geral: means.geral,
        distribuicao_categorias: distribution(players, taxonomy),
        top_jogadores: top_players(players),
        jogadores_risco_receita: risk_players(players, RiskKind::Receita, taxonomy),
        jogadores_risco_engajamento: risk_players(players, RiskKind::Engajamento, taxonomy),
        estatisticas: CounterStats::from_players(players),
        analise_vip: analyze_vip(players, taxonomy),
        ..Summary::default()
    }
}

/// Build a complete base summary from a full dataset.
///
/// Used when no server-computed summary is available. Includes the
/// per-region analysis that `recompute` uses for region-only filters.
pub fn build_summary(players: &[PlayerRecord], taxonomy: &Taxonomy) -> Summary {
    let mut summary = aggregate(players, taxonomy);
    summary.analise_regiao = Some(analyze_regions(players, taxonomy));
    summary
}

/// Derive the summary for a filter selection.
///
/// - No filter: `base` unchanged.
/// - Region only, with a precomputed analysis for that region in `base`: the
///   precomputed scalars, with player lists, counter statistics and VIP
///   cohorts derived from the filtered subset.
/// - Filtered subset empty: `base` unchanged.
/// - Otherwise: every field recomputed from the filtered subset.
///
/// Fields this crate does not derive are carried over from `base`.
pub fn recompute(
    players: &[PlayerRecord],
    base: &Summary,
    selection: &FilterSelection,
    taxonomy: &Taxonomy,
) -> Summary {
    if selection.is_unfiltered() {
        debug!("No active filter, using base summary");
        return base.clone();
    }

    let subset = filter_players(players, selection);
    let region = selection.regiao.region();

    if selection.vip.tier().is_none() {
        if let Some(analysis) = region.and_then(|r| base.region_analysis(r)) {
            debug!(
                "Using precomputed analysis for region {} ({} players in subset)",
                analysis.codigo,
                subset.len()
            );

            let mut distribuicao = analysis.distribuicao_categorias.clone();
            taxonomy.fill_missing(&mut distribuicao);

            return Summary {
                total_jogadores: analysis.quantidade,
                percentual_ativos: analysis.percentual_ativos,
                media_saude_login: analysis.score_login_medio,
                media_saude_engajamento: analysis.score_engajamento_medio,
                media_saude_compras: analysis.score_compras_medio,
                media_pontuacao_geral: analysis.score_geral_medio,
                distribuicao_categorias: distribuicao,
                top_jogadores: top_players(&subset),
                jogadores_risco_receita: risk_players(&subset, RiskKind::Receita, taxonomy),
                jogadores_risco_engajamento: risk_players(&subset, RiskKind::Engajamento, taxonomy),
                estatisticas: CounterStats::from_players(&subset),
                analise_vip: analyze_vip(&subset, taxonomy),
                analise_regiao: base.analise_regiao.clone(),
                regiao_atual: Some(analysis.codigo.clone()),
                regiao_nome: Some(analysis.nome.clone()),
                extra: base.extra.clone(),
            };
        }
    }

    if subset.is_empty() {
        debug!("Filter {:?} matched no players, keeping base summary", selection);
        return base.clone();
    }

    debug!(
        "Recomputing summary for {} of {} players",
        subset.len(),
        players.len()
    );

    let mut summary = aggregate(&subset, taxonomy);
    summary.analise_regiao = base.analise_regiao.clone();
    summary.extra = base.extra.clone();
    match region {
        Some(r) => {
            summary.regiao_atual = Some(r.code().to_string());
            summary.regiao_nome = Some(r.display_name().to_string());
        }
        None => {
            summary.regiao_atual = base.regiao_atual.clone();
            summary.regiao_nome = base.regiao_nome.clone();
        }
    }
    summary
}
