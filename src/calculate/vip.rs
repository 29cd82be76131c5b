use std::collections::BTreeMap;

use super::{distribution, percent, rank_by_score, round2, ScoreMeans, ACTIVE_LOGIN_SCORE, COHORT_TOP_LIMIT};
use crate::models::{CounterStats, PlayerRecord, Taxonomy, VipCohort, VipTier};

/// Partition players by VIP tier and summarize each non-empty tier.
///
/// Keys are "vip_1" through "vip_5". Players without a tier belong to no
/// cohort. Percentages are relative to the whole `players` slice.
pub fn analyze_vip(players: &[PlayerRecord], taxonomy: &Taxonomy) -> BTreeMap<String, VipCohort> {
    let mut cohorts = BTreeMap::new();

    for tier in VipTier::all() {
        let members: Vec<PlayerRecord> = players
            .iter()
            .filter(|p| p.nivel_vip == Some(tier))
            .cloned()
            .collect();

        if members.is_empty() {
            continue;
        }

        cohorts.insert(tier.key(), cohort(tier, &members, players.len(), taxonomy));
    }

    cohorts
}

fn cohort(tier: VipTier, members: &[PlayerRecord], total: usize, taxonomy: &Taxonomy) -> VipCohort {
    let info = tier.info();
    let means = ScoreMeans::from_players(members);
    let active = members
        .iter()
        .filter(|p| p.score_login >= ACTIVE_LOGIN_SCORE)
        .count();

    VipCohort {
        nivel: tier.level(),
        nome: info.name.to_string(),
        cor: info.color.to_string(),
        icone: info.icon.to_string(),
        quantidade: members.len() as u64,
        percentual: round2(percent(members.len(), total)),
        score_geral_medio: means.geral,
        score_login_medio: means.login,
        score_engajamento_medio: means.engajamento,
        score_compras_medio: means.compras,
        percentual_ativos: round2(percent(active, members.len())),
        estatisticas: CounterStats::from_players(members),
        distribuicao_categorias: distribution(members, taxonomy),
        top_3: rank_by_score(members, COHORT_TOP_LIMIT),
    }
}
