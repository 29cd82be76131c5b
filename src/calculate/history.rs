use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{mean, percent, round1, round2};
use crate::models::{
    ClusterShare, EvolutionPoint, ExecutiveSummary, Indicators, LegacyBucket, PeriodComparison,
    PeriodMeans, PeriodRange, SnapshotRecord, SnapshotVariation,
};

/// Points shown in the executive evolution list.
pub const EXECUTIVE_EVOLUTION_POINTS: usize = 7;

/// Sort snapshots oldest first by (date, write timestamp, id).
///
/// The backend returns history newest first or oldest first depending on the
/// endpoint; display code always wants ascending order. Snapshots whose date
/// cannot be parsed sort before all others.
pub fn normalize_history(mut history: Vec<SnapshotRecord>) -> Vec<SnapshotRecord> {
    history.sort_by_cached_key(|s| (s.date(), s.timestamp(), s.id));
    history
}

/// Digest of the latest snapshot compared with the one before it.
///
/// Returns `None` for an empty history.
pub fn executive_summary(history: &[SnapshotRecord]) -> Option<ExecutiveSummary> {
    let ordered = normalize_history(history.to_vec());
    let latest = ordered.last()?;
    let previous = ordered.len().checked_sub(2).map(|idx| &ordered[idx]);

    let variacoes_dia = previous.map(|prev| SnapshotVariation {
        total_jogadores: latest.total_jogadores as i64 - prev.total_jogadores as i64,
        percentual_ativos: round2(latest.percentual_ativos - prev.percentual_ativos),
        score_geral: round2(latest.media_score_geral - prev.media_score_geral),
    });

    let total = latest.total_jogadores as usize;
    let distribuicao_clusters: BTreeMap<String, ClusterShare> = LegacyBucket::ALL
        .iter()
        .map(|bucket| {
            let qtd = latest.cluster_count(*bucket);
            (
                bucket.executive_label().to_string(),
                ClusterShare {
                    qtd,
                    pct: round1(percent(qtd as usize, total)),
                },
            )
        })
        .collect();

    let evolucao = ordered
        .iter()
        .rev()
        .take(EXECUTIVE_EVOLUTION_POINTS)
        .map(|s| EvolutionPoint {
            data: s.data.clone(),
            total_jogadores: s.total_jogadores,
            percentual_ativos: s.percentual_ativos,
            score_geral: s.media_score_geral,
        })
        .collect();

    Some(ExecutiveSummary {
        data_referencia: latest.data.clone(),
        indicadores_principais: Indicators {
            total_jogadores: latest.total_jogadores,
            percentual_ativos: latest.percentual_ativos,
            score_geral_medio: latest.media_score_geral,
            score_engajamento_medio: latest.media_score_engajamento,
            score_compras_medio: latest.media_score_compras,
        },
        variacoes_dia,
        distribuicao_clusters,
        evolucao,
    })
}

/// Averages and first-to-last change over the snapshots dated within
/// `inicio..=fim`.
///
/// Snapshots with unparseable dates are ignored. Returns `None` when no
/// snapshot falls in the range.
pub fn compare_periods(
    history: &[SnapshotRecord],
    inicio: NaiveDate,
    fim: NaiveDate,
) -> Option<PeriodComparison> {
    let in_range: Vec<SnapshotRecord> = history
        .iter()
        .filter(|s| s.date().is_some_and(|d| d >= inicio && d <= fim))
        .cloned()
        .collect();
    let ordered = normalize_history(in_range);
    let first = ordered.first()?;
    let last = ordered.last()?;

    let avg = |f: fn(&SnapshotRecord) -> f64| {
        let values: Vec<f64> = ordered.iter().map(f).collect();
        mean(&values)
    };

    Some(PeriodComparison {
        periodo: PeriodRange {
            inicio,
            fim,
            dias: ordered.len(),
        },
        medias: PeriodMeans {
            total_jogadores: avg(|s| s.total_jogadores as f64).round(),
            percentual_ativos: round2(avg(|s| s.percentual_ativos)),
            score_geral: round2(avg(|s| s.media_score_geral)),
        },
        tendencia: SnapshotVariation {
            total_jogadores: last.total_jogadores as i64 - first.total_jogadores as i64,
            percentual_ativos: round2(last.percentual_ativos - first.percentual_ativos),
            score_geral: round2(last.media_score_geral - first.media_score_geral),
        },
        evolucao_diaria: ordered
            .iter()
            .map(|s| EvolutionPoint {
                data: s.data.clone(),
                total_jogadores: s.total_jogadores,
                percentual_ativos: s.percentual_ativos,
                score_geral: s.media_score_geral,
            })
            .collect(),
    })
}
