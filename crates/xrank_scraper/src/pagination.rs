//! Leaderboard walk for one (season, mode) pair.
//!
//! The X Ranking detail view is split into `MAX_PAGES` top-level pages
//! (top 500 in chunks of `PLAYERS_PER_PAGE`). Each page is itself a cursor
//! connection that has to be followed until `hasNextPage` is false.

use serde_json::json;
use splatnet_query::{path, QueryClient, QueryResponse};
use tracing::debug;

use crate::model::{Mode, RankedPlayer};
use crate::parser::parse_player_edges;
use crate::Result;

/// Top-level leaderboard pages per mode.
pub const MAX_PAGES: u32 = 5;
/// Rows the upstream puts on one page; only used to size buffers.
pub const PLAYERS_PER_PAGE: usize = 100;

/// The two templated per-mode detail queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingQuery {
    XRanking,
    WeaponTops,
}

impl RankingQuery {
    pub fn operation_name(self, mode: Mode) -> String {
        match self {
            RankingQuery::XRanking => format!("DetailTabViewXRanking{}RefetchQuery", mode.code()),
            RankingQuery::WeaponTops => format!("DetailTabViewWeaponTops{}RefetchQuery", mode.code()),
        }
    }
}

/// Key of the connection object under `node` in a detail response.
pub fn connection_key(mode: Mode) -> String {
    format!("xRanking{}", mode.code())
}

/// One detail request: a single cursor step of a single page.
pub async fn fetch_detail_page<Q: QueryClient + ?Sized>(
    client: &Q,
    kind: RankingQuery,
    season_id: &str,
    mode: Mode,
    page: u32,
    cursor: Option<&str>,
) -> Result<QueryResponse> {
    let variables = json!({
        "id": season_id,
        "mode": mode.code(),
        "page": page,
        "cursor": cursor,
    });
    Ok(client.query(&kind.operation_name(mode), variables).await?)
}

/// Every ranked player of `mode` in the season, in upstream order.
///
/// No dedup here; the store's natural key handles repeats. Any failure drops
/// everything collected so far.
pub async fn collect_players<Q: QueryClient + ?Sized>(
    client: &Q,
    season_id: &str,
    mode: Mode,
) -> Result<Vec<RankedPlayer>> {
    let key = connection_key(mode);
    let mut players = Vec::with_capacity(MAX_PAGES as usize * PLAYERS_PER_PAGE);

    for page in 1..=MAX_PAGES {
        let mut cursor: Option<String> = None;
        let mut steps = 0usize;

        loop {
            let resp = fetch_detail_page(
                client,
                RankingQuery::XRanking,
                season_id,
                mode,
                page,
                cursor.as_deref(),
            )
            .await?;
            let connection = resp.node(path!["node", key.as_str()])?;

            players.extend(parse_player_edges(&connection)?);
            steps += 1;

            if !connection.bool_at(path!["pageInfo", "hasNextPage"])? {
                break;
            }
            cursor = connection
                .opt_str_at(path!["pageInfo", "endCursor"])?
                .map(str::to_string);
        }

        debug!(mode = mode.code(), page, steps, total = players.len(), "leaderboard page done");
    }

    Ok(players)
}
