use anyhow::{Context, Result};
use chrono::Utc;
use xrank_scraper::{SqliteStore, XRankStore};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let db_path = std::env::var("XRANK_DB_PATH").unwrap_or_else(|_| "data/xrank.db".to_string());
    let store = SqliteStore::open(&db_path).with_context(|| format!("open db at {db_path}"))?;

    let counts = store.counts().context("count rows")?;
    println!("db_path={db_path}");
    println!("players: {}", counts.players);
    println!("schedule: {}", counts.rotations);

    match store.latest_snapshot().context("read latest snapshot")? {
        Some((ts, mode)) => println!("latest_snapshot: ts={} mode={mode}", ts.to_rfc3339()),
        None => println!("latest_snapshot: <none>"),
    }

    if counts.rotations > 0 {
        let now = Utc::now();
        match store.current_rotation(now).context("read current rotation")? {
            Some(r) => println!(
                "current_rotation: {} -> {} mode={}",
                r.start_time.to_rfc3339(),
                r.end_time.to_rfc3339(),
                r.mode.as_deref().unwrap_or("<splatfest>")
            ),
            None => println!("current_rotation: <none>"),
        }
    }

    Ok(())
}
