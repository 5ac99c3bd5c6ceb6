use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use boxd_wrapped::collage::{build_collage, MAX_CELLS};
use boxd_wrapped::config::Config;
use boxd_wrapped::fetch::HttpFetcher;
use boxd_wrapped::film::DiaryFilter;
use boxd_wrapped::fonts::FontStack;
use boxd_wrapped::poster_cache::PosterCache;
use boxd_wrapped::poster_resolver::PosterResolver;
use boxd_wrapped::user::LetterboxdUser;

const USAGE: &str = "Usage: collage <username> [--size COLS ROWS] [--hide-shorts|-s] [--hide-tv|-t] [--hide-docs|-d] [--only-films|-f]";

struct Args {
    username: String,
    cols: u32,
    rows: u32,
    filter: DiaryFilter,
}

fn parse_args() -> Result<Args> {
    let mut username = None;
    let mut cols = 5;
    let mut rows = 5;
    let mut filter = DiaryFilter::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--size" => {
                cols = args.next().context(USAGE)?.parse().context("COLS must be a number")?;
                rows = args.next().context(USAGE)?.parse().context("ROWS must be a number")?;
            }
            "--hide-shorts" | "-s" => filter.hide_shorts = true,
            "--hide-tv" | "-t" => filter.hide_tv = true,
            "--hide-docs" | "-d" => filter.hide_docs = true,
            "--only-films" | "-f" => filter.only_films = true,
            "--help" | "-h" => bail!("{}", USAGE),
            other if username.is_none() && !other.starts_with('-') => {
                username = Some(other.to_string());
            }
            other => bail!("unrecognized argument '{}'\n{}", other, USAGE),
        }
    }

    let username = username.context(USAGE)?;
    if cols == 0 || rows == 0 || cols * rows > MAX_CELLS {
        bail!("COLS * ROWS must be between 1 and {}", MAX_CELLS);
    }
    Ok(Args {
        username,
        cols,
        rows,
        filter,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.http_timeout_secs,
    )));
    let resolver = PosterResolver::new(
        fetcher.clone(),
        PosterCache::new(&config.poster_cache_path)?,
        &config.base_url,
        (config.poster_width, config.poster_height),
        FontStack::load(),
        config.workers,
    )?;
    let mut user = LetterboxdUser::new(
        args.username.clone(),
        &config.base_url,
        fetcher,
        Duration::from_millis(config.page_delay_ms),
    )
    .with_filter(args.filter);

    let image = build_collage(&mut user, &resolver, args.cols, args.rows)?;

    std::fs::create_dir_all(&config.output_path)?;
    let filename = format!("{}_collage_{}x{}.jpg", args.username, args.cols, args.rows);
    let path = std::path::Path::new(&config.output_path).join(&filename);
    image.save(&path).context("failed to save collage")?;

    println!("{} saved in {}/", filename, config.output_path);
    Ok(())
}
