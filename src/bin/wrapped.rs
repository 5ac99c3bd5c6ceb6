use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Datelike;

use boxd_wrapped::config::Config;
use boxd_wrapped::fetch::HttpFetcher;
use boxd_wrapped::fonts::FontStack;
use boxd_wrapped::poster_cache::PosterCache;
use boxd_wrapped::poster_resolver::PosterResolver;
use boxd_wrapped::user::LetterboxdUser;
use boxd_wrapped::wrapped::{build_wrapped, month_name, LayoutStyle, WrappedOptions};

const USAGE: &str =
    "Usage: wrapped <username> [--month M] [--year Y] [--show-ratings] [--style scatter|grid]";

fn main() -> Result<()> {
    env_logger::init();

    let today = chrono::Local::now().date_naive();
    let mut username = None;
    let mut month = today.month();
    let mut year = today.year();
    let mut show_ratings = false;
    let mut style = LayoutStyle::Scatter;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--month" | "-m" => {
                month = args.next().context(USAGE)?.parse().context("M must be 1-12")?;
            }
            "--year" | "-y" => {
                year = args.next().context(USAGE)?.parse().context("Y must be a year")?;
            }
            "--show-ratings" | "-r" => show_ratings = true,
            "--style" => {
                let value = args.next().context(USAGE)?;
                style = value
                    .parse()
                    .ok()
                    .with_context(|| format!("unknown style '{}'", value))?;
            }
            "--help" | "-h" => bail!("{}", USAGE),
            other if username.is_none() && !other.starts_with('-') => {
                username = Some(other.to_string());
            }
            other => bail!("unrecognized argument '{}'\n{}", other, USAGE),
        }
    }
    let username = username.context(USAGE)?;
    if !(1..=12).contains(&month) {
        bail!("month must be between 1 and 12");
    }

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
        username.clone(),
        &config.base_url,
        fetcher,
        Duration::from_millis(config.page_delay_ms),
    );

    let mut options = WrappedOptions::new(month, year);
    options.show_ratings = show_ratings;
    options.style = style;

    let image = build_wrapped(&mut user, &resolver, &options)?;

    std::fs::create_dir_all(&config.output_path)?;
    let filename = format!("{}_wrapped_{}_{}.jpg", username, month_name(month), year);
    let path = std::path::Path::new(&config.output_path).join(&filename);
    image.save(&path).context("failed to save wrapped image")?;

    println!("Wrapped image saved: {}", path.display());
    Ok(())
}
