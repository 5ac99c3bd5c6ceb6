use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image::RgbImage;
use log::{debug, warn};
use rayon::prelude::*;
use scraper::{Html, Selector};

use crate::fetch::Fetch;
use crate::film::Film;
use crate::fonts::FontStack;
use crate::placeholder;
use crate::poster_cache::PosterCache;

/// Tiered poster resolution: memoized URL lookup, on-disk cache, remote
/// fetch, and a synthesized placeholder as the final tier. `resolve` is
/// total; a film always gets an image.
pub struct PosterResolver {
    fetcher: Arc<dyn Fetch>,
    cache: PosterCache,
    base_url: String,
    poster_width: u32,
    poster_height: u32,
    fonts: FontStack,
    // slug -> resolved poster URL; None records "no poster available".
    // Two threads racing on the same slug just perform a redundant lookup.
    url_memo: Mutex<HashMap<String, Option<String>>>,
    pool: rayon::ThreadPool,
}

impl PosterResolver {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        cache: PosterCache,
        base_url: &str,
        poster_size: (u32, u32),
        fonts: FontStack,
        workers: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()?;
        Ok(Self {
            fetcher,
            cache,
            base_url: base_url.trim_end_matches('/').to_string(),
            poster_width: poster_size.0,
            poster_height: poster_size.1,
            fonts,
            url_memo: Mutex::new(HashMap::new()),
            pool,
        })
    }

    pub fn poster_size(&self) -> (u32, u32) {
        (self.poster_width, self.poster_height)
    }

    pub fn fonts(&self) -> &FontStack {
        &self.fonts
    }

    /// Resolve a poster image for the film, falling through the tiers.
    /// Never fails: any failure along the way degrades to a placeholder.
    pub fn resolve(&self, film: &Film) -> RgbImage {
        match self.try_resolve(film) {
            Ok(img) => img,
            Err(reason) => {
                warn!("no poster for {}: {}", film.slug, reason);
                placeholder::render(
                    &film.display_title(),
                    self.poster_width,
                    self.poster_height,
                    &self.fonts,
                )
            }
        }
    }

    /// Resolve posters for a batch of films on the bounded worker pool.
    /// Output order matches input order; individual failures degrade to
    /// placeholders without affecting the rest of the batch.
    pub fn resolve_batch(&self, films: &[Film]) -> Vec<RgbImage> {
        self.pool
            .install(|| films.par_iter().map(|film| self.resolve(film)).collect())
    }

    fn try_resolve(&self, film: &Film) -> Result<RgbImage, String> {
        let url = self
            .poster_url(&film.slug)
            .ok_or_else(|| "no poster available".to_string())?;

        let key = PosterCache::key(&film.slug, &url);
        if let Some(img) = self.cache.load(&key) {
            return Ok(img);
        }

        let response = self.fetcher.get(&url).map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("poster fetch returned {}", response.status));
        }
        if !response.content_type.starts_with("image/") {
            return Err(format!(
                "poster url served '{}' instead of an image",
                response.content_type
            ));
        }

        let img = image::load_from_memory(&response.body)
            .map_err(|e| format!("undecodable poster: {}", e))?
            .to_rgb8();
        if let Err(e) = self.cache.store(&key, &img) {
            warn!("failed to cache poster {}: {}", key, e);
        }
        Ok(img)
    }

    /// Scrape the poster lookup endpoint for the slug's poster URL.
    /// A missing poster element means "no poster", not an error. The result
    /// (including the negative one) is memoized per slug.
    fn poster_url(&self, slug: &str) -> Option<String> {
        if let Some(memoized) = self.url_memo.lock().ok()?.get(slug) {
            return memoized.clone();
        }

        debug!("looking up poster url for {}", slug);
        let lookup = format!(
            "{}/ajax/poster/film/{}/std/{}x{}/",
            self.base_url, slug, self.poster_width, self.poster_height
        );
        let resolved = self
            .fetcher
            .get(&lookup)
            .ok()
            .filter(|res| res.is_success())
            .and_then(|res| extract_poster_src(&res.text()));

        if let Ok(mut memo) = self.url_memo.lock() {
            memo.insert(slug.to_string(), resolved.clone());
        }
        resolved
    }
}

fn extract_poster_src(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img.image").expect("static selector");
    document
        .select(&selector)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::{BoxdError, BoxdResult};
    use crate::fetch::FetchResponse;
    use image::Rgb;
    use tempfile::TempDir;

    struct OfflineFetch;

    impl Fetch for OfflineFetch {
        fn get(&self, _url: &str) -> BoxdResult<FetchResponse> {
            Err(BoxdError::Transport("network unreachable".to_string()))
        }
    }

    struct PosterFetch {
        poster_body: Vec<u8>,
        poster_content_type: String,
        lookup_hits: AtomicUsize,
    }

    impl PosterFetch {
        fn new(poster_body: Vec<u8>, poster_content_type: &str) -> Self {
            Self {
                poster_body,
                poster_content_type: poster_content_type.to_string(),
                lookup_hits: AtomicUsize::new(0),
            }
        }
    }

    impl Fetch for PosterFetch {
        fn get(&self, url: &str) -> BoxdResult<FetchResponse> {
            if url.contains("/ajax/poster/film/") {
                self.lookup_hits.fetch_add(1, Ordering::SeqCst);
                return Ok(FetchResponse {
                    status: 200,
                    content_type: "text/html".to_string(),
                    body: br#"<div><img class="image" src="https://cdn.test/poster.jpg?k=ab12cd34"/></div>"#
                        .to_vec(),
                });
            }
            Ok(FetchResponse {
                status: 200,
                content_type: self.poster_content_type.clone(),
                body: self.poster_body.clone(),
            })
        }
    }

    fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb([10, 120, 200]));
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, 90);
        img.write_with_encoder(encoder).unwrap();
        buffer
    }

    fn resolver_with(fetcher: Arc<dyn Fetch>, dir: &TempDir) -> PosterResolver {
        PosterResolver::new(
            fetcher,
            PosterCache::new(dir.path()).unwrap(),
            "https://example.test",
            (230, 345),
            FontStack::builtin(),
            2,
        )
        .unwrap()
    }

    #[test]
    fn resolution_is_total_when_offline() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver_with(Arc::new(OfflineFetch), &dir);
        let film = Film::new("Playtime", Some(1967), "playtime");

        let img = resolver.resolve(&film);
        assert_eq!(img.dimensions(), (230, 345));
    }

    #[test]
    fn remote_poster_is_decoded_and_cached() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(PosterFetch::new(jpeg_bytes(230, 345), "image/jpeg"));
        let resolver = resolver_with(fetcher.clone(), &dir);
        let film = Film::new("Playtime", Some(1967), "playtime");

        let img = resolver.resolve(&film);
        assert_eq!(img.dimensions(), (230, 345));

        let key = PosterCache::key("playtime", "https://cdn.test/poster.jpg?k=ab12cd34");
        let cache = PosterCache::new(dir.path()).unwrap();
        assert!(cache.load(&key).is_some());

        // second resolve hits the disk cache and memoized url
        let again = resolver.resolve(&film);
        assert_eq!(again.dimensions(), (230, 345));
        assert_eq!(fetcher.lookup_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_image_content_type_degrades_to_placeholder() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(PosterFetch::new(b"<html>soft 404</html>".to_vec(), "text/html"));
        let resolver = resolver_with(fetcher, &dir);
        let film = Film::new("Lost Film", None, "lost-film");

        let img = resolver.resolve(&film);
        assert_eq!(img.dimensions(), (230, 345));
    }

    #[test]
    fn batch_resolution_preserves_order_and_survives_failures() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver_with(Arc::new(OfflineFetch), &dir);
        let films: Vec<Film> = (0..6)
            .map(|i| Film::new(format!("Film {}", i), None, format!("film-{}", i)))
            .collect();

        let images = resolver.resolve_batch(&films);
        assert_eq!(images.len(), 6);
        for img in images {
            assert_eq!(img.dimensions(), (230, 345));
        }
    }

    #[test]
    fn extract_poster_src_missing_element() {
        assert_eq!(extract_poster_src("<html><body></body></html>"), None);
        assert_eq!(
            extract_poster_src(r#"<img class="image" src="x.jpg"/>"#),
            Some("x.jpg".to_string())
        );
    }
}
