use std::io;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use log::{debug, warn};

/// How much of the poster URL tail goes into the cache key. The site embeds
/// a cache-busting token at the end of poster URLs; when it changes, the
/// asset changed.
const URL_TAIL_LEN: usize = 10;

/// Unbounded on-disk poster store, one JPEG per (slug, URL-tail) key.
/// Entries are never evicted within a run. Writes go through a temp file
/// and a rename so concurrent writers of the same key cannot leave a torn
/// file behind.
pub struct PosterCache {
    dir: PathBuf,
}

impl PosterCache {
    /// Open the cache at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a film slug and the poster URL it resolved to.
    pub fn key(slug: &str, poster_url: &str) -> String {
        let tail: String = poster_url
            .chars()
            .rev()
            .take(URL_TAIL_LEN)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let slug: String = slug
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}_{}", slug, tail)
    }

    pub fn load(&self, key: &str) -> Option<RgbImage> {
        let path = self.path_for(key);
        let bytes = std::fs::read(&path).ok()?;
        match image::load_from_memory(&bytes) {
            Ok(img) => {
                debug!("poster cache hit: {}", key);
                Some(img.to_rgb8())
            }
            Err(e) => {
                warn!("discarding unreadable cache entry {}: {}", key, e);
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    pub fn store(&self, key: &str, img: &RgbImage) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{}.tmp", key));

        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, 90);
        img.write_with_encoder(encoder)
            .map_err(|e| io::Error::other(e.to_string()))?;

        std::fs::write(&tmp_path, &buffer)?;
        std::fs::rename(&tmp_path, &path)?;
        debug!("poster cache store: {}", key);
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn key_combines_slug_and_sanitized_url_tail() {
        let key = PosterCache::key("the-mirror", "https://cdn.test/p/mirror.jpg?k=ab12");
        assert_eq!(key, "the-mirror_jpg-k-ab12");

        // short URLs use the whole thing
        let key = PosterCache::key("x", "ab/cd");
        assert_eq!(key, "x_ab-cd");
    }

    #[test]
    fn key_is_filename_safe() {
        let key = PosterCache::key("weird/slug", "url?with=query&stuff");
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn store_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = PosterCache::new(dir.path()).unwrap();

        let img = RgbImage::from_pixel(8, 12, Rgb([200, 40, 40]));
        let key = PosterCache::key("slug", "poster.jpg?k=1234");
        cache.store(&key, &img).unwrap();

        let loaded = cache.load(&key).unwrap();
        assert_eq!(loaded.dimensions(), (8, 12));

        // a second cache over the same directory sees the entry
        let other = PosterCache::new(dir.path()).unwrap();
        assert!(other.load(&key).is_some());
    }

    #[test]
    fn load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = PosterCache::new(dir.path()).unwrap();
        assert!(cache.load("absent_key").is_none());
    }

    #[test]
    fn constructor_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = PosterCache::new(&nested).unwrap();
        assert!(cache.dir().is_dir());
    }
}
