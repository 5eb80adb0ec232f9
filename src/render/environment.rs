//! Environment lighting with a fallback chain that cannot fail
//!
//! Each lighting preset names an ordered list of remote probe URLs. They are
//! attempted in order with a per-attempt timeout; the first decodable result
//! is cached in memory under the preset name. When every source fails, a
//! procedural equirectangular probe is synthesized analytically — that path
//! has no failure mode, so environment loading always terminates with a
//! usable map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::Error;

/// Per-attempt fetch bound
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(3);

/// Synthetic probe resolution
const SYNTH_WIDTH: u32 = 256;
const SYNTH_HEIGHT: u32 = 128;

/// Equirectangular light probe, RGBA32F scanline order
pub struct EnvironmentMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// width * height * 4 floats
    pub data: Vec<f32>,
    /// True when synthesized rather than fetched
    pub synthetic: bool,
}

impl EnvironmentMap {
    /// Pack into RGBA8 for texture upload
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect()
    }
}

/// Source of remote probe bytes
///
/// The engine's only network surface. Abstracted so tests drive the fallback
/// chain with an in-memory fake.
pub trait AssetFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, Error>>;
}

/// HTTP fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ResourceLoad(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::ResourceLoad(format!("{url}: HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::ResourceLoad(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Ordered source URLs for the built-in presets
pub fn default_presets() -> HashMap<String, Vec<String>> {
    let mut presets = HashMap::new();
    presets.insert(
        "studio".to_owned(),
        vec![
            "https://cdn.vitrine.example/env/studio_1k.png".to_owned(),
            "https://assets.vitrine.example/env/studio_1k.png".to_owned(),
        ],
    );
    presets.insert(
        "showroom".to_owned(),
        vec![
            "https://cdn.vitrine.example/env/showroom_1k.png".to_owned(),
            "https://assets.vitrine.example/env/showroom_1k.png".to_owned(),
        ],
    );
    presets.insert(
        "outdoor".to_owned(),
        vec![
            "https://cdn.vitrine.example/env/outdoor_1k.png".to_owned(),
            "https://assets.vitrine.example/env/outdoor_1k.png".to_owned(),
        ],
    );
    presets
}

/// Loads and caches environment probes for one render session
pub struct EnvironmentLoader<F: AssetFetcher> {
    fetcher: F,
    presets: HashMap<String, Vec<String>>,
    cache: HashMap<String, Arc<EnvironmentMap>>,
    attempt_timeout: Duration,
}

impl<F: AssetFetcher> EnvironmentLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            presets: default_presets(),
            cache: HashMap::new(),
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_presets(mut self, presets: HashMap<String, Vec<String>>) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Whether a preset is already resident
    pub fn is_cached(&self, preset: &str) -> bool {
        self.cache.contains_key(preset)
    }

    /// Load a preset; never fails
    ///
    /// Sources are tried in order, each bounded by the attempt timeout.
    /// Exhausting them falls through to synthesis.
    pub async fn load(&mut self, preset: &str) -> Arc<EnvironmentMap> {
        if let Some(cached) = self.cache.get(preset) {
            return cached.clone();
        }

        let urls = self.presets.get(preset).cloned().unwrap_or_default();
        for url in &urls {
            match tokio::time::timeout(self.attempt_timeout, self.fetcher.fetch(url)).await {
                Ok(Ok(bytes)) => match decode_probe(preset, &bytes) {
                    Ok(map) => {
                        log::info!("environment '{preset}' loaded from {url}");
                        let map = Arc::new(map);
                        self.cache.insert(preset.to_owned(), map.clone());
                        return map;
                    }
                    Err(err) => log::warn!("environment '{preset}' decode failed ({url}): {err}"),
                },
                Ok(Err(err)) => log::warn!("environment '{preset}' fetch failed ({url}): {err}"),
                Err(_) => log::warn!(
                    "environment '{preset}' fetch timed out ({url}, {:?})",
                    self.attempt_timeout
                ),
            }
        }

        log::info!("environment '{preset}': all {} sources failed, synthesizing", urls.len());
        let map = Arc::new(synthesize_probe(preset));
        self.cache.insert(preset.to_owned(), map.clone());
        map
    }

    /// Warm commonly used presets; callers run this off the critical path
    pub async fn preload(&mut self, presets: &[&str]) {
        for preset in presets {
            if !self.is_cached(preset) {
                let _ = self.load(preset).await;
            }
        }
    }
}

/// Decode fetched probe bytes into an equirect map
fn decode_probe(name: &str, bytes: &[u8]) -> Result<EnvironmentMap, Error> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::ResourceLoad(format!("probe decode: {e}")))?;
    let rgba = image.to_rgba32f();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::ResourceLoad("probe decode: empty image".into()));
    }
    Ok(EnvironmentMap {
        name: name.to_owned(),
        width,
        height,
        data: rgba.into_raw(),
        synthetic: false,
    })
}

/// Fixed light-blob placements: (azimuth deg, elevation deg, intensity, sigma rad)
const BLOBS: [(f32, f32, f32, f32); 4] = [
    (60.0, 45.0, 2.2, 0.35),
    (180.0, 30.0, 1.6, 0.50),
    (300.0, 50.0, 1.9, 0.40),
    (90.0, -20.0, 0.5, 0.90),
];

/// Warm color bias applied to the synthesized light
const WARM_BIAS: [f32; 3] = [1.0, 0.93, 0.82];

/// Ambient floor so the probe never goes fully dark
const AMBIENT: f32 = 0.12;

/// Synthesize an equirectangular probe analytically; cannot fail
///
/// Several additive Gaussian-falloff blobs at fixed angular positions,
/// clamped, with a warm bias.
pub fn synthesize_probe(name: &str) -> EnvironmentMap {
    let mut data = Vec::with_capacity((SYNTH_WIDTH * SYNTH_HEIGHT * 4) as usize);

    let blob_dirs: Vec<glam::Vec3> = BLOBS
        .iter()
        .map(|&(az, el, _, _)| direction(az.to_radians(), el.to_radians()))
        .collect();

    for y in 0..SYNTH_HEIGHT {
        let v = (y as f32 + 0.5) / SYNTH_HEIGHT as f32;
        let elevation = (0.5 - v) * std::f32::consts::PI;
        for x in 0..SYNTH_WIDTH {
            let u = (x as f32 + 0.5) / SYNTH_WIDTH as f32;
            let azimuth = u * std::f32::consts::TAU;
            let dir = direction(azimuth, elevation);

            let mut luminance = AMBIENT;
            for (dir_blob, &(_, _, intensity, sigma)) in blob_dirs.iter().zip(&BLOBS) {
                let angle = dir.dot(*dir_blob).clamp(-1.0, 1.0).acos();
                luminance += intensity * (-angle * angle / (2.0 * sigma * sigma)).exp();
            }

            for channel in 0..3 {
                data.push((luminance * WARM_BIAS[channel]).clamp(0.0, 1.0));
            }
            data.push(1.0);
        }
    }

    EnvironmentMap {
        name: name.to_owned(),
        width: SYNTH_WIDTH,
        height: SYNTH_HEIGHT,
        data,
        synthetic: true,
    }
}

fn direction(azimuth: f32, elevation: f32) -> glam::Vec3 {
    let (sin_az, cos_az) = azimuth.sin_cos();
    let (sin_el, cos_el) = elevation.sin_cos();
    glam::Vec3::new(cos_el * cos_az, sin_el, cos_el * sin_az)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fetcher that fails for the first `failures` URLs, then succeeds with
    /// a 1x1 PNG
    struct ScriptedFetcher {
        failures: usize,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(failures: usize) -> Self {
            Self { failures, log: Mutex::new(Vec::new()) }
        }

        fn attempts(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn png_bytes() -> Vec<u8> {
            let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 180, 160, 255]));
            let mut bytes = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
            bytes
        }
    }

    impl AssetFetcher for &ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
            let mut log = self.log.lock().unwrap();
            log.push(url.to_owned());
            if log.len() <= self.failures {
                Err(Error::ResourceLoad(format!("{url}: unreachable")))
            } else {
                Ok(ScriptedFetcher::png_bytes())
            }
        }
    }

    fn presets(urls: &[&str]) -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        map.insert("studio".to_owned(), urls.iter().map(|s| s.to_string()).collect());
        map
    }

    #[tokio::test]
    async fn test_attempts_in_order_succeeds_on_last() {
        let fetcher = ScriptedFetcher::new(2);
        let mut loader = EnvironmentLoader::new(&fetcher)
            .with_presets(presets(&["u1", "u2", "u3"]));

        let map = loader.load("studio").await;
        assert_eq!(fetcher.attempts(), vec!["u1", "u2", "u3"]);
        assert!(!map.synthetic);
        assert_eq!(map.width, 2);
    }

    #[tokio::test]
    async fn test_all_unreachable_synthesizes() {
        let fetcher = ScriptedFetcher::new(usize::MAX);
        let mut loader = EnvironmentLoader::new(&fetcher)
            .with_presets(presets(&["u1", "u2"]));

        let map = loader.load("studio").await;
        assert_eq!(fetcher.attempts().len(), 2);
        assert!(map.synthetic);
        assert_eq!(map.width, SYNTH_WIDTH);
        assert_eq!(map.height, SYNTH_HEIGHT);
    }

    #[tokio::test]
    async fn test_cache_prevents_refetch() {
        let fetcher = ScriptedFetcher::new(0);
        let mut loader = EnvironmentLoader::new(&fetcher)
            .with_presets(presets(&["u1"]));

        let first = loader.load("studio").await;
        let second = loader.load("studio").await;
        assert_eq!(fetcher.attempts().len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_unknown_preset_synthesizes() {
        let fetcher = ScriptedFetcher::new(0);
        let mut loader = EnvironmentLoader::new(&fetcher).with_presets(HashMap::new());
        let map = loader.load("nonexistent").await;
        assert!(map.synthetic);
        assert!(fetcher.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_preload_warms_cache() {
        let fetcher = ScriptedFetcher::new(usize::MAX);
        let mut loader = EnvironmentLoader::new(&fetcher)
            .with_presets(presets(&["u1"]));
        loader.preload(&["studio"]).await;
        assert!(loader.is_cached("studio"));
    }

    #[test]
    fn test_synthesis_is_deterministic_and_clamped() {
        let a = synthesize_probe("studio");
        let b = synthesize_probe("studio");
        assert_eq!(a.data, b.data);

        for &value in &a.data {
            assert!(value.is_finite());
            assert!((0.0..=1.0).contains(&value));
        }

        // Warm bias: averaged red never below blue
        let (mut red, mut blue) = (0.0f32, 0.0f32);
        for pixel in a.data.chunks(4) {
            red += pixel[0];
            blue += pixel[2];
        }
        assert!(red >= blue);
    }

    #[test]
    fn test_synthetic_probe_has_bright_spots() {
        let map = synthesize_probe("studio");
        let max = map.data.chunks(4).map(|p| p[0]).fold(0.0f32, f32::max);
        let min = map.data.chunks(4).map(|p| p[0]).fold(1.0f32, f32::min);
        assert!(max > 0.9, "blobs should saturate somewhere, max={max}");
        assert!(min < 0.3, "floor should stay near ambient, min={min}");
    }
}
