use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::assets::decode::{RasterImage, decode_audio_file, decode_image};
use crate::audio::buffer::AudioBuffer;
use crate::foundation::config::EngineContext;
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::model::Script;

/// Raw font file registered under a family name.
#[derive(Clone, Debug, PartialEq)]
pub struct FontData {
    /// Family key used by text styles.
    pub family: String,
    /// TTF/OTF bytes.
    pub bytes: Arc<Vec<u8>>,
}

/// Decoded assets for one script.
///
/// Images and narration are looked up by id on every frame; nothing outside the store keeps
/// references to them across frames. The store is written during loading (or by explicit
/// edits) and only read while rendering, mixing, playing or exporting.
#[derive(Clone, Debug, Default)]
pub struct AssetStore {
    images: HashMap<String, RasterImage>,
    narration: HashMap<String, AudioBuffer>,
    music: Option<AudioBuffer>,
    watermark: Option<RasterImage>,
    fonts: Vec<FontData>,
}

impl AssetStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite an image.
    pub fn insert_image(&mut self, id: impl Into<String>, image: RasterImage) {
        self.images.insert(id.into(), image);
    }

    /// Add or overwrite a narration buffer.
    pub fn insert_narration(&mut self, segment_id: impl Into<String>, buffer: AudioBuffer) {
        self.narration.insert(segment_id.into(), buffer);
    }

    /// Set or clear the background music.
    pub fn set_music(&mut self, music: Option<AudioBuffer>) {
        self.music = music;
    }

    /// Set or clear the watermark image.
    pub fn set_watermark(&mut self, watermark: Option<RasterImage>) {
        self.watermark = watermark;
    }

    /// Register font bytes under `family`. The first registered font is the fallback.
    pub fn insert_font(&mut self, family: impl Into<String>, bytes: Vec<u8>) {
        let family = family.into();
        let data = FontData {
            family: family.clone(),
            bytes: Arc::new(bytes),
        };
        match self.fonts.iter_mut().find(|f| f.family == family) {
            Some(slot) => *slot = data,
            None => self.fonts.push(data),
        }
    }

    /// Swap one image, returning the previous one.
    pub fn replace_image(&mut self, id: &str, image: RasterImage) -> Option<RasterImage> {
        self.images.insert(id.to_owned(), image)
    }

    /// Swap one narration buffer, returning the previous one.
    ///
    /// Only the scene(s) using `segment_id` change duration.
    pub fn replace_narration(
        &mut self,
        segment_id: &str,
        buffer: AudioBuffer,
    ) -> Option<AudioBuffer> {
        self.narration.insert(segment_id.to_owned(), buffer)
    }

    /// Image by asset id.
    pub fn image(&self, id: &str) -> Option<&RasterImage> {
        self.images.get(id)
    }

    /// Narration by segment id.
    pub fn narration(&self, segment_id: &str) -> Option<&AudioBuffer> {
        self.narration.get(segment_id)
    }

    /// Background music, if loaded.
    pub fn music(&self) -> Option<&AudioBuffer> {
        self.music.as_ref()
    }

    /// Watermark image, if loaded.
    pub fn watermark(&self) -> Option<&RasterImage> {
        self.watermark.as_ref()
    }

    /// Font for `family`, falling back to the first registered font.
    pub fn font(&self, family: Option<&str>) -> Option<&FontData> {
        family
            .and_then(|fam| self.fonts.iter().find(|f| f.family == fam))
            .or_else(|| self.fonts.first())
    }

    /// Number of images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of narration buffers.
    pub fn narration_count(&self) -> usize {
        self.narration.len()
    }
}

/// Non-fatal findings collected while loading.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Set when music was configured but could not be loaded; the store has no music.
    pub music_error: Option<ReelError>,
    /// Elements whose exit overlaps their entrance.
    pub timing_issues: Vec<ReelError>,
    /// Scenes whose narration segment has no source; they play for zero seconds.
    pub silent_scenes: Vec<String>,
}

/// Normalize and validate script-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> ReelResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ReelError::validation("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

fn resolve(root: &Path, id: &str, source: &str) -> ReelResult<PathBuf> {
    let rel = normalize_rel_path(source).map_err(|e| ReelError::asset_load(id, e.to_string()))?;
    Ok(root.join(rel))
}

fn read_image(id: &str, path: &Path) -> ReelResult<RasterImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReelError::asset_load(id, format!("read '{}': {e}", path.display())))?;
    decode_image(&bytes).map_err(|e| ReelError::asset_load(id, e.to_string()))
}

/// Load every asset a script references, relative to `root`.
///
/// Each batch (images, narration) is decoded in parallel and joined before returning; the first
/// failure in script order fails the load. A music failure only lands in the report.
#[tracing::instrument(skip(script, ctx), fields(scenes = script.scenes.len()))]
pub fn load_assets(
    script: &Script,
    root: &Path,
    ctx: &EngineContext,
) -> ReelResult<(AssetStore, LoadReport)> {
    script.validate()?;
    let sources = &script.assets;
    let mut store = AssetStore::new();
    let mut report = LoadReport {
        timing_issues: script.timing_issues(),
        ..LoadReport::default()
    };
    for issue in &report.timing_issues {
        tracing::warn!("{issue}");
    }

    // images referenced by scenes, in script order
    let mut seen = HashSet::new();
    let mut image_jobs = Vec::<(String, PathBuf)>::new();
    let referenced = script.scenes.iter().flat_map(|scene| {
        scene
            .v1_image_id()
            .into_iter()
            .chain(scene.elements().iter().filter_map(|el| el.image_asset_id()))
    });
    for id in referenced {
        if !seen.insert(id) {
            continue;
        }
        let source = sources.images.get(id).ok_or_else(|| {
            ReelError::asset_load(id, "no image source listed under assets.images")
        })?;
        image_jobs.push((id.to_owned(), resolve(root, id, source)?));
    }
    let images: Vec<ReelResult<RasterImage>> = image_jobs
        .par_iter()
        .map(|(id, path)| read_image(id, path))
        .collect();
    for ((id, _), img) in image_jobs.iter().zip(images) {
        store.insert_image(id.clone(), img?);
    }

    let mut narration_jobs = Vec::<(String, PathBuf)>::new();
    let mut seen = HashSet::new();
    for scene in &script.scenes {
        let seg = scene.narration_segment_id.as_str();
        if !seen.insert(seg) {
            continue;
        }
        match sources.narration.get(seg) {
            Some(source) => narration_jobs.push((seg.to_owned(), resolve(root, seg, source)?)),
            None => {
                tracing::warn!(
                    scene = %scene.id,
                    segment = seg,
                    "no narration source; scene is skipped"
                );
                report.silent_scenes.push(scene.id.clone());
            }
        }
    }
    let narrations: Vec<ReelResult<AudioBuffer>> = narration_jobs
        .par_iter()
        .map(|(seg, path)| {
            decode_audio_file(path, ctx.sample_rate, ctx.channels)
                .map_err(|e| ReelError::asset_load(seg.as_str(), e.to_string()))
        })
        .collect();
    for ((seg, _), buf) in narration_jobs.iter().zip(narrations) {
        store.insert_narration(seg.clone(), buf?);
    }

    if let Some(source) = &sources.watermark {
        let path = resolve(root, "watermark", source)?;
        store.set_watermark(Some(read_image("watermark", &path)?));
    }

    let mut families: Vec<(&String, &String)> = sources.fonts.iter().collect();
    if let Some(default) = ctx.default_font_family.as_deref() {
        families.sort_by_key(|(fam, _)| fam.as_str() != default);
    }
    for (family, source) in families {
        let path = resolve(root, family, source)?;
        let bytes = std::fs::read(&path).map_err(|e| {
            ReelError::asset_load(family.as_str(), format!("read font '{}': {e}", path.display()))
        })?;
        store.insert_font(family.clone(), bytes);
    }
    if store.fonts.is_empty() && script.scenes.iter().any(|s| s.has_text()) {
        tracing::warn!("no fonts listed under assets.fonts; text is not drawn");
    }

    if let Some(source) = &sources.music {
        let loaded = resolve(root, "music", source).and_then(|path| {
            decode_audio_file(&path, ctx.sample_rate, ctx.channels)
        });
        match loaded {
            Ok(buf) => store.set_music(Some(buf)),
            Err(e) => {
                let err = ReelError::music_load(e.to_string());
                tracing::warn!("{err}; continuing without music");
                report.music_error = Some(err);
            }
        }
    }

    tracing::info!(
        images = store.image_count(),
        narration = store.narration_count(),
        music = store.music().is_some(),
        "assets loaded"
    );
    Ok((store, report))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
