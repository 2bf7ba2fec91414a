use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::core::{AspectRatio, Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::color::RgbaColor;

/// A complete video script: ordered scenes plus the sources of their assets.
///
/// Scripts are plain data. They are usually produced by an external generation service and
/// read from JSON with [`Script::from_path`]; nothing in the engine mutates them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Optional aspect ratio requested by the script; the engine config wins when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    /// Scenes in playback order.
    pub scenes: Vec<Scene>,
    /// Where to find images, narration, music, watermark and fonts on disk.
    #[serde(default)]
    pub assets: AssetSources,
}

/// One timed unit of the script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Scene identifier, unique within the script.
    pub id: String,
    /// Key of this scene's narration buffer in the asset store.
    pub narration_segment_id: String,
    /// Visual content.
    #[serde(flatten)]
    pub layout: SceneLayout,
}

/// Which layout strategy a scene (and therefore a script) uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutVersion {
    /// Single full-frame image with Ken Burns motion and captions.
    V1,
    /// Independently animated image/text elements.
    V2,
}

/// Visual content of a scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "layout")]
pub enum SceneLayout {
    /// Full-frame photo with pan/zoom and a word-revealing caption.
    #[serde(rename = "v1", rename_all = "camelCase")]
    V1 {
        /// Prompt-style description of the image (informational).
        #[serde(default)]
        visual_description: String,
        /// Caption text, normally the narration transcript.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption_text: Option<String>,
        /// Image asset id; defaults to the scene id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
    /// Ordered list of animated elements; index 0 is the background.
    #[serde(rename = "v2")]
    V2 {
        /// Elements in draw order.
        elements: Vec<Element>,
    },
}

impl Scene {
    /// Layout strategy of this scene.
    pub fn layout_version(&self) -> LayoutVersion {
        match self.layout {
            SceneLayout::V1 { .. } => LayoutVersion::V1,
            SceneLayout::V2 { .. } => LayoutVersion::V2,
        }
    }

    /// Asset id of the v1 image, or `None` for v2 scenes.
    pub fn v1_image_id(&self) -> Option<&str> {
        match &self.layout {
            SceneLayout::V1 { image, .. } => Some(image.as_deref().unwrap_or(&self.id)),
            SceneLayout::V2 { .. } => None,
        }
    }

    /// `true` if the scene draws any text (caption or text element).
    pub fn has_text(&self) -> bool {
        match &self.layout {
            SceneLayout::V1 { caption_text, .. } => {
                caption_text.as_deref().is_some_and(|c| !c.trim().is_empty())
            }
            SceneLayout::V2 { elements } => elements
                .iter()
                .any(|el| matches!(el.kind, ElementKind::Text { .. })),
        }
    }

    /// Elements of a v2 scene (empty for v1).
    pub fn elements(&self) -> &[Element] {
        match &self.layout {
            SceneLayout::V1 { .. } => &[],
            SceneLayout::V2 { elements } => elements,
        }
    }
}

/// One positioned, independently animated node of a v2 scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Element id, unique within its scene. Image elements use it as their asset id by default.
    pub id: String,
    /// Image or text payload.
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Box in percent of the frame.
    pub layout: BoxLayout,
    /// Entrance animation; absent means visible from the scene start.
    #[serde(default)]
    pub entrance: Entrance,
    /// Optional exit animation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<Exit>,
}

impl Element {
    /// Asset id for image elements.
    pub fn image_asset_id(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Image { asset } => Some(asset.as_deref().unwrap_or(&self.id)),
            ElementKind::Text { .. } => None,
        }
    }

    /// Scene-relative time at which the entrance completes.
    pub fn entrance_end(&self) -> f64 {
        self.entrance.start + self.entrance.duration
    }
}

/// Element payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementKind {
    /// Raster image.
    Image {
        /// Asset id override; defaults to the element id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<String>,
    },
    /// Wrapped text block.
    Text {
        /// UTF-8 content.
        text: String,
        /// Text style.
        #[serde(default)]
        style: TextStyle,
    },
}

/// Element box in percent of frame width/height (0–100).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoxLayout {
    /// Left edge, percent of frame width.
    pub x: f64,
    /// Top edge, percent of frame height.
    pub y: f64,
    /// Width, percent of frame width.
    pub width: f64,
    /// Height, percent of frame height.
    pub height: f64,
}

impl BoxLayout {
    /// Full-frame box.
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
    };

    /// Resolve to a pixel rectangle on `canvas`.
    pub fn to_rect(self, canvas: Canvas) -> Rect {
        let w = f64::from(canvas.width);
        let h = f64::from(canvas.height);
        let x0 = self.x / 100.0 * w;
        let y0 = self.y / 100.0 * h;
        Rect::new(
            x0,
            y0,
            x0 + self.width / 100.0 * w,
            y0 + self.height / 100.0 * h,
        )
    }
}

/// Entrance animation kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntranceKind {
    /// Appears at `start` without motion.
    #[default]
    None,
    /// Opacity ramps 0→1.
    FadeIn,
    /// Slides in from the left by its own width.
    SlideInLeft,
    /// Slides in from the right by its own width.
    SlideInRight,
    /// Slides in from the top by its own height.
    SlideInTop,
    /// Slides in from the bottom by its own height.
    SlideInBottom,
    /// Image magnification grows to 1 inside the box.
    ZoomIn,
    /// Image magnification shrinks to 1 inside the box.
    ZoomOut,
    /// Scales 0→1 about the box center.
    ScaleUp,
    /// Rotates −45°→0° about the box center.
    RotateIn,
}

/// Exit animation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitKind {
    /// Opacity ramps 1→0.
    FadeOut,
    /// Slides out to the left.
    SlideOutLeft,
    /// Slides out to the right.
    SlideOutRight,
    /// Slides out to the top.
    SlideOutTop,
    /// Slides out to the bottom.
    SlideOutBottom,
    /// Scales 1→0.
    ScaleDown,
    /// Rotates 0°→45°.
    RotateOut,
}

/// Entrance timing and kind (scene-relative seconds).
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entrance {
    /// Animation kind.
    #[serde(default)]
    pub kind: EntranceKind,
    /// Start time.
    #[serde(default)]
    pub start: f64,
    /// Duration; zero means the element snaps in at `start`.
    #[serde(default)]
    pub duration: f64,
}

/// Exit timing and kind (scene-relative seconds).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Exit {
    /// Animation kind.
    pub kind: ExitKind,
    /// Start time.
    pub start: f64,
    /// Duration; zero means the element vanishes at `start`.
    #[serde(default)]
    pub duration: f64,
}

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Flush right.
    Right,
}

/// Vertical placement of the wrapped text block inside its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    /// Block starts at the top of the box.
    #[default]
    Top,
    /// Block is centered.
    Middle,
    /// Block ends at the bottom of the box.
    Bottom,
}

/// Text element style.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyle {
    /// Font family key into the asset store's fonts; falls back to the default font.
    pub font_family: Option<String>,
    /// Font size in pixels.
    pub font_size: f32,
    /// Fill color.
    pub color: RgbaColor,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Vertical alignment.
    pub vertical_align: VerticalAlign,
    /// CSS-style weight (100–900).
    #[serde(deserialize_with = "de_weight")]
    pub weight: u16,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 48.0,
            color: RgbaColor::WHITE,
            align: TextAlign::Center,
            vertical_align: VerticalAlign::Top,
            weight: 400,
            line_height: 1.2,
        }
    }
}

fn de_weight<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u16),
        Name(String),
    }

    match <Repr as serde::Deserialize>::deserialize(deserializer)? {
        Repr::Num(n) => Ok(n.clamp(100, 900)),
        Repr::Name(s) => match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "regular" => Ok(400),
            "bold" => Ok(700),
            other => Err(serde::de::Error::custom(format!(
                "unknown font weight '{other}'"
            ))),
        },
    }
}

/// On-disk locations of script assets, relative to the script file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetSources {
    /// Image asset id → path.
    pub images: BTreeMap<String, String>,
    /// Narration segment id → path.
    pub narration: BTreeMap<String, String>,
    /// Background music path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
    /// Watermark image path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
    /// Font family → font file path.
    pub fonts: BTreeMap<String, String>,
}

impl Script {
    /// Parse a script from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        serde_json::from_reader(r).map_err(|e| ReelError::serde(format!("parse script JSON: {e}")))
    }

    /// Parse a script from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open script JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize back to pretty JSON.
    pub fn to_json_pretty(&self) -> ReelResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReelError::serde(e.to_string()))
    }

    /// Layout version shared by all scenes, or `None` for an empty script.
    pub fn layout_version(&self) -> Option<LayoutVersion> {
        self.scenes.first().map(Scene::layout_version)
    }

    /// Structural validation.
    ///
    /// Timing inconsistencies are deliberately not reported here; see
    /// [`Script::timing_issues`].
    pub fn validate(&self) -> ReelResult<()> {
        let mut scene_ids = HashSet::new();
        let version = self.layout_version();
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.id.trim().is_empty() {
                return Err(ReelError::validation(format!("scene #{i} has an empty id")));
            }
            if !scene_ids.insert(scene.id.as_str()) {
                return Err(ReelError::validation(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            if scene.narration_segment_id.trim().is_empty() {
                return Err(ReelError::validation(format!(
                    "scene '{}' has an empty narrationSegmentId",
                    scene.id
                )));
            }
            if Some(scene.layout_version()) != version {
                return Err(ReelError::validation(format!(
                    "scene '{}' mixes layout versions; all scenes of a script must share one",
                    scene.id
                )));
            }

            let mut element_ids = HashSet::new();
            for el in scene.elements() {
                if !element_ids.insert(el.id.as_str()) {
                    return Err(ReelError::validation(format!(
                        "scene '{}' has duplicate element id '{}'",
                        scene.id, el.id
                    )));
                }
                validate_element(&scene.id, el)?;
            }
        }
        Ok(())
    }

    /// Elements whose exit begins before their entrance finishes.
    ///
    /// These are tolerated by the renderer (the in/out animations overlap).
    pub fn timing_issues(&self) -> Vec<ReelError> {
        let mut out = Vec::new();
        for scene in &self.scenes {
            for el in scene.elements() {
                let Some(exit) = el.exit else {
                    continue;
                };
                if exit.start < el.entrance_end() {
                    out.push(ReelError::TimingInconsistency {
                        scene: scene.id.clone(),
                        element: el.id.clone(),
                        exit_start: exit.start,
                        entrance_end: el.entrance_end(),
                    });
                }
            }
        }
        out
    }

    /// Replace the narration segment of one scene (external editing action).
    pub fn set_narration_segment(
        &mut self,
        scene_id: &str,
        segment_id: impl Into<String>,
    ) -> ReelResult<()> {
        let scene = self
            .scenes
            .iter_mut()
            .find(|s| s.id == scene_id)
            .ok_or_else(|| ReelError::validation(format!("unknown scene id '{scene_id}'")))?;
        scene.narration_segment_id = segment_id.into();
        Ok(())
    }
}

fn validate_element(scene_id: &str, el: &Element) -> ReelResult<()> {
    let l = el.layout;
    for (name, v) in [
        ("x", l.x),
        ("y", l.y),
        ("width", l.width),
        ("height", l.height),
    ] {
        if !v.is_finite() || !(0.0..=100.0).contains(&v) {
            return Err(ReelError::validation(format!(
                "scene '{scene_id}' element '{}': layout.{name} must be within [0, 100]",
                el.id
            )));
        }
    }

    let mut windows = vec![("entrance", el.entrance.start, el.entrance.duration)];
    if let Some(exit) = el.exit {
        windows.push(("exit", exit.start, exit.duration));
    }
    for (name, start, duration) in windows {
        if !start.is_finite() || start < 0.0 || !duration.is_finite() || duration < 0.0 {
            return Err(ReelError::validation(format!(
                "scene '{scene_id}' element '{}': {name} start/duration must be finite and >= 0",
                el.id
            )));
        }
    }

    if let ElementKind::Text { style, .. } = &el.kind
        && (!style.font_size.is_finite() || style.font_size <= 0.0)
    {
        return Err(ReelError::validation(format!(
            "scene '{scene_id}' element '{}': fontSize must be > 0",
            el.id
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/script/model.rs"]
mod tests;
