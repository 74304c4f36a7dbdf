use std::collections::BTreeMap;

use crate::foundation::error::{SlidecastError, SlidecastResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Fonts registered for one job plus the Parley contexts used to lay text out with them.
///
/// Only registered fonts are visible to layout; there is no system font fallback.
pub struct FontRegistry {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    faces: BTreeMap<String, vello_cpu::peniko::FontData>,
    default_family: Option<String>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("families", &self.faces.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            faces: BTreeMap::new(),
            default_family: None,
        }
    }

    /// Register raw font bytes and return the family name they provide.
    ///
    /// The first registered family becomes the default for text without an explicit family.
    pub fn register(&mut self, font_bytes: Vec<u8>) -> SlidecastResult<String> {
        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font_bytes.clone()),
            None,
        );
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| SlidecastError::asset("no font families registered from font bytes"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| SlidecastError::asset("registered font family has no name"))?
            .to_string();

        let face = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        self.faces.insert(family_name.clone(), face);
        if self.default_family.is_none() {
            self.default_family = Some(family_name.clone());
        }
        tracing::debug!(family = %family_name, "registered font");
        Ok(family_name)
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Resolve a requested family to a registered one (case-insensitive), else the default.
    pub(crate) fn resolve(&self, family: Option<&str>) -> Option<&str> {
        family
            .and_then(|want| {
                self.faces
                    .keys()
                    .find(|name| name.eq_ignore_ascii_case(want))
                    .map(String::as_str)
            })
            .or(self.default_family.as_deref())
    }

    pub(crate) fn face(&self, family: &str) -> Option<&vello_cpu::peniko::FontData> {
        self.faces.get(family)
    }

    /// Shape and lay out plain text in `family`, wrapping at `max_width_px` when given.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: Option<f32>,
    ) -> SlidecastResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(SlidecastError::validation(
                "text size must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.to_owned())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(max_width_px);
        layout.align(
            max_width_px,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}
