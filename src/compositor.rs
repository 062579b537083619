//! Foreground-over-background compositing
//!
//! Every function here is pure: inputs are borrowed, results are freshly
//! allocated buffers. Placement outside the canvas is clipped, never an error.

use crate::{
    config::{Anchor, Placement, ShadowOffset, ShadowSpec},
    error::{CompositeError, Result},
};
use image::{imageops, imageops::FilterType, GenericImageView, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Gaussian tail kept around the silhouette, in multiples of the blur radius
const SHADOW_PADDING_FACTOR: u32 = 3;

/// Largest layer (in pixels) the compositor will allocate, 1 GiB of RGBA8
pub const MAX_LAYER_PIXELS: u64 = 16_384 * 16_384;

/// Top-left position of a layer on the canvas, may be negative or off-canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    #[must_use]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn translate(self, dx: i64, dy: i64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i64, i64)> for Position {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

/// Blurred silhouette ready to be blended under a foreground
///
/// The canvas is grown by `padding` on every side, so the silhouette itself
/// starts at `(padding, padding)`. [`Shadow::position`] folds both the
/// padding and the offset into one placement.
#[derive(Debug, Clone)]
pub struct Shadow {
    pub image: RgbaImage,
    pub padding: u32,
    pub offset: ShadowOffset,
}

impl Shadow {
    /// Canvas position for a foreground drawn at `foreground`
    #[must_use]
    pub fn position(&self, foreground: Position) -> Position {
        let padding = i64::from(self.padding);
        foreground.translate(
            -i64::from(self.offset.dx) - padding,
            -i64::from(self.offset.dy) - padding,
        )
    }
}

/// Outcome of a composite, with the geometry that produced it
#[derive(Debug, Clone)]
pub struct CompositeOutcome {
    pub image: RgbaImage,
    pub foreground_position: Position,
    pub foreground_dimensions: (u32, u32),
    pub shadow_drawn: bool,
}

/// Reject images with zero width or height
///
/// # Errors
/// - Either dimension is zero
pub fn ensure_non_empty<I: GenericImageView>(image: &I, name: &str) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CompositeError::invalid_parameter(format!(
            "{} image has zero area ({}x{})",
            name, width, height
        )));
    }
    Ok(())
}

/// Reject layers whose area exceeds [`MAX_LAYER_PIXELS`]
///
/// # Errors
/// - `width * height` is larger than the pixel budget
pub fn ensure_pixel_budget(width: u32, height: u32, name: &str) -> Result<()> {
    let within_budget = u64::from(width)
        .checked_mul(u64::from(height))
        .is_some_and(|pixels| pixels <= MAX_LAYER_PIXELS);
    if !within_budget {
        return Err(CompositeError::invalid_parameter(format!(
            "{} of {}x{} exceeds the limit of {} pixels",
            name, width, height, MAX_LAYER_PIXELS
        )));
    }
    Ok(())
}

/// Resize by a scale factor with Lanczos3 resampling, alpha preserved
///
/// The target size is `floor(width * scale) x floor(height * scale)`.
///
/// # Errors
/// - Scale is not finite or not positive
/// - The scaled image would have zero area or exceed [`MAX_LAYER_PIXELS`]
pub fn resize_foreground(image: &RgbaImage, scale: f32) -> Result<RgbaImage> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CompositeError::config_value_error("scale", scale, "> 0", Some(1.0)));
    }
    ensure_non_empty(image, "foreground")?;

    if (scale - 1.0).abs() <= f32::EPSILON {
        return Ok(image.clone());
    }

    let (width, height) = image.dimensions();
    let new_width = scaled_dimension(width, scale)?;
    let new_height = scaled_dimension(height, scale)?;

    if new_width == 0 || new_height == 0 {
        return Err(CompositeError::invalid_parameter(format!(
            "scale {} shrinks {}x{} foreground to zero area",
            scale, width, height
        )));
    }
    ensure_pixel_budget(new_width, new_height, "scaled foreground")?;

    tracing::trace!(
        from = %format!("{}x{}", width, height),
        to = %format!("{}x{}", new_width, new_height),
        "Resizing foreground"
    );

    Ok(imageops::resize(image, new_width, new_height, FilterType::Lanczos3))
}

fn scaled_dimension(dimension: u32, scale: f32) -> Result<u32> {
    let scaled = (f64::from(dimension) * f64::from(scale)).floor();
    if scaled > f64::from(u32::MAX) {
        return Err(CompositeError::invalid_parameter(format!(
            "scale {} produces a dimension larger than {}",
            scale,
            u32::MAX
        )));
    }
    Ok(scaled as u32)
}

/// Downscale the foreground proportionally to fit inside the background
///
/// Never upscales. The limiting dimension matches the background exactly,
/// the other one is rounded to nearest.
///
/// # Errors
/// - Either image has zero area
pub fn fit_foreground_to_background(
    foreground: &RgbaImage,
    background: &RgbaImage,
) -> Result<RgbaImage> {
    ensure_non_empty(foreground, "foreground")?;
    ensure_non_empty(background, "background")?;

    let (fg_w, fg_h) = foreground.dimensions();
    let (bg_w, bg_h) = background.dimensions();

    if fg_w <= bg_w && fg_h <= bg_h {
        return Ok(foreground.clone());
    }

    let (fg_w64, fg_h64) = (u64::from(fg_w), u64::from(fg_h));
    let (bg_w64, bg_h64) = (u64::from(bg_w), u64::from(bg_h));

    // Compare fg_w / bg_w against fg_h / bg_h without floating point
    let (new_w, new_h) = if fg_w64 * bg_h64 >= fg_h64 * bg_w64 {
        let h = (fg_h64 * bg_w64 + fg_w64 / 2) / fg_w64;
        (bg_w, h.max(1) as u32)
    } else {
        let w = (fg_w64 * bg_h64 + fg_h64 / 2) / fg_h64;
        (w.max(1) as u32, bg_h)
    };

    tracing::debug!(
        from = %format!("{}x{}", fg_w, fg_h),
        to = %format!("{}x{}", new_w, new_h),
        "Fitting foreground to background"
    );

    Ok(imageops::resize(foreground, new_w, new_h, FilterType::Lanczos3))
}

/// Offset that centers the foreground over the background
///
/// Uses floor division, so an oversized foreground gets a negative offset.
#[must_use]
pub fn compute_centered_offset<B, F>(background: &B, foreground: &F) -> (i64, i64)
where
    B: GenericImageView,
    F: GenericImageView,
{
    let (bg_w, bg_h) = background.dimensions();
    let (fg_w, fg_h) = foreground.dimensions();
    let x = (i64::from(bg_w) - i64::from(fg_w)).div_euclid(2);
    let y = (i64::from(bg_h) - i64::from(fg_h)).div_euclid(2);
    (x, y)
}

/// Final top-left position of the scaled foreground
///
/// `Anchor::Center` centers the foreground as it was before scaling, so a
/// scaled layer grows right and down from that point. `Anchor::ScaledCenter`
/// centers the scaled layer itself.
#[must_use]
pub fn resolve_position<B, U, S>(
    placement: &Placement,
    background: &B,
    unscaled: &U,
    scaled: &S,
) -> Position
where
    B: GenericImageView,
    U: GenericImageView,
    S: GenericImageView,
{
    let base = match placement.anchor {
        Anchor::Center => Position::from(compute_centered_offset(background, unscaled)),
        Anchor::ScaledCenter => Position::from(compute_centered_offset(background, scaled)),
        Anchor::TopLeft => Position::default(),
    };
    base.translate(i64::from(placement.offset_x), i64::from(placement.offset_y))
}

/// Black image carrying the foreground's alpha scaled by `opacity`
#[must_use]
pub fn silhouette(foreground: &RgbaImage, opacity: f32) -> RgbaImage {
    let opacity = opacity.clamp(0.0, 1.0);
    let exact = (opacity - 1.0).abs() <= f32::EPSILON;

    let mut mask = RgbaImage::new(foreground.width(), foreground.height());
    for (target, source) in mask.pixels_mut().zip(foreground.pixels()) {
        let alpha = if exact {
            source[3]
        } else {
            (f32::from(source[3]) * opacity).round().clamp(0.0, 255.0) as u8
        };
        *target = Rgba([0, 0, 0, alpha]);
    }
    mask
}

/// Build a soft shadow from the foreground's alpha channel
///
/// # Errors
/// - Foreground has zero area
/// - Blur radius of zero
/// - Padded canvas would exceed [`MAX_LAYER_PIXELS`]
pub fn synthesize_shadow(
    foreground: &RgbaImage,
    blur_radius: u32,
    offset: ShadowOffset,
) -> Result<Shadow> {
    synthesize_shadow_with_opacity(foreground, blur_radius, offset, 1.0)
}

/// Build a soft shadow with the silhouette alpha scaled by `opacity`
///
/// # Errors
/// - Foreground has zero area
/// - Blur radius of zero or opacity outside 0.0-1.0
/// - Padded canvas would exceed [`MAX_LAYER_PIXELS`]
pub fn synthesize_shadow_with_opacity(
    foreground: &RgbaImage,
    blur_radius: u32,
    offset: ShadowOffset,
    opacity: f32,
) -> Result<Shadow> {
    ensure_non_empty(foreground, "foreground")?;
    ShadowSpec {
        enabled: true,
        blur_radius,
        offset,
        opacity,
    }
    .validate()?;

    let padding = blur_radius.saturating_mul(SHADOW_PADDING_FACTOR);
    let grow = |dimension: u32| {
        padding
            .checked_mul(2)
            .and_then(|p| dimension.checked_add(p))
            .ok_or_else(|| {
                CompositeError::invalid_parameter(format!(
                    "blur radius {} is too large for a {}x{} foreground",
                    blur_radius,
                    foreground.width(),
                    foreground.height()
                ))
            })
    };
    let canvas_width = grow(foreground.width())?;
    let canvas_height = grow(foreground.height())?;
    ensure_pixel_budget(canvas_width, canvas_height, "shadow canvas")?;

    let mut canvas = RgbaImage::new(canvas_width, canvas_height);
    imageops::replace(
        &mut canvas,
        &silhouette(foreground, opacity),
        i64::from(padding),
        i64::from(padding),
    );

    let blurred = imageops::blur(&canvas, blur_radius as f32);

    tracing::trace!(
        blur_radius,
        padding,
        canvas = %format!("{}x{}", canvas_width, canvas_height),
        "Synthesized shadow"
    );

    Ok(Shadow {
        image: blurred,
        padding,
        offset,
    })
}

/// Paste `layer` onto `canvas` at `(x, y)` using the layer's alpha as mask
///
/// Transparent layer pixels leave the canvas untouched, opaque ones replace
/// it exactly and partial alpha blends proportionally. Anything outside the
/// canvas is clipped.
///
/// This is source-over: unlike a mask paste, the canvas alpha is combined
/// with the layer alpha, so soft edges over an opaque canvas stay opaque.
pub fn alpha_blend(canvas: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    let (canvas_w, canvas_h) = (i64::from(canvas.width()), i64::from(canvas.height()));
    let (layer_w, layer_h) = (i64::from(layer.width()), i64::from(layer.height()));

    // Overlap in layer coordinates
    let start_x = (-x).clamp(0, layer_w);
    let start_y = (-y).clamp(0, layer_h);
    let end_x = (canvas_w - x).clamp(0, layer_w);
    let end_y = (canvas_h - y).clamp(0, layer_h);

    if start_x >= end_x || start_y >= end_y {
        tracing::trace!(x, y, "Layer lies entirely outside the canvas");
        return;
    }

    for ly in start_y..end_y {
        for lx in start_x..end_x {
            let source = layer.get_pixel(lx as u32, ly as u32);
            let target = canvas.get_pixel_mut((lx + x) as u32, (ly + y) as u32);
            *target = blend_pixel(*target, *source);
        }
    }
}

fn blend_pixel(destination: Rgba<u8>, source: Rgba<u8>) -> Rgba<u8> {
    match source[3] {
        0 => destination,
        255 => source,
        alpha => {
            let src_a = f32::from(alpha) / 255.0;
            let dst_a = f32::from(destination[3]) / 255.0;
            let inv_a = 1.0 - src_a;
            let out_a = src_a + dst_a * inv_a;

            let channel = |i: usize| {
                let blended = (f32::from(source[i]) * src_a
                    + f32::from(destination[i]) * dst_a * inv_a)
                    / out_a;
                blended.round().clamp(0.0, 255.0) as u8
            };

            Rgba([
                channel(0),
                channel(1),
                channel(2),
                (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
            ])
        },
    }
}

/// Composite the foreground (and optional shadow) over a copy of the background
///
/// # Errors
/// - Zero-area background or foreground
/// - Invalid scale or shadow parameters
pub fn composite(
    background: &RgbaImage,
    foreground: &RgbaImage,
    placement: &Placement,
    shadow: Option<&ShadowSpec>,
) -> Result<RgbaImage> {
    composite_detailed(background, foreground, placement, shadow).map(|outcome| outcome.image)
}

/// Same as [`composite`] but also reports the resolved geometry
///
/// # Errors
/// - Zero-area background or foreground
/// - Invalid scale or shadow parameters
pub fn composite_detailed(
    background: &RgbaImage,
    foreground: &RgbaImage,
    placement: &Placement,
    shadow: Option<&ShadowSpec>,
) -> Result<CompositeOutcome> {
    ensure_non_empty(background, "background")?;
    ensure_non_empty(foreground, "foreground")?;
    placement.validate()?;
    let shadow = shadow.filter(|spec| spec.enabled);
    if let Some(spec) = shadow {
        spec.validate()?;
    }

    let mut canvas = background.clone();

    let fitted;
    let source = if placement.fit_to_background {
        fitted = fit_foreground_to_background(foreground, background)?;
        &fitted
    } else {
        foreground
    };
    let layer = resize_foreground(source, placement.scale)?;
    let position = resolve_position(placement, background, source, &layer);

    if let Some(spec) = shadow {
        let shadow =
            synthesize_shadow_with_opacity(&layer, spec.blur_radius, spec.offset, spec.opacity)?;
        let at = shadow.position(position);
        alpha_blend(&mut canvas, &shadow.image, at.x, at.y);
    }

    alpha_blend(&mut canvas, &layer, position.x, position.y);

    tracing::debug!(
        x = position.x,
        y = position.y,
        width = layer.width(),
        height = layer.height(),
        shadow = shadow.is_some(),
        "Foreground composited"
    );

    Ok(CompositeOutcome {
        image: canvas,
        foreground_position: position,
        foreground_dimensions: layer.dimensions(),
        shadow_drawn: shadow.is_some(),
    })
}
