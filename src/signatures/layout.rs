//! Signature placement on the page.
//!
//! Turns the caller's placement preferences into a concrete rectangle, or
//! decides the signature must be invisible. Every candidate value is checked
//! against the page and the margin; one rejected value makes the whole
//! signature invisible rather than clamped.

use super::types::{
    SignatureOptions, DEFAULT_FONT_SIZE, DEFAULT_PAGE_MARGIN, MAXIMUM_PAGE_MARGIN,
    SIGNATURE_LINE_HORIZONTAL_OFFSET, SIGNATURE_LINE_VERTICAL_OFFSET,
};
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};

/// Width and height of a page's media box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
}

impl PageSize {
    /// Create a new page size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Where and how the signature is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderLayout {
    /// Zero-based index of the page receiving the widget
    pub page_index: usize,
    /// Whether the widget gets an appearance stream
    pub is_visible: bool,
    /// Font size of the appearance text
    pub font_size: f32,
    /// Widget rectangle (`[0 0 0 0]` when invisible)
    pub rect: Rect,
    /// Baseline of the first appearance line
    pub text_anchor: Point,
}

impl PlaceholderLayout {
    /// Baseline of the `line`-th appearance line (0 is the top line).
    pub fn line_origin(&self, line: usize) -> Point {
        Point::new(
            self.text_anchor.x,
            self.text_anchor.y - line as f32 * (self.font_size + 2.0),
        )
    }
}

/// Compute the signature layout for `pages` from the caller's preferences.
///
/// # Errors
///
/// Fails with [`Error::InputValidation`] when the document has no pages.
pub fn compute_layout(pages: &[PageSize], options: &SignatureOptions) -> Result<PlaceholderLayout> {
    if pages.is_empty() {
        return Err(Error::InputValidation("A valid pages array is required".to_string()));
    }

    let page_index = match options.page_number {
        Some(n) if n > 0 && (n as usize) <= pages.len() => n as usize - 1,
        _ => 0,
    };
    let page = pages[page_index];

    let font_size = options
        .font_size
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE);

    let max_margin = MAXIMUM_PAGE_MARGIN
        .min(page.width / 2.0)
        .min(page.height / 2.0);
    let margin = options
        .page_margin
        .filter(|m| *m >= 0.0 && *m <= max_margin)
        .unwrap_or(DEFAULT_PAGE_MARGIN);

    let width = options
        .width
        .filter(|w| *w > 0.0 && *w <= page.width - 2.0 * margin);
    let height = options
        .height
        .filter(|h| *h > 0.0 && *h <= page.height - 2.0 * margin);

    let rect = fit_rect(page, margin, options.x_position, options.y_position, width, height);

    let layout = match rect {
        Some(rect) => PlaceholderLayout {
            page_index,
            is_visible: true,
            font_size,
            rect,
            text_anchor: Point::new(
                rect.llx + SIGNATURE_LINE_HORIZONTAL_OFFSET,
                rect.ury - SIGNATURE_LINE_VERTICAL_OFFSET,
            ),
        },
        None => PlaceholderLayout {
            page_index,
            is_visible: false,
            font_size,
            rect: Rect::zero(),
            text_anchor: Point::default(),
        },
    };

    log::debug!(
        "Signature layout: page {} visible={} rect={:?}",
        page_index + 1,
        layout.is_visible,
        layout.rect.to_array()
    );

    Ok(layout)
}

/// Place a `width` × `height` rectangle at `(x, y)` inside the margins.
fn fit_rect(
    page: PageSize,
    margin: f32,
    x: Option<f32>,
    y: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
) -> Option<Rect> {
    let (width, height) = (width?, height?);

    let llx = x.filter(|x| *x >= margin && x + width <= page.width - margin)?;
    let lly = y.filter(|y| *y >= margin && y + height <= page.height - margin)?;

    Some(Rect::from_origin_size(llx, lly, width, height))
}
