//! The boundary between an entity and whatever renders it.
//!
//! The mesh never draws anything. It reads two rectangles from the thing
//! being positioned (the box itself, and the box unioned with any
//! substructure it owns) and writes absolute positions back. Everything
//! else about rendering lives on the other side of this trait.

use berth_core::{bounding_box, Rect};

/// Read/write access to the rectangle an entity occupies.
pub trait Surface {
    /// The entity's own box.
    fn rectangle(&self) -> Rect;

    /// The own box unioned with any substructure; equals [`rectangle`]
    /// when there is none.
    ///
    /// [`rectangle`]: Surface::rectangle
    fn bounding_rectangle(&self) -> Rect;

    /// Moves the box to an absolute position. Substructure travels with it.
    fn move_to(&mut self, left: f64, top: f64);
}

/// A plain rectangle-backed surface.
///
/// Children are rectangles positioned relative to the panel's top-left
/// corner, so they follow rigidly when the panel moves. A bare panel's
/// bounding rectangle is just its own box.
#[derive(Debug, Clone)]
pub struct PanelSurface {
    rect: Rect,
    children: Vec<Rect>,
}

impl PanelSurface {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            children: Vec::new(),
        }
    }

    /// Adds a child box at an offset relative to the panel origin.
    pub fn with_child(mut self, child: Rect) -> Self {
        self.children.push(child);
        self
    }
}

impl Surface for PanelSurface {
    fn rectangle(&self) -> Rect {
        self.rect
    }

    fn bounding_rectangle(&self) -> Rect {
        let mut rects = Vec::with_capacity(1 + self.children.len());
        rects.push(self.rect);
        rects.extend(
            self.children
                .iter()
                .map(|child| child.translate(self.rect.left, self.rect.top)),
        );
        // Never empty: the own box is always present.
        bounding_box(&rects).unwrap_or(self.rect)
    }

    fn move_to(&mut self, left: f64, top: f64) {
        self.rect.left = left;
        self.rect.top = top;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
