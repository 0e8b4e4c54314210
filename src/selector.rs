use crate::bbox::{BBox, Ltrb};
use nalgebra as na;

/// Half size of the square around a corner that accepts a grab
pub const DEFAULT_HIT_TOLERANCE: f32 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    A,
    B,
}

/// A draggable corner point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub pos: na::Point2<f32>,
    pub dragged: bool,
}

impl Handle {
    fn new(pos: na::Point2<f32>) -> Self {
        Self {
            pos,
            dragged: false,
        }
    }

    #[inline]
    pub fn is_in_range(&self, p: &na::Point2<f32>, tolerance: f32) -> bool {
        (self.pos.x - p.x).abs() <= tolerance && (self.pos.y - p.y).abs() <= tolerance
    }
}

/// Rectangle defined by two corners which can be in any order.
/// At most one corner is dragged at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    a: Handle,
    b: Handle,
    tolerance: f32,
}

impl Selection {
    /// Starts a new zero-area selection at `p` with corner B grabbed
    pub fn begin(p: na::Point2<f32>, tolerance: f32) -> Self {
        let mut selection = Self {
            a: Handle::new(p),
            b: Handle::new(p),
            tolerance,
        };
        selection.grab(Corner::B);
        selection
    }

    #[inline]
    pub fn corner(&self, corner: Corner) -> &Handle {
        match corner {
            Corner::A => &self.a,
            Corner::B => &self.b,
        }
    }

    #[inline]
    fn corner_mut(&mut self, corner: Corner) -> &mut Handle {
        match corner {
            Corner::A => &mut self.a,
            Corner::B => &mut self.b,
        }
    }

    pub fn hit_test(&self, p: na::Point2<f32>) -> Option<Corner> {
        if self.a.is_in_range(&p, self.tolerance) {
            Some(Corner::A)
        } else if self.b.is_in_range(&p, self.tolerance) {
            Some(Corner::B)
        } else {
            None
        }
    }

    pub fn grab(&mut self, corner: Corner) {
        self.a.dragged = corner == Corner::A;
        self.b.dragged = corner == Corner::B;
    }

    pub fn dragged(&self) -> Option<Corner> {
        if self.a.dragged {
            Some(Corner::A)
        } else if self.b.dragged {
            Some(Corner::B)
        } else {
            None
        }
    }

    #[inline]
    pub fn drag_to(&mut self, corner: Corner, p: na::Point2<f32>) {
        self.corner_mut(corner).pos = p;
    }

    pub fn end_drag(&mut self) {
        self.a.dragged = false;
        self.b.dragged = false;
    }

    #[inline]
    pub fn start(&self) -> na::Point2<f32> {
        self.a.pos
    }

    #[inline]
    pub fn end(&self) -> na::Point2<f32> {
        self.b.pos
    }

    #[inline]
    pub fn bounding_box(&self) -> BBox<Ltrb> {
        BBox::from_corners(self.a.pos, self.b.pos)
    }
}
