//! Joint state hypotheses over all tracked objects.

use std::fmt;

use crate::io::Region;

/// Axis-aligned bounding box in image coordinates, `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Box of the given size centred at `(cx, cy)`.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter_w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let inter_h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter_area = inter_w * inter_h;

        let union_area = self.area() + other.area() - inter_area;
        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

/// State of a single object inside a joint hypothesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectState {
    /// Current centre x.
    pub x: f64,
    /// Current centre y (image row).
    pub y: f64,
    /// Current scale.
    pub s: f64,
    /// Previous centre x.
    pub xp: f64,
    /// Previous centre y.
    pub yp: f64,
    /// Previous scale.
    pub sp: f64,
    /// Centre x at detection time.
    pub x0: f64,
    /// Centre y at detection time.
    pub y0: f64,
    /// Bounding width at scale 1.
    pub width: f64,
    /// Bounding height at scale 1.
    pub height: f64,
    /// Observation weight of this sub-state.
    pub weight: f64,
}

impl ObjectState {
    /// State at rest on the centre of a detection region.
    ///
    /// `center_y` is expected in image-row coordinates.
    pub fn at_rest(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            x: center_x,
            y: center_y,
            s: 1.0,
            xp: center_x,
            yp: center_y,
            sp: 1.0,
            x0: center_x,
            y0: center_y,
            width,
            height,
            weight: 0.0,
        }
    }

    /// Initial state for a region given in bottom-left-origin coordinates.
    pub fn from_region(region: &Region, frame_height: u32) -> Self {
        Self::at_rest(
            region.center_x,
            region.image_row(frame_height),
            region.width,
            region.height,
        )
    }

    /// Scaled window width.
    #[inline]
    pub fn scaled_width(&self) -> f64 {
        self.width * self.s
    }

    /// Scaled window height.
    #[inline]
    pub fn scaled_height(&self) -> f64 {
        self.height * self.s
    }

    /// Bounding box of the scaled window.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center(self.x, self.y, self.scaled_width(), self.scaled_height())
    }

    /// Move to the position and scale of `proposed`, remembering the current ones.
    pub fn accept(&mut self, proposed: &ObjectState) {
        self.xp = self.x;
        self.yp = self.y;
        self.sp = self.s;

        self.x = proposed.x;
        self.y = proposed.y;
        self.s = proposed.s;

        self.weight = proposed.weight;
    }
}

/// One joint hypothesis: a sub-state for every tracked object.
#[derive(Clone, PartialEq, Default)]
pub struct Particle {
    pub objects: Vec<ObjectState>,
}

impl Particle {
    pub fn new(objects: Vec<ObjectState>) -> Self {
        Self { objects }
    }

    /// Number of objects carried by this hypothesis.
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Joint weight: the sum of the per-object weights.
    pub fn joint_weight(&self) -> f64 {
        self.objects.iter().map(|o| o.weight).sum()
    }

    /// Bounding boxes of every object.
    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        self.objects.iter().map(ObjectState::bounding_box).collect()
    }

    /// Replace object `m`'s position and scale with the proposed ones.
    ///
    /// All other objects keep their sub-states.
    pub fn accept_object(&mut self, m: usize, proposed: &Particle) {
        self.objects[m].accept(&proposed.objects[m]);
    }
}

impl fmt::Debug for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("num_objects", &self.objects.len())
            .field("joint_weight", &self.joint_weight())
            .field("objects", &self.objects)
            .finish()
    }
}
