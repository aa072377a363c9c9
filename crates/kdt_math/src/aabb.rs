use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box used by the k-d index.
///
/// Stored as two corners with `low <= high` component-wise. The only way a
/// box changes is [`Aabb::expand`], which never shrinks it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub low: Vec3,
    pub high: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// The unset box. Expanding it by any box yields that box.
    pub const EMPTY: Aabb = Aabb {
        low: Vec3::splat(f64::INFINITY),
        high: Vec3::splat(f64::NEG_INFINITY),
    };

    /// Create a box from its two corners.
    pub fn new(low: Vec3, high: Vec3) -> Self {
        Self { low, high }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Box centered on `center` reaching `half` along each axis.
    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self::from_points(center - half, center + half)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        let mut out = *a;
        out.expand(b);
        out
    }

    /// Grow this box to the union with `other`.
    pub fn expand(&mut self, other: &Aabb) {
        self.low = self.low.min(other.low);
        self.high = self.high.max(other.high);
    }

    /// True for the unset box (or anything with an inverted axis).
    pub fn is_empty(&self) -> bool {
        self.low.x > self.high.x || self.low.y > self.high.y || self.low.z > self.high.z
    }

    /// Size along each axis, zero for the unset box.
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.high - self.low
        }
    }

    pub fn half_extent(&self) -> Vec3 {
        self.extent() * 0.5
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.low + self.high) * 0.5
    }

    /// Index (0=X, 1=Y, 2=Z) of the widest axis. Ties go to X, then Y.
    pub fn longest_axis(&self) -> usize {
        let size = self.extent();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        (0..3).all(|axis| self.low[axis] <= p[axis] && p[axis] <= self.high[axis])
    }

    /// True if `other` lies entirely inside this box. The unset box is
    /// contained by everything.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.contains_point(other.low) && self.contains_point(other.high))
    }

    /// Slab test: does the ray touch this box anywhere at `t >= 0`?
    ///
    /// Reports existence only; callers that need distances use
    /// [`Aabb::slab_interval`].
    pub fn intersect(&self, ray: &Ray) -> bool {
        // Both bounds behind the origin means the box is behind the ray.
        self.slab_interval(ray).is_some_and(|span| span.max >= 0.0)
    }

    /// Parameter range over which the ray's line is inside the box, or `None`
    /// when the line misses it.
    ///
    /// The near/far bound per axis is picked from the sign of the reciprocal
    /// direction, so a zero direction component turns into an infinite slab
    /// distance instead of a division fault.
    pub fn slab_interval(&self, ray: &Ray) -> Option<Interval> {
        if self.is_empty() {
            return None;
        }

        let inv = ray.direction.recip();
        let bounds = [self.low, self.high];
        let mut span = Interval::UNIVERSE;

        for axis in 0..3 {
            let sign = usize::from(inv[axis].is_sign_negative());
            let near = slab_distance(bounds[sign][axis], ray.origin[axis], inv[axis], f64::NEG_INFINITY);
            let far = slab_distance(bounds[1 - sign][axis], ray.origin[axis], inv[axis], f64::INFINITY);

            if span.min > far || near > span.max {
                return None;
            }
            if near > span.min {
                span.min = near;
            }
            if far < span.max {
                span.max = far;
            }
        }

        Some(span)
    }
}

/// Distance to one slab plane. `0 * inf` happens when the ray runs inside the
/// plane itself; that counts as inside the slab, hence the `open` fallback.
#[inline]
fn slab_distance(bound: f64, origin: f64, inv: f64, open: f64) -> f64 {
    let t = (bound - origin) * inv;
    if t.is_nan() {
        open
    } else {
        t
    }
}
