/// A range of ray parameters `t`.
///
/// Hit searches use the open form ([`Interval::surrounds`]): a hit exactly at
/// `t_min` or at the current closest distance is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Contains nothing; `min > max`.
    pub const EMPTY: Interval = Interval {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub const UNIVERSE: Interval = Interval {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    /// `min <= t <= max`
    pub fn contains(&self, t: f64) -> bool {
        (self.min..=self.max).contains(&t)
    }

    /// `min < t < max`
    pub fn surrounds(&self, t: f64) -> bool {
        self.min < t && t < self.max
    }

    /// Same lower bound, new upper bound. Closest-hit searches shrink the
    /// window this way after every accepted hit.
    pub fn with_max(&self, max: f64) -> Interval {
        Interval { min: self.min, max }
    }
}
