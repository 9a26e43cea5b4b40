#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid zoom level")]
pub struct InvalidZoom;

/// Zoom level kept within the bounds of the viewport it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    value: f64,
    min: f64,
    max: f64,
}

impl Zoom {
    pub fn new(value: f64, min: f64, max: f64) -> Result<Self, InvalidZoom> {
        if !(min.is_finite() && max.is_finite() && min <= max && (min..=max).contains(&value)) {
            return Err(InvalidZoom);
        }
        Ok(Self { value, min, max })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        *self = Self::new(self.value + 1., self.min, self.max)?;
        Ok(())
    }

    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        *self = Self::new(self.value - 1., self.min, self.max)?;
        Ok(())
    }

    /// Zoom using a relative value, stopping at the bounds.
    pub fn zoom_by(&mut self, value: f64) {
        if value.is_finite() {
            self.value = (self.value + value).clamp(self.min, self.max);
        }
    }
}
