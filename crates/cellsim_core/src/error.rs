use thiserror::Error;

/// Rejected scenario configuration. Raised by `reset` before any entity is created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("{field} range is inverted: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be a probability in [0, 1] (got {value})")]
    InvalidProbability { field: &'static str, value: f64 },
    #[error("{field} lies outside the service area [0, {area_max}]")]
    OutsideArea { field: &'static str, area_max: f64 },
    #[error("could not place {requested} obstruction zones for cell {cell} (placed {placed})")]
    ObstructionPlacement {
        cell: u32,
        requested: usize,
        placed: usize,
    },
}

/// Failure of a record sink. The engine logs it and keeps running.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink rejected record: {0}")]
    Backend(String),
}

pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn ensure_count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroCount { field })
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_range(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max || min.is_nan() || max.is_nan() {
        Err(ConfigError::InvertedRange { field, min, max })
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_helpers_reject_bad_values() {
        assert!(ensure_positive("bandwidth", 20.0).is_ok());
        assert_eq!(
            ensure_positive("bandwidth", 0.0),
            Err(ConfigError::NonPositive {
                field: "bandwidth",
                value: 0.0
            })
        );
        assert!(ensure_positive("bandwidth", f64::INFINITY).is_err());
        assert!(ensure_count("cells", 0).is_err());
        assert!(ensure_range("x", 5.0, 1.0).is_err());
        assert!(ensure_range("x", 1.0, 1.0).is_ok());
        assert!(ensure_probability("p", 1.5).is_err());
        assert!(ensure_probability("p", 0.0).is_ok());
    }

    #[test]
    fn errors_render_descriptive_messages() {
        let err = ConfigError::InvertedRange {
            field: "cell_x",
            min: 10.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "cell_x range is inverted: min 10 > max 1");
    }
}
