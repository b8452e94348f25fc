/// Shannon-capacity throughput estimate.
///
/// `bandwidth` is the nominal allocation; the dynamic policy adds `bonus` on
/// top. The estimator holds no state, so the same terminal can be evaluated
/// under both policies in the same tick.
pub fn estimate(bandwidth: f64, bonus: f64, dynamic: bool, sinr_linear: f64) -> f64 {
    if sinr_linear.is_nan() || sinr_linear <= 0.0 {
        return 0.0;
    }
    effective_bandwidth(bandwidth, bonus, dynamic) * (1.0 + sinr_linear).log2()
}

pub fn effective_bandwidth(bandwidth: f64, bonus: f64, dynamic: bool) -> f64 {
    if dynamic {
        bandwidth + bonus
    } else {
        bandwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_throughput_uses_nominal_bandwidth() {
        // log2(1 + 3) = 2
        assert!((estimate(20.0, 10.0, false, 3.0) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn dynamic_throughput_adds_bonus() {
        assert!((estimate(20.0, 10.0, true, 3.0) - 60.0).abs() < 1e-12);
    }

    #[test]
    fn zero_or_invalid_sinr_gives_zero() {
        assert_eq!(estimate(20.0, 10.0, true, 0.0), 0.0);
        assert_eq!(estimate(20.0, 10.0, true, f64::NAN), 0.0);
    }
}
