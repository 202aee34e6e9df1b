pub mod math {
    pub fn degree_to_radian(degree: f32) -> f32 {
        degree * std::f32::consts::PI / 180.0
    }

    /// Wrap an angle in degrees into `[0, 360)`.
    pub fn wrap_degrees(degree: f32) -> f32 {
        let wrapped = degree.rem_euclid(360.0);
        // rem_euclid rounds tiny negative inputs up to exactly 360.0
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wraps_into_half_open_range() {
            assert_eq!(wrap_degrees(360.0), 0.0);
            assert_eq!(wrap_degrees(-90.0), 270.0);
            assert!((wrap_degrees(361.0) - 1.0).abs() < 1e-4);
            let tiny = wrap_degrees(-1e-9);
            assert!((0.0..360.0).contains(&tiny));
        }

        #[test]
        fn converts_degrees() {
            assert!((degree_to_radian(180.0) - std::f32::consts::PI).abs() < 1e-6);
        }
    }
}
