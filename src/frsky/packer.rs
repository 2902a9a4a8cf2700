//! # Scalar Packer
//!
//! Pure functions mapping vehicle quantities into fixed-width bit lanes of
//! the 32-bit passthrough words, plus the number formats of the legacy
//! protocols.
//!
//! ## Lane table
//!
//! | Word | Lane | Width | Offset | Limit |
//! |------|------|-------|--------|-------|
//! | GPS status | satellites | 4 | 0 | 0xF |
//! | GPS status | fix type | 2 | 4 | 0x3 |
//! | GPS status | HDOP | 8 | 6 | |
//! | GPS status | VDOP | 8 | 14 | |
//! | GPS status | MSL altitude | 10 | 22 | |
//! | Battery | voltage | 9 | 0 | 0x1FF |
//! | Battery | current | 8 | 9 | |
//! | Battery | consumed mAh | 15 | 17 | 0x7FFF |
//! | AP status | control mode | 5 | 0 | 0x1F |
//! | AP status | simple mode | 2 | 5 | |
//! | AP status | land complete | 1 | 7 | |
//! | AP status | armed | 1 | 8 | |
//! | AP status | battery failsafe | 1 | 9 | |
//! | AP status | EKF failsafe | 1 | 10 | |
//! | Home | distance | 12 | 0 | |
//! | Home | relative altitude | 13 | 12 | |
//! | Home | bearing | 7 | 25 | 0x7F |
//! | Velocity/yaw | vertical velocity | 9 | 0 | |
//! | Velocity/yaw | horizontal velocity | 8 | 9 | |
//! | Velocity/yaw | yaw | 11 | 17 | 0x7FF |
//! | Attitude/range | roll | 11 | 0 | 0x7FF |
//! | Attitude/range | pitch | 10 | 11 | 0x3FF |
//! | Attitude/range | range finder | 11 | 21 | |
//!
//! Values are saturated to the lane limit before shifting, never wrapped, so
//! an oversized value cannot bleed into the neighbouring lane. Lanes fed by
//! [`prep_number`] carry its sign bit as their top bit.

/// One packed sub-field of a 32-bit word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub width: u8,
    pub offset: u8,
    pub limit: u32,
}

impl FieldSpec {
    /// Lane whose limit is the full width
    pub const fn new(width: u8, offset: u8) -> Self {
        Self {
            width,
            offset,
            limit: lane_mask(width),
        }
    }

    /// Lane with an explicit saturating limit
    pub const fn with_limit(width: u8, offset: u8, limit: u32) -> Self {
        Self {
            width,
            offset,
            limit,
        }
    }

    /// Bits of the word covered by this lane
    pub const fn word_mask(&self) -> u32 {
        lane_mask(self.width) << self.offset
    }
}

const fn lane_mask(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Lane definitions
pub mod fields {
    use super::FieldSpec;

    pub const GPS_SATS: FieldSpec = FieldSpec::with_limit(4, 0, 0xF);
    pub const GPS_FIX: FieldSpec = FieldSpec::with_limit(2, 4, 0x3);
    pub const GPS_HDOP: FieldSpec = FieldSpec::new(8, 6);
    pub const GPS_VDOP: FieldSpec = FieldSpec::new(8, 14);
    pub const GPS_ALT_MSL: FieldSpec = FieldSpec::new(10, 22);

    pub const BATT_VOLTAGE: FieldSpec = FieldSpec::with_limit(9, 0, 0x1FF);
    pub const BATT_CURRENT: FieldSpec = FieldSpec::new(8, 9);
    pub const BATT_CONSUMED_MAH: FieldSpec = FieldSpec::with_limit(15, 17, 0x7FFF);

    pub const AP_CONTROL_MODE: FieldSpec = FieldSpec::with_limit(5, 0, 0x1F);
    pub const AP_SIMPLE_MODE: FieldSpec = FieldSpec::new(2, 5);
    pub const AP_LAND_COMPLETE: FieldSpec = FieldSpec::new(1, 7);
    pub const AP_ARMED: FieldSpec = FieldSpec::new(1, 8);
    pub const AP_BATT_FAILSAFE: FieldSpec = FieldSpec::new(1, 9);
    pub const AP_EKF_FAILSAFE: FieldSpec = FieldSpec::new(1, 10);

    pub const HOME_DISTANCE: FieldSpec = FieldSpec::new(12, 0);
    pub const HOME_ALT: FieldSpec = FieldSpec::new(13, 12);
    pub const HOME_BEARING: FieldSpec = FieldSpec::with_limit(7, 25, 0x7F);

    pub const VEL_VERTICAL: FieldSpec = FieldSpec::new(9, 0);
    pub const VEL_HORIZONTAL: FieldSpec = FieldSpec::new(8, 9);
    pub const VEL_YAW: FieldSpec = FieldSpec::with_limit(11, 17, 0x7FF);

    pub const ATT_ROLL: FieldSpec = FieldSpec::with_limit(11, 0, 0x7FF);
    pub const ATT_PITCH: FieldSpec = FieldSpec::with_limit(10, 11, 0x3FF);
    pub const ATT_RANGE: FieldSpec = FieldSpec::new(11, 21);

    /// Every lane, grouped per word
    pub const WORDS: [&[FieldSpec]; 6] = [
        &[GPS_SATS, GPS_FIX, GPS_HDOP, GPS_VDOP, GPS_ALT_MSL],
        &[BATT_VOLTAGE, BATT_CURRENT, BATT_CONSUMED_MAH],
        &[
            AP_CONTROL_MODE,
            AP_SIMPLE_MODE,
            AP_LAND_COMPLETE,
            AP_ARMED,
            AP_BATT_FAILSAFE,
            AP_EKF_FAILSAFE,
        ],
        &[HOME_DISTANCE, HOME_ALT, HOME_BEARING],
        &[VEL_VERTICAL, VEL_HORIZONTAL, VEL_YAW],
        &[ATT_ROLL, ATT_PITCH, ATT_RANGE],
    ];
}

/// Saturate `value` to the lane limit and shift it into place
///
/// # Examples
///
/// ```
/// use frsky_telem::frsky::packer::{pack, unpack, fields};
///
/// let word = pack(5000, fields::BATT_VOLTAGE);
/// assert_eq!(unpack(word, fields::BATT_VOLTAGE), 0x1FF);
/// ```
pub fn pack(value: u32, spec: FieldSpec) -> u32 {
    value.min(spec.limit) << spec.offset
}

/// Extract a lane from a packed word
pub fn unpack(word: u32, spec: FieldSpec) -> u32 {
    (word >> spec.offset) & lane_mask(spec.width)
}

/// Pack a boolean flag lane
pub fn pack_flag(flag: bool, spec: FieldSpec) -> u32 {
    pack(u32::from(flag), spec)
}

/// Scale a physical value to an unsigned integer, rounding to nearest
///
/// Negative and NaN inputs saturate to zero.
pub fn scaled(value: f32, scale: f32) -> u32 {
    (value * scale).round() as u32
}

/// Scale a physical value to a signed integer, rounding to nearest
pub fn scaled_signed(value: f32, scale: f32) -> i32 {
    (value * scale).round() as i32
}

/// Compress a number into a few mantissa digits and a power-of-ten exponent
///
/// The exponent sits in the low `power` bits, the mantissa above it and the
/// sign bit on top. Magnitudes beyond the encodable range saturate to the
/// all-ones value.
///
/// | digits | power | mantissa bits | width incl. sign | max |
/// |--------|-------|---------------|------------------|-----|
/// | 2 | 1 | 7 | 9 | 1270 |
/// | 2 | 2 | 7 | 10 | 127000 |
/// | 3 | 1 | 10 | 12 | 10240 |
/// | 3 | 2 | 10 | 13 | 1024000 |
///
/// Unsupported digit/power combinations encode to 0.
pub fn prep_number(number: i32, digits: u8, power: u8) -> u16 {
    let abs = number.unsigned_abs();
    // rounding up at the top of a range must not spill into the next bit
    let max_mantissa: u16 = if digits == 2 { 0x7F } else { 0x3FF };
    let reduce = |n: u32, scale: f32| (((n as f32) * scale).round() as u16).min(max_mantissa);
    let tenth = |n: u32| reduce(n, 0.1);
    let hundredth = |n: u32| reduce(n, 0.01);
    let thousandth = |n: u32| reduce(n, 0.001);

    let (res, sign_bit) = match (digits, power) {
        (2, 1) => {
            let res = if abs < 100 {
                (abs as u16) << 1
            } else if abs < 1270 {
                (tenth(abs) << 1) | 0x1
            } else {
                0xFF
            };
            (res, 8)
        }
        (2, 2) => {
            let res = if abs < 100 {
                (abs as u16) << 2
            } else if abs < 1000 {
                (tenth(abs) << 2) | 0x1
            } else if abs < 10_000 {
                (hundredth(abs) << 2) | 0x2
            } else if abs < 127_000 {
                (thousandth(abs) << 2) | 0x3
            } else {
                0x1FF
            };
            (res, 9)
        }
        (3, 1) => {
            let res = if abs < 1000 {
                (abs as u16) << 1
            } else if abs < 10_240 {
                (tenth(abs) << 1) | 0x1
            } else {
                0x7FF
            };
            (res, 11)
        }
        (3, 2) => {
            let res = if abs < 1000 {
                (abs as u16) << 2
            } else if abs < 10_000 {
                (tenth(abs) << 2) | 0x1
            } else if abs < 100_000 {
                (hundredth(abs) << 2) | 0x2
            } else if abs < 1_024_000 {
                (thousandth(abs) << 2) | 0x3
            } else {
                0xFFF
            };
            (res, 12)
        }
        _ => return 0,
    };

    if number < 0 {
        res | (1 << sign_bit)
    } else {
        res
    }
}

/// Inverse of [`prep_number`], up to the rounding of the compressed range
///
/// Unsupported digit/power combinations decode to 0.
pub fn unprep_number(encoded: u16, digits: u8, power: u8) -> i32 {
    let mantissa_bits: u32 = match (digits, power) {
        (2, 1 | 2) => 7,
        (3, 1 | 2) => 10,
        _ => return 0,
    };
    let power = u32::from(power);
    let sign_bit = mantissa_bits + power;

    let exponent = u32::from(encoded) & ((1 << power) - 1);
    let mantissa = (u32::from(encoded) >> power) & ((1 << mantissa_bits) - 1);
    let magnitude = (mantissa * 10u32.pow(exponent)) as i32;

    if u32::from(encoded) & (1 << sign_bit) != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Split a value into the hub protocol's before-point / after-point pair
///
/// Both parts carry the sign of `value`, so a receiver adding them back
/// together sees -0.25 and 0.25 differently. The fraction is the first
/// `digits` decimals, truncated, and stays below `10^digits`. Send each part
/// as its 16-bit two's complement.
///
/// # Examples
///
/// ```
/// use frsky_telem::frsky::packer::split_decimal;
///
/// assert_eq!(split_decimal(123.45, 2), (123, 45));
/// assert_eq!(split_decimal(-2.5, 2), (-2, -50));
/// ```
pub fn split_decimal(value: f32, digits: u32) -> (i16, i16) {
    let whole = value.trunc();
    let scale = 10f32.powi(digits as i32);
    let magnitude = ((value - whole).abs() * scale + 1e-3)
        .floor()
        .min(scale - 1.0);
    let fraction = if value < 0.0 { -magnitude } else { magnitude };
    (whole as i16, fraction as i16)
}

/// Convert decimal degrees to the NMEA `dddmm.mmmm` layout
///
/// Degrees end up in the hundreds, minutes in the units and decimals.
pub fn degrees_to_ddmm(degrees: f64) -> f64 {
    let degrees = degrees.abs();
    let whole = degrees.trunc();
    whole * 100.0 + (degrees - whole) * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_clamps() {
        for spec in fields::WORDS.iter().flat_map(|w| w.iter()) {
            for value in [0u32, 1, 7, 0x7F, 0x1FF, 0x3FF, 0x7FF, 0x7FFF, 0xFFFF, u32::MAX] {
                let packed = pack(value, *spec);
                assert_eq!(
                    unpack(packed, *spec),
                    value.min(spec.limit),
                    "lane {:?} value {}",
                    spec,
                    value
                );
                assert_eq!(packed & !spec.word_mask(), 0, "lane {:?} leaked", spec);
            }
        }
    }

    #[test]
    fn test_lanes_do_not_overlap() {
        for word in fields::WORDS.iter() {
            let mut seen = 0u32;
            for spec in word.iter() {
                assert_eq!(seen & spec.word_mask(), 0, "lane {:?} overlaps", spec);
                assert!(u32::from(spec.offset) + u32::from(spec.width) <= 32);
                seen |= spec.word_mask();
            }
        }
    }

    #[test]
    fn test_pack_idempotent_under_clamping() {
        let spec = fields::ATT_PITCH;
        let once = unpack(pack(5000, spec), spec);
        let twice = unpack(pack(once, spec), spec);
        assert_eq!(once, twice);
        assert_eq!(once, 0x3FF);
    }

    #[test]
    fn test_battery_voltage_example() {
        let word = pack(scaled(12.34, 10.0), fields::BATT_VOLTAGE);
        assert_eq!(word, 123);
        let volts = unpack(word, fields::BATT_VOLTAGE) as f32 / 10.0;
        assert!((volts - 12.34).abs() <= 0.1);

        // 60 V does not fit in 9 bits of decivolts
        assert_eq!(pack(scaled(60.0, 10.0), fields::BATT_VOLTAGE), 0x1FF);
    }

    #[test]
    fn test_saturation_does_not_touch_neighbour() {
        let word = pack(u32::MAX, fields::ATT_ROLL) | pack(0, fields::ATT_PITCH);
        assert_eq!(unpack(word, fields::ATT_PITCH), 0);
    }

    #[test]
    fn test_scaled_negative_saturates_to_zero() {
        assert_eq!(scaled(-3.0, 10.0), 0);
        assert_eq!(scaled(f32::NAN, 10.0), 0);
        assert_eq!(scaled_signed(-3.04, 10.0), -30);
    }

    #[test]
    fn test_prep_number_2_1() {
        assert_eq!(prep_number(0, 2, 1), 0);
        assert_eq!(prep_number(99, 2, 1), 99 << 1);
        assert_eq!(prep_number(100, 2, 1), (10 << 1) | 1);
        assert_eq!(prep_number(1269, 2, 1), (127 << 1) | 1);
        assert_eq!(prep_number(5000, 2, 1), 0xFF);
        assert_eq!(prep_number(-5, 2, 1), (5 << 1) | (1 << 8));
    }

    #[test]
    fn test_prep_number_2_2() {
        assert_eq!(prep_number(42, 2, 2), 42 << 2);
        assert_eq!(prep_number(420, 2, 2), (42 << 2) | 1);
        assert_eq!(prep_number(4200, 2, 2), (42 << 2) | 2);
        assert_eq!(prep_number(42000, 2, 2), (42 << 2) | 3);
        assert_eq!(prep_number(200_000, 2, 2), 0x1FF);
        assert_eq!(prep_number(-42, 2, 2), (42 << 2) | (1 << 9));
    }

    #[test]
    fn test_prep_number_3_1() {
        assert_eq!(prep_number(999, 3, 1), 999 << 1);
        assert_eq!(prep_number(1000, 3, 1), (100 << 1) | 1);
        assert_eq!(prep_number(20_000, 3, 1), 0x7FF);
    }

    #[test]
    fn test_prep_number_3_2() {
        assert_eq!(prep_number(512, 3, 2), 512 << 2);
        assert_eq!(prep_number(5120, 3, 2), (512 << 2) | 1);
        assert_eq!(prep_number(51_200, 3, 2), (512 << 2) | 2);
        assert_eq!(prep_number(512_000, 3, 2), (512 << 2) | 3);
        assert_eq!(prep_number(2_000_000, 3, 2), 0xFFF);
        assert_eq!(prep_number(-512, 3, 2), (512 << 2) | (1 << 12));
    }

    #[test]
    fn test_prep_number_unsupported() {
        assert_eq!(prep_number(10, 4, 1), 0);
    }

    #[test]
    fn test_unprep_number_recovers_within_step() {
        for &(number, digits, power) in &[
            (57, 2, 1),
            (-57, 2, 1),
            (573, 2, 1),
            (5730, 2, 2),
            (-5730, 2, 2),
            (999, 3, 1),
            (4321, 3, 1),
            (43210, 3, 2),
            (-43210, 3, 2),
        ] {
            let decoded = unprep_number(prep_number(number, digits, power), digits, power);
            let step = if number.unsigned_abs() < 100 { 1 } else { number.unsigned_abs() / 50 };
            assert!(
                (decoded - number).unsigned_abs() <= step,
                "{} -> {} (digits {}, power {})",
                number,
                decoded,
                digits,
                power
            );
        }
    }

    #[test]
    fn test_prep_number_fits_lanes() {
        assert!(u32::from(prep_number(-126_999, 2, 2)) <= fields::GPS_ALT_MSL.limit);
        assert!(u32::from(prep_number(-1_023_999, 3, 2)) <= fields::HOME_ALT.limit);
        assert!(u32::from(prep_number(-1269, 2, 1)) <= fields::VEL_VERTICAL.limit);
        assert!(u32::from(prep_number(10_239, 3, 1)) <= fields::ATT_RANGE.limit);
    }

    #[test]
    fn test_prep_number_rounding_does_not_reach_sign_bit() {
        assert_eq!(prep_number(10_239, 3, 1), (1023 << 1) | 1);
        assert_eq!(prep_number(1_023_999, 3, 2), (1023 << 2) | 3);
        assert_eq!(prep_number(1_023_999, 3, 2) & (1 << 12), 0);
    }

    #[test]
    fn test_split_decimal() {
        assert_eq!(split_decimal(0.0, 2), (0, 0));
        assert_eq!(split_decimal(12.07, 2), (12, 7));
        assert_eq!(split_decimal(-0.25, 2), (0, -25));
        assert_eq!(split_decimal(-2.5, 2), (-2, -50));
        assert_eq!(split_decimal(3.5, 4), (3, 5000));
    }

    #[test]
    fn test_split_decimal_keeps_sign_below_one() {
        let below = split_decimal(-0.25, 2);
        let above = split_decimal(0.25, 2);
        assert_ne!(below, above);
        assert_eq!(below.1 as u16, 0xFFE7);
        assert_eq!(above.1 as u16, 25);
    }

    #[test]
    fn test_split_decimal_fraction_stays_in_range() {
        assert_eq!(split_decimal(0.99999, 2), (0, 99));
        assert_eq!(split_decimal(-0.99999, 2), (0, -99));
        assert_eq!(split_decimal(7.99999, 1), (7, 9));
    }

    #[test]
    fn test_unprep_number_rejects_unsupported_power() {
        assert_eq!(unprep_number(0x1FF, 2, 40), 0);
        assert_eq!(unprep_number(0x1FF, 3, 0), 0);
        assert_eq!(unprep_number(0x1FF, 4, 1), 0);
    }

    #[test]
    fn test_degrees_to_ddmm() {
        let ddmm = degrees_to_ddmm(47.5);
        assert!((ddmm - 4730.0).abs() < 1e-6);

        let ddmm = degrees_to_ddmm(-122.25);
        assert!((ddmm - 12215.0).abs() < 1e-6);
    }
}
