//! Units/dimension descriptor
//!
//! Packed into 32 bits, lowest bits first: 8 bits pad, then 4-bit
//! scaleCount, scaleTime, scaleSpace, and 4-bit signed dimCount, dimTime,
//! dimSpace. The descriptor is carried and rendered, never used for
//! arithmetic.

use std::fmt;

const SPACE_SCALES: [&str; 9] = [
    "byte", "Kbyte", "Mbyte", "Gbyte", "Tbyte", "Pbyte", "Ebyte", "Zbyte", "Ybyte",
];
const TIME_SCALES: [&str; 6] = ["nanosec", "microsec", "millisec", "sec", "min", "hour"];

/// Dimension exponents and scales of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Units {
    pub dim_space: i8,
    pub dim_time: i8,
    pub dim_count: i8,
    pub scale_space: u8,
    pub scale_time: u8,
    pub scale_count: i8,
}

impl Units {
    /// Dimensionless
    pub const NONE: Units = Units {
        dim_space: 0,
        dim_time: 0,
        dim_count: 0,
        scale_space: 0,
        scale_time: 0,
        scale_count: 0,
    };

    /// A plain count of events or things
    pub fn count() -> Self {
        Units {
            dim_count: 1,
            ..Units::NONE
        }
    }

    /// Time at the given scale (0 = nanoseconds .. 5 = hours)
    pub fn time(scale: u8) -> Self {
        Units {
            dim_time: 1,
            scale_time: scale,
            ..Units::NONE
        }
    }

    /// Space at the given scale (0 = bytes, 1 = Kbytes, ...)
    pub fn space(scale: u8) -> Self {
        Units {
            dim_space: 1,
            scale_space: scale,
            ..Units::NONE
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        let nibble = |shift: u32| ((raw >> shift) & 0xF) as u8;
        let signed = |shift: u32| (((raw >> shift) as u8) << 4) as i8 >> 4;
        Units {
            scale_count: signed(8),
            scale_time: nibble(12),
            scale_space: nibble(16),
            dim_count: signed(20),
            dim_time: signed(24),
            dim_space: signed(28),
        }
    }

    pub fn raw(&self) -> u32 {
        let pack = |v: i8, shift: u32| ((v as u8 as u32) & 0xF) << shift;
        pack(self.scale_count, 8)
            | pack(self.scale_time as i8, 12)
            | pack(self.scale_space as i8, 16)
            | pack(self.dim_count, 20)
            | pack(self.dim_time, 24)
            | pack(self.dim_space, 28)
    }
}

fn push_term(out: &mut Vec<String>, name: String, dim: i8) {
    let power = dim.unsigned_abs();
    if power == 1 {
        out.push(name);
    } else {
        out.push(format!("{}^{}", name, power));
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut num = Vec::new();
        let mut den = Vec::new();

        let terms = [
            (
                self.dim_space,
                SPACE_SCALES
                    .get(self.scale_space as usize)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("space-scale({})", self.scale_space)),
            ),
            (
                self.dim_time,
                TIME_SCALES
                    .get(self.scale_time as usize)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("time-scale({})", self.scale_time)),
            ),
            (
                self.dim_count,
                if self.scale_count == 0 {
                    "count".to_string()
                } else {
                    format!("count x 10^{}", self.scale_count)
                },
            ),
        ];

        for (dim, name) in terms {
            if dim > 0 {
                push_term(&mut num, name, dim);
            } else if dim < 0 {
                push_term(&mut den, name, dim);
            }
        }

        match (num.is_empty(), den.is_empty()) {
            (true, true) => Ok(()),
            (false, true) => write!(f, "{}", num.join(" ")),
            (true, false) => write!(f, "/ {}", den.join(" ")),
            (false, false) => write!(f, "{} / {}", num.join(" "), den.join(" ")),
        }
    }
}
