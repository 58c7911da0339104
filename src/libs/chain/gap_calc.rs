use crate::libs::error::{ChainError, Result};
use std::io::{BufRead, Write};

const POSITIONS: [i64; 11] = [1, 2, 3, 11, 111, 2111, 12111, 32111, 72111, 152111, 252111];

/// One gap category (query-only, target-only or both).
///
/// Lengths below `small.len()` come from a dense table; longer ones are interpolated
/// between control points, and extrapolated with the last slope past the final one.
#[derive(Clone, Debug)]
struct GapTrack {
    small: Vec<i32>,
    long_pos: Vec<i64>,
    long_val: Vec<f64>,
    last_slope: f64,
}

impl GapTrack {
    fn new(small_size: usize, start_long: usize, pos: &[i64], vals: &[f64]) -> Self {
        let mut small = vec![0; small_size];
        for (i, cost) in small.iter_mut().enumerate().skip(1) {
            *cost = interpolate(i as i64, pos, vals) as i32;
        }

        let long_pos = pos[start_long..].to_vec();
        let long_val = vals[start_long..].to_vec();

        let n = pos.len();
        let last_slope = (vals[n - 1] - vals[n - 2]) / (pos[n - 1] - pos[n - 2]) as f64;

        GapTrack {
            small,
            long_pos,
            long_val,
            last_slope,
        }
    }

    fn cost(&self, len: i64) -> i32 {
        if (len as usize) < self.small.len() {
            return self.small[len as usize];
        }

        let n = self.long_pos.len();
        let last_pos = self.long_pos[n - 1];
        if len >= last_pos {
            (self.long_val[n - 1] + self.last_slope * (len - last_pos) as f64) as i32
        } else {
            interpolate(len, &self.long_pos, &self.long_val) as i32
        }
    }
}

fn interpolate(x: i64, s: &[i64], v: &[f64]) -> f64 {
    for i in 0..s.len() {
        if x == s[i] {
            return v[i];
        } else if x < s[i] {
            if i == 0 {
                return v[0];
            }
            let ds = s[i] - s[i - 1];
            let dv = v[i] - v[i - 1];
            return v[i - 1] + dv * (x - s[i - 1]) as f64 / ds as f64;
        }
    }
    let n = s.len();
    let ds = s[n - 1] - s[n - 2];
    let dv = v[n - 1] - v[n - 2];
    v[n - 2] + dv * (x - s[n - 2]) as f64 / ds as f64
}

/// A gap cost calculator using linear interpolation for efficient scoring.
///
/// It uses pre-calculated tables for small gap sizes and interpolation for larger ones.
/// Separate costs are maintained for query gaps, target gaps, and simultaneous gaps (both).
/// Immutable after construction, so one instance can be shared by every worker.
#[derive(Clone, Debug)]
pub struct GapCalc {
    small_size: usize,
    position: Vec<i64>,
    q_gap: Vec<f64>,
    t_gap: Vec<f64>,
    b_gap: Vec<f64>,
    q: GapTrack,
    t: GapTrack,
    b: GapTrack,
}

impl GapCalc {
    /// Creates a standard "medium" gap calculator (suitable for mouse/human).
    pub fn medium() -> Self {
        let q_gap = vec![
            325.0, 360.0, 400.0, 450.0, 600.0, 1100.0, 3600.0, 7600.0, 15600.0, 31600.0, 56600.0,
        ];
        let b_gap = vec![
            625.0, 660.0, 700.0, 750.0, 900.0, 1400.0, 4000.0, 8000.0, 16000.0, 32000.0, 57000.0,
        ];

        Self::preset(q_gap, b_gap)
    }

    /// Creates a "loose" gap calculator (suitable for distant species like chicken/human).
    pub fn loose() -> Self {
        let q_gap = vec![
            350.0, 425.0, 450.0, 600.0, 900.0, 2900.0, 22900.0, 57900.0, 117900.0, 217900.0,
            317900.0,
        ];
        let b_gap = vec![
            750.0, 825.0, 850.0, 1000.0, 1300.0, 3300.0, 23300.0, 58300.0, 118300.0, 218300.0,
            318300.0,
        ];

        Self::preset(q_gap, b_gap)
    }

    /// Low costs used for the coarse chaining pass, so that seeds separated by
    /// long unaligned stretches still end up in one chain.
    pub fn cheap() -> Self {
        let q_gap = vec![
            5.0, 10.0, 15.0, 20.0, 25.0, 35.0, 60.0, 100.0, 180.0, 340.0, 540.0,
        ];
        let b_gap = vec![
            10.0, 20.0, 30.0, 40.0, 50.0, 70.0, 120.0, 200.0, 360.0, 680.0, 1080.0,
        ];

        Self::preset(q_gap, b_gap)
    }

    fn preset(q_gap: Vec<f64>, b_gap: Vec<f64>) -> Self {
        let t_gap = q_gap.clone();
        // Built-in tables are well formed
        Self::new(111, POSITIONS.to_vec(), q_gap, t_gap, b_gap)
            .unwrap_or_else(|e| unreachable!("{}", e))
    }

    /// Load from name (preset) or file.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "medium" => Ok(Self::medium()),
            "loose" => Ok(Self::loose()),
            "cheap" => Ok(Self::cheap()),
            _ => Self::from_reader(crate::libs::io::reader(name)?),
        }
    }

    /// Creates a new `GapCalc` with custom cost tables.
    ///
    /// # Arguments
    ///
    /// * `small_size` - Gaps shorter than this are looked up in dense tables.
    ///   It must appear in `position`; the long-gap control points start there.
    /// * `position` - Strictly increasing gap sizes for which costs are defined.
    /// * `q_gap` - Costs for gaps in query sequence.
    /// * `t_gap` - Costs for gaps in target sequence.
    /// * `b_gap` - Costs for gaps in both sequences (simultaneous).
    pub fn new(
        small_size: usize,
        position: Vec<i64>,
        q_gap: Vec<f64>,
        t_gap: Vec<f64>,
        b_gap: Vec<f64>,
    ) -> Result<Self> {
        let invalid = |message: String| ChainError::InvalidGapTable { message };

        let n = position.len();
        if n < 2 {
            return Err(invalid(format!("need at least 2 positions, got {}", n)));
        }
        for (name, row) in [("qGap", &q_gap), ("tGap", &t_gap), ("bothGap", &b_gap)] {
            if row.len() != n {
                return Err(invalid(format!(
                    "{} has {} values but position has {}",
                    name,
                    row.len(),
                    n
                )));
            }
            if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(invalid(format!("{} has a negative or non-finite cost", name)));
            }
        }
        if position.windows(2).any(|w| w[0] >= w[1]) || position[0] < 1 {
            return Err(invalid("position must be positive and strictly increasing".into()));
        }
        let start_long = position
            .iter()
            .position(|&x| x == small_size as i64)
            .ok_or_else(|| invalid(format!("no position {} for smallSize", small_size)))?;
        if start_long + 1 >= n {
            return Err(invalid(format!(
                "smallSize {} must not be the last position",
                small_size
            )));
        }

        let q = GapTrack::new(small_size, start_long, &position, &q_gap);
        let t = GapTrack::new(small_size, start_long, &position, &t_gap);
        let b = GapTrack::new(small_size, start_long, &position, &b_gap);

        Ok(GapCalc {
            small_size,
            position,
            q_gap,
            t_gap,
            b_gap,
            q,
            t,
            b,
        })
    }

    /// Parses the UCSC linear gap format:
    ///
    /// ```text
    /// tableSize 11
    /// smallSize 111
    /// position 1 2 3 11 111 2111 12111 32111 72111 152111 252111
    /// qGap 325 360 400 450 600 1100 3600 7600 15600 31600 56600
    /// tGap 325 360 400 450 600 1100 3600 7600 15600 31600 56600
    /// bothGap 625 660 700 750 900 1400 4000 8000 16000 32000 57000
    /// ```
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let invalid = |message: String| ChainError::InvalidGapTable { message };

        let mut table_size: Option<usize> = None;
        let mut small_size: Option<usize> = None;
        let mut position: Option<Vec<i64>> = None;
        let mut q_gap: Option<Vec<f64>> = None;
        let mut t_gap: Option<Vec<f64>> = None;
        let mut b_gap: Option<Vec<f64>> = None;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let key = fields.next().unwrap_or_default();
            let values: Vec<&str> = fields.collect();

            let floats = || -> Result<Vec<f64>> {
                values
                    .iter()
                    .map(|v| {
                        v.parse::<f64>()
                            .map_err(|_| invalid(format!("bad number '{}' in {}", v, key)))
                    })
                    .collect()
            };
            let single = || -> Result<usize> {
                match values.as_slice() {
                    [v] => v
                        .parse::<usize>()
                        .map_err(|_| invalid(format!("bad number '{}' in {}", v, key))),
                    _ => Err(invalid(format!("{} takes exactly one value", key))),
                }
            };

            match key.to_lowercase().as_str() {
                "tablesize" => table_size = Some(single()?),
                "smallsize" => small_size = Some(single()?),
                "position" => {
                    let pos = values
                        .iter()
                        .map(|v| {
                            v.parse::<i64>()
                                .map_err(|_| invalid(format!("bad position '{}'", v)))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    position = Some(pos);
                }
                "qgap" => q_gap = Some(floats()?),
                "tgap" => t_gap = Some(floats()?),
                "bothgap" => b_gap = Some(floats()?),
                _ => return Err(invalid(format!("unknown row '{}'", key))),
            }
        }

        let missing = |row: &str| invalid(format!("missing {} row", row));
        let small_size = small_size.ok_or_else(|| missing("smallSize"))?;
        let position = position.ok_or_else(|| missing("position"))?;
        let q_gap = q_gap.ok_or_else(|| missing("qGap"))?;
        let t_gap = t_gap.ok_or_else(|| missing("tGap"))?;
        let b_gap = b_gap.ok_or_else(|| missing("bothGap"))?;

        if let Some(size) = table_size {
            if size != position.len() {
                return Err(invalid(format!(
                    "tableSize {} but position has {} values",
                    size,
                    position.len()
                )));
            }
        }

        Self::new(small_size, position, q_gap, t_gap, b_gap)
    }

    /// Writes the table in the format accepted by [`GapCalc::from_reader`].
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let join = |row: &[f64]| {
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        };
        writeln!(writer, "tableSize\t{}", self.position.len())?;
        writeln!(writer, "smallSize\t{}", self.small_size)?;
        writeln!(
            writer,
            "position\t{}",
            self.position
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        )?;
        writeln!(writer, "qGap\t{}", join(&self.q_gap))?;
        writeln!(writer, "tGap\t{}", join(&self.t_gap))?;
        writeln!(writer, "bothGap\t{}", join(&self.b_gap))?;
        Ok(())
    }

    /// Calculates the gap cost for a given distance in query (`dq`) and target (`dt`).
    ///
    /// Negative distances count as zero; overlaps must be resolved by the caller.
    /// A double-sided gap is priced on the "both" track by `dq + dt`.
    pub fn calc(&self, dq: i64, dt: i64) -> i32 {
        let dq = dq.max(0);
        let dt = dt.max(0);

        if dt == 0 {
            self.q.cost(dq)
        } else if dq == 0 {
            self.t.cost(dt)
        } else {
            self.b.cost(dq + dt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gap_calc_medium() {
        let calc = GapCalc::medium();

        // Test small values (should be in small table)
        // pos: 1 -> 325.0
        assert_eq!(calc.calc(1, 0), 325);
        assert_eq!(calc.calc(0, 1), 325);
        assert_eq!(calc.calc(0, 0), 0);

        // 3 -> 400, 11 -> 450
        assert_eq!(calc.calc(0, 10), 443);
        // Negative lengths clamp before lookup
        assert_eq!(calc.calc(-5, 10), 443);
        assert_eq!(calc.calc(-5, 0), 0);
    }

    #[test]
    fn test_gap_calc_long() {
        let calc = GapCalc::medium();

        // 111 -> 600, 2111 -> 1100
        assert_eq!(calc.calc(111, 0), 600);
        assert_eq!(calc.calc(200, 0), 622);
        assert_eq!(calc.calc(2111, 0), 1100);

        // Past the last control point: slope (56600 - 31600) / 100000
        assert_eq!(calc.calc(252111, 0), 56600);
        assert_eq!(calc.calc(352111, 0), 81600);
    }

    #[test]
    fn test_gap_calc_both() {
        let calc = GapCalc::medium();

        // 50 + 50 on the both track: 11 -> 750, 111 -> 900
        assert_eq!(calc.calc(50, 50), 883);
        assert!(calc.calc(50, 50) > calc.calc(50, 0));
        assert_eq!(calc.calc(1, 1), 660);
    }

    #[test]
    fn test_gap_calc_presets_differ() {
        let medium = GapCalc::medium();
        let loose = GapCalc::loose();
        let cheap = GapCalc::cheap();

        assert!(loose.calc(5000, 0) > medium.calc(5000, 0));
        assert!(cheap.calc(5000, 0) < medium.calc(5000, 0));
        assert_eq!(GapCalc::from_name("Loose").unwrap().calc(1, 0), 350);
    }

    #[test]
    fn test_gap_calc_parse() {
        let text = "\
tablesize\t11
smallSize\t111
position\t1\t2\t3\t11\t111\t2111\t12111\t32111\t72111\t152111\t252111
qGap\t325\t360\t400\t450\t600\t1100\t3600\t7600\t15600\t31600\t56600
tGap\t325\t360\t400\t450\t600\t1100\t3600\t7600\t15600\t31600\t56600
bothGap\t625\t660\t700\t750\t900\t1400\t4000\t8000\t16000\t32000\t57000
";
        let calc = GapCalc::from_reader(text.as_bytes()).unwrap();
        let medium = GapCalc::medium();
        for len in [0, 1, 7, 110, 111, 500, 40000, 300000] {
            assert_eq!(calc.calc(len, 0), medium.calc(len, 0));
            assert_eq!(calc.calc(len, len), medium.calc(len, len));
        }

        let mut out = Vec::new();
        calc.write(&mut out).unwrap();
        let reread = GapCalc::from_reader(out.as_slice()).unwrap();
        assert_eq!(reread.calc(12345, 0), medium.calc(12345, 0));
    }

    #[test]
    fn test_gap_calc_config_errors() {
        let no_small = "position 1 111 200\nqGap 1 2 3\ntGap 1 2 3\nbothGap 1 2 3\n";
        let err = GapCalc::from_reader(no_small.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("smallSize"));

        let ragged = "smallSize 111\nposition 1 111 200\nqGap 1 2\ntGap 1 2 3\nbothGap 1 2 3\n";
        let err = GapCalc::from_reader(ragged.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("qGap"));

        let no_both = "smallSize 111\nposition 1 111 200\nqGap 1 2 3\ntGap 1 2 3\n";
        let err = GapCalc::from_reader(no_both.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("bothGap"));

        let not_listed = "smallSize 50\nposition 1 111 200\nqGap 1 2 3\ntGap 1 2 3\nbothGap 1 2 3\n";
        assert!(matches!(
            GapCalc::from_reader(not_listed.as_bytes()),
            Err(ChainError::InvalidGapTable { .. })
        ));

        assert!(GapCalc::new(1, vec![1], vec![1.0], vec![1.0], vec![1.0]).is_err());
    }

    proptest! {
        #[test]
        fn test_gap_cost_monotonic(a in 0i64..400_000, b in 0i64..400_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for calc in [GapCalc::medium(), GapCalc::loose(), GapCalc::cheap()] {
                prop_assert!(calc.calc(lo, 0) <= calc.calc(hi, 0));
                prop_assert!(calc.calc(0, lo) <= calc.calc(0, hi));
                prop_assert!(calc.calc(lo, 0) >= 0);
            }
        }
    }
}
