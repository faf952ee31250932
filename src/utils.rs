use statrs::statistics::Statistics;

/// a macro to log user-facing progress lines, keeping ANSI colors only when asked to
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)*) => {
        if $colorful {
            log::info!($($arg)*);
        } else {
            log::info!("{}", $crate::utils::strip_ansi(&format!($($arg)*)));
        }
    };
}

/// Removes ANSI escape sequences (e.g. `\x1b[1;93m`) from a string
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // skip parameters up to the final byte of the sequence
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Round to a fixed number of decimals, as reported in responses
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Population variance (ddof = 0) of every column of a row-major matrix.
/// An empty matrix yields NaN for each column.
pub fn column_variances(rows: &[Vec<f64>], n_columns: usize) -> Vec<f64> {
    (0..n_columns)
        .map(|j| rows.iter().map(|row| row[j]).population_variance())
        .collect()
}

/// Share `total` between groups proportionally to `counts`, flooring first and
/// then handing the remainder to the largest fractional parts (earlier group wins ties).
/// No group receives more than its own count.
pub fn allocate_by_largest_remainder(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return vec![0; counts.len()];
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * total as f64 / n as f64)
        .collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = total.saturating_sub(allocation.iter().sum());
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });

    while remaining > 0 {
        let mut progressed = false;
        for &i in &order {
            if remaining == 0 {
                break;
            }
            if allocation[i] < counts[i] {
                allocation[i] += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    allocation
}
