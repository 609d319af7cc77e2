use askama::Result;
use std::borrow::Borrow;

// Renders a quantity as `1,234.50`. Usable as `|qty` on fields and method results alike.
#[allow(clippy::unnecessary_wraps)]
pub fn qty<T: Borrow<f64>>(value: T) -> Result<String> {
    Ok(format_amount(*value.borrow()))
}

pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some(parts) => parts,
        None => (fixed.as_str(), "00"),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && fixed != "0.00";
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(-1234567.891), "-1,234,567.89");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn qty_takes_values_and_references() {
        let stored = 1500.0;
        assert_eq!(qty(&stored).unwrap(), "1,500.00");
        assert_eq!(qty(stored - 2000.0).unwrap(), "-500.00");
    }
}
