use serde::{Deserialize, Serialize};

/// Display rules of the token that pays for credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUnits {
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenUnits {
    fn default() -> Self {
        Self {
            symbol: "ICP".to_string(),
            decimals: 8,
        }
    }
}

impl TokenUnits {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }

    fn power(&self) -> u128 {
        10u128.saturating_pow(self.decimals as u32)
    }

    /// Raw amount as `int.frac` with the fraction padded to `decimals` digits.
    pub fn format(&self, amount: u128) -> String {
        if self.decimals == 0 {
            return amount.to_string();
        }
        let power = self.power();
        format!("{}.{:0width$}", amount / power, amount % power, width = self.decimals as usize)
    }

    /// Like [`TokenUnits::format`] without trailing zeros in the fraction.
    pub fn format_trimmed(&self, amount: u128) -> String {
        let text = self.format(amount);
        if !text.contains('.') {
            return text;
        }
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }

    /// Formatted amount followed by the symbol.
    pub fn display(&self, amount: u128) -> String {
        format!("{} {}", self.format(amount), self.symbol)
    }

    /// Parses a decimal string into raw units. Extra fraction digits are
    /// truncated, non-digits in the fraction ignored.
    pub fn parse(&self, text: &str) -> Option<u128> {
        let (int_part, frac_part) = text.trim().split_once('.').unwrap_or((text.trim(), ""));
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        let int_value: u128 = int_part.parse().ok()?;

        let mut frac: String = frac_part.chars().filter(char::is_ascii_digit).collect();
        let decimals = self.decimals as usize;
        frac.truncate(decimals);
        while frac.len() < decimals {
            frac.push('0');
        }
        let frac_value: u128 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
        int_value.checked_mul(self.power())?.checked_add(frac_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pads_fraction() {
        let units = TokenUnits::new("ICP", 8);
        assert_eq!(units.format(150_000_000), "1.50000000");
        assert_eq!(units.format(10_000), "0.00010000");
        assert_eq!(units.display(10_000), "0.00010000 ICP");
    }

    #[test]
    fn format_trimmed_drops_zeros() {
        let units = TokenUnits::new("ICP", 8);
        assert_eq!(units.format_trimmed(150_000_000), "1.5");
        assert_eq!(units.format_trimmed(200_000_000), "2");
        assert_eq!(TokenUnits::new("PX", 0).format_trimmed(100), "100");
    }

    #[test]
    fn parse_truncates_and_pads() {
        let units = TokenUnits::new("ICP", 8);
        assert_eq!(units.parse("1.5"), Some(150_000_000));
        assert_eq!(units.parse(".25"), Some(25_000_000));
        assert_eq!(units.parse("0.123456789"), Some(12_345_678));
        assert_eq!(units.parse("3"), Some(300_000_000));
        assert_eq!(units.parse("abc"), None);
    }
}
