//! Helpers for the ASCII header fields of EDF and BDF files.

use crate::error::{Result, SigError};

/// 检查字符串是否为有效的整数
pub fn is_integer_number(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// 检查字符串是否为有效的数字（包括浮点数）
pub fn is_number(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.parse::<f64>().is_ok()
}

/// 解析EDF时间字符串为100纳秒单位
pub fn parse_edf_time(s: &str) -> Result<i64> {
    let s = s.trim();

    if s.is_empty() {
        return Err(SigError::format("empty time string"));
    }

    // 处理符号
    let (negative, s) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    let mut value = 0i64;

    if let Some(dot_pos) = s.find('.') {
        let integer_part = &s[..dot_pos];
        let decimal_part = &s[dot_pos + 1..];

        if !integer_part.is_empty() {
            value += integer_part
                .parse::<i64>()
                .map_err(|_| SigError::format(format!("invalid time {:?}", s)))?
                * crate::TIME_DIMENSION;
        }

        // 解析小数部分（最多7位精度）
        if !decimal_part.is_empty() {
            let decimal_str = if decimal_part.len() > 7 {
                &decimal_part[..7]
            } else {
                decimal_part
            };

            let decimal_value = decimal_str
                .parse::<i64>()
                .map_err(|_| SigError::format(format!("invalid time {:?}", s)))?;

            let scale = 10i64.pow(7 - decimal_str.len() as u32);
            value += decimal_value * scale;
        }
    } else {
        value = s
            .parse::<i64>()
            .map_err(|_| SigError::format(format!("invalid time {:?}", s)))?
            * crate::TIME_DIMENSION;
    }

    if negative {
        value = -value;
    }

    Ok(value)
}

/// Parses a space-padded integer header field.
pub fn parse_int_field(field: &str, name: &str) -> Result<i64> {
    if !is_integer_number(field) {
        return Err(SigError::format(format!("{} is not an integer: {:?}", name, field)));
    }
    field
        .trim()
        .trim_start_matches('+')
        .parse()
        .map_err(|_| SigError::format(format!("{} is out of range: {:?}", name, field)))
}

/// Parses a space-padded decimal header field.
pub fn parse_number_field(field: &str, name: &str) -> Result<f64> {
    if !is_number(field) {
        return Err(SigError::format(format!("{} is not a number: {:?}", name, field)));
    }
    field
        .trim()
        .parse()
        .map_err(|_| SigError::format(format!("{} is not a number: {:?}", name, field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_integer_number() {
        assert!(is_integer_number("123"));
        assert!(is_integer_number("-456"));
        assert!(is_integer_number("+789"));
        assert!(is_integer_number("0"));
        assert!(is_integer_number("  42    "));
        assert!(!is_integer_number("12.34"));
        assert!(!is_integer_number("abc"));
        assert!(!is_integer_number(""));
        assert!(!is_integer_number("-"));
    }

    #[test]
    fn test_parse_edf_time() {
        assert_eq!(parse_edf_time("1").unwrap(), 10_000_000);
        assert_eq!(parse_edf_time("1.5").unwrap(), 15_000_000);
        assert_eq!(parse_edf_time("-2.5").unwrap(), -25_000_000);
        assert_eq!(parse_edf_time("+0.0000001").unwrap(), 1);
        assert!(parse_edf_time("").is_err());
        assert!(parse_edf_time("x").is_err());
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(parse_int_field("-32768  ", "digital minimum").unwrap(), -32768);
        assert_eq!(parse_int_field("+5", "records").unwrap(), 5);
        assert!(parse_int_field("1.5", "records").is_err());
        assert_eq!(parse_number_field("-200.5  ", "physical minimum").unwrap(), -200.5);
        assert!(parse_number_field("    ", "physical minimum").is_err());
    }
}
