//! Ordinal parsing for chapter markers.
//!
//! Accepts plain ASCII digits or native numerals such as `十二`, `一百零五`
//! and `两千`. Native numerals are read right to left: digits are scaled by the
//! current place value, `十`/`百`/`千` set the place value, and `万` scales
//! everything to its left by ten thousand.

fn numeral_value(c: char) -> Option<u32> {
    let value = match c {
        '零' | '〇' => 0,
        '一' => 1,
        '二' | '两' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        '十' => 10,
        '百' => 100,
        '千' => 1000,
        '万' => 10_000,
        _ => return None,
    };
    Some(value)
}

/// Parse a captured ordinal.
///
/// Returns `None` when the string contains anything that is not a numeral, so
/// callers can assign a sequential number instead. Parsed native numerals are
/// never less than 1.
pub fn parse_ordinal(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }

    let mut total: u32 = 0;
    let mut unit: u32 = 1;
    let mut section: u32 = 1;
    // A place value seen without a digit to its left yet, e.g. the `十` in `十二`.
    let mut pending = false;

    for c in s.chars().rev() {
        let value = numeral_value(c)?;
        match value {
            0..=9 => {
                if value > 0 {
                    total = total.checked_add(value.checked_mul(unit)?.checked_mul(section)?)?;
                } else if pending && unit > 1 {
                    total = total.checked_add(unit.checked_mul(section)?)?;
                }
                pending = false;
            }
            10_000 => {
                if pending && unit > 1 {
                    total = total.checked_add(unit.checked_mul(section)?)?;
                }
                section = section.checked_mul(10_000)?;
                unit = 1;
                pending = true;
            }
            _ => {
                if pending && unit > 1 {
                    total = total.checked_add(unit.checked_mul(section)?)?;
                }
                unit = value;
                pending = true;
            }
        }
    }

    if pending {
        total = total.checked_add(unit.checked_mul(section)?)?;
    }

    Some(total.max(1))
}
