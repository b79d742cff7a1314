//! Field arithmetic for the IP editor.
//!
//! The editor works on a fixed-width buffer (`010.000.000.001` for v4,
//! zero-padded 4-nibble groups for v6) so every digit has a stable cursor
//! position. Committing validates field ranges and re-emits the normalized
//! form with leading zeros stripped.

/// Per-family shape of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Family {
    pub fields: usize,
    pub width: usize,
    pub sep: char,
    pub radix: u32,
    pub max: u32,
}

pub const V4: Family = Family {
    fields: 4,
    width: 3,
    sep: '.',
    radix: 10,
    max: 255,
};

pub const V6: Family = Family {
    fields: 8,
    width: 4,
    sep: ':',
    radix: 16,
    max: 0xFFFF,
};

pub fn family(v6: bool) -> Family {
    if v6 { V6 } else { V4 }
}

pub fn dummy(v6: bool) -> &'static str {
    if v6 { "0:0:0:0:0:0:0:0" } else { "0.0.0.0" }
}

fn parse_fields(value: &str, fam: Family) -> Option<Vec<u32>> {
    let parts: Vec<&str> = value.split(fam.sep).collect();
    if parts.len() != fam.fields {
        return None;
    }
    let mut fields = Vec::with_capacity(fam.fields);
    for part in parts {
        if part.is_empty() || part.len() > fam.width {
            return None;
        }
        let n = u32::from_str_radix(part, fam.radix).ok()?;
        if n > fam.max {
            return None;
        }
        fields.push(n);
    }
    Some(fields)
}

/// Expand to the fixed-width edit form, or `None` when the value is not a
/// well-formed address of the family.
pub fn pad(value: &str, v6: bool) -> Option<String> {
    let fam = family(v6);
    let fields = parse_fields(value, fam)?;
    let parts: Vec<String> = fields
        .iter()
        .map(|n| {
            if v6 {
                format!("{n:0width$x}", width = fam.width)
            } else {
                format!("{n:0width$}", width = fam.width)
            }
        })
        .collect();
    Some(parts.join(&fam.sep.to_string()))
}

/// Strip leading zeros field-by-field, or `None` when a field is out of
/// range or malformed (the editor's commit-time verifier).
pub fn normalize(value: &str, v6: bool) -> Option<String> {
    let fam = family(v6);
    let fields = parse_fields(value, fam)?;
    let parts: Vec<String> = fields
        .iter()
        .map(|n| if v6 { format!("{n:x}") } else { n.to_string() })
        .collect();
    Some(parts.join(&fam.sep.to_string()))
}

pub fn is_digit(c: char, fam: Family) -> bool {
    c.is_digit(fam.radix)
}

/// Cycle a digit up or down within the family's radix, without carry.
pub fn cycle_digit(c: char, fam: Family, up: bool) -> char {
    let v = c.to_digit(fam.radix).unwrap_or(0);
    let next = if up {
        (v + 1) % fam.radix
    } else {
        (v + fam.radix - 1) % fam.radix
    };
    std::char::from_digit(next, fam.radix).unwrap_or('0')
}

/// Next cursor position holding a digit, scanning from `pos + dir` and
/// skipping separators; `None` at the buffer edge.
pub fn step_cursor(buf: &str, pos: usize, forward: bool) -> Option<usize> {
    let chars: Vec<char> = buf.chars().collect();
    let fam_sep = |c: char| c == '.' || c == ':';
    let mut p = pos;
    loop {
        if forward {
            p += 1;
            if p >= chars.len() {
                return None;
            }
        } else {
            if p == 0 {
                return None;
            }
            p -= 1;
        }
        if !fam_sep(chars[p]) {
            return Some(p);
        }
    }
}
