//! IPv4 ranges and the coarse IP-range ban table.
//!
//! Parsing never fails loudly: malformed input produces an invalid range
//! (both bounds zero) that matches nothing.

use std::fmt;

/// Dotted IPv4 → integer. `0.0.0.0` is reserved as "no address".
pub fn ip_num(ip: &str) -> Option<u32> {
    let octets: Vec<&str> = ip.trim().split('.').collect();
    if octets.len() != 4 {
        return None;
    }
    let mut n: u32 = 0;
    for octet in octets {
        if octet.is_empty() || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = octet.parse().ok()?;
        if value > 255 {
            return None;
        }
        n = (n << 8) | value;
    }
    (n != 0).then_some(n)
}

/// Closed interval `[start, end]` of IPv4 addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct IpRange {
    pub start: u32,
    pub end: u32,
}

impl IpRange {
    pub const INVALID: IpRange = IpRange { start: 0, end: 0 };

    /// Parses `"a.b.c.d"` or `"a.b.c.d-e.f.g.h"`.
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, '-')
    }

    pub fn parse_with(text: &str, separator: char) -> Self {
        let parts: Vec<&str> = text.trim().split(separator).collect();
        let (start, end) = match parts.as_slice() {
            [single] => (ip_num(single), ip_num(single)),
            [first, last] => (ip_num(first), ip_num(last)),
            _ => return Self::INVALID,
        };
        match (start, end) {
            (Some(start), Some(end)) => Self { start, end },
            _ => Self::INVALID,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start > 0 && self.end > 0
    }

    pub fn contains_num(&self, ip: u32) -> bool {
        ip != 0 && self.is_valid() && self.start <= ip && ip <= self.end
    }

    pub fn contains(&self, ip: &str) -> bool {
        ip_num(ip).is_some_and(|n| self.contains_num(n))
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dotted = |n: u32| {
            let [a, b, c, d] = n.to_be_bytes();
            format!("{a}.{b}.{c}.{d}")
        };
        if self.start == self.end {
            f.write_str(&dotted(self.start))
        } else {
            write!(f, "{}-{}", dotted(self.start), dotted(self.end))
        }
    }
}

/// One line of the IP ban file: `ip-or-range level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpBanInfo {
    pub range: IpRange,
    pub level: u8,
}

impl IpBanInfo {
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [range, level] = fields.as_slice() else {
            return None;
        };
        let range = IpRange::parse(range);
        let level = level.parse().ok()?;
        range.is_valid().then_some(Self { range, level })
    }
}

/// Identity-less range bans, evaluated before any per-board ban.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpBanTable {
    entries: Vec<IpBanInfo>,
}

impl IpBanTable {
    pub fn new(entries: Vec<IpBanInfo>) -> Self {
        Self { entries }
    }

    /// One record per line; blank and malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| {
                let parsed = IpBanInfo::parse(l);
                if parsed.is_none() {
                    tracing::warn!(line = l, "skipping malformed ip ban entry");
                }
                parsed
            })
            .collect();
        Self { entries }
    }

    /// Level of the first range containing `ip`; 0 when none does.
    pub fn level_for(&self, ip: &str) -> u8 {
        let Some(n) = ip_num(ip) else {
            return 0;
        };
        self.entries
            .iter()
            .find(|e| e.range.contains_num(n))
            .map_or(0, |e| e.level)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Comma separated ranges, e.g. the action-log skip list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpRangeList(Vec<IpRange>);

impl IpRangeList {
    pub fn parse<S: AsRef<str>>(items: &[S]) -> Self {
        Self(
            items
                .iter()
                .flat_map(|s| s.as_ref().split(','))
                .map(IpRange::parse)
                .filter(IpRange::is_valid)
                .collect(),
        )
    }

    pub fn contains(&self, ip: &str) -> bool {
        ip_num(ip).is_some_and(|n| self.0.iter().any(|r| r.contains_num(n)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
