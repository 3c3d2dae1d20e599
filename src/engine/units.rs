use std::borrow::Cow;

/// Converts a raw speed in bytes per second into the chosen unit.
pub type UnitConverter = fn(f64) -> f64;

/// The default unit: raw bytes per second, unchanged.
pub fn bytes_per_second(raw: f64) -> f64 {
    raw
}

/// Canonical unit names resolvable by [`lookup`].
///
/// Every name is also accepted with the `/s` suffix spelled as `ps`
/// ("MB/s" and "MBps" name the same unit).
pub const NAMES: [&str; 14] = [
    "B/s", "KB/s", "MB/s", "GB/s", "KiB/s", "MiB/s", "GiB/s", "b/s", "Kb/s", "Mb/s", "Gb/s",
    "Kib/s", "Mib/s", "Gib/s",
];

const KILO: f64 = 1_000.0;
const MEGA: f64 = 1_000_000.0;
const GIGA: f64 = 1_000_000_000.0;
const KIBI: f64 = 1_024.0;
const MEBI: f64 = 1_024.0 * 1_024.0;
const GIBI: f64 = 1_024.0 * 1_024.0 * 1_024.0;

/// Resolve a unit name to its converter.
///
/// Uppercase `B` denotes bytes, lowercase `b` bits (×8); the `i` infix
/// selects the 1024-based scale.
pub fn lookup(name: &str) -> Option<UnitConverter> {
    let canonical: Cow<str> = if !name.contains('/') && name.len() > 2 && name.ends_with("ps") {
        Cow::Owned(format!("{}/s", &name[..name.len() - 2]))
    } else {
        Cow::Borrowed(name)
    };

    let converter: UnitConverter = match canonical.as_ref() {
        "B/s" => bytes_per_second,
        "KB/s" => |raw| raw / KILO,
        "MB/s" => |raw| raw / MEGA,
        "GB/s" => |raw| raw / GIGA,
        "KiB/s" => |raw| raw / KIBI,
        "MiB/s" => |raw| raw / MEBI,
        "GiB/s" => |raw| raw / GIBI,
        "b/s" => |raw| raw * 8.0,
        "Kb/s" => |raw| raw * 8.0 / KILO,
        "Mb/s" => |raw| raw * 8.0 / MEGA,
        "Gb/s" => |raw| raw * 8.0 / GIGA,
        "Kib/s" => |raw| raw * 8.0 / KIBI,
        "Mib/s" => |raw| raw * 8.0 / MEBI,
        "Gib/s" => |raw| raw * 8.0 / GIBI,
        _ => return None,
    };
    Some(converter)
}
