// ── Snapshot normalization ──
//
// Turns the raw snapshot cache into one `DeviceRecord` per inverter.
// Pure: the same cache contents always produce the same mapping, and the
// cached snapshots are only read.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use unicode_general_category::{GeneralCategory, get_general_category};

use solarflow_api::models::{Inverter, Site};

use crate::model::{DeviceRecord, PowerFlowReading, PowerUnit, SiteSnapshot};

/// Account-wide settings that feed into every derived record.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// History logging for every device.
    pub eve_history: bool,
    /// Per-serial history overrides, keyed by upper-cased serial.
    pub eve_history_overrides: HashMap<String, bool>,
}

impl NormalizeOptions {
    fn eve_history_for(&self, serial: &str) -> bool {
        self.eve_history || self.eve_history_overrides.get(serial).copied() == Some(true)
    }
}

/// Derive every device record from the cached snapshots, keyed by serial.
///
/// When two sites report the same serial, the site iterated last wins.
pub fn normalize<'a>(
    snapshots: impl IntoIterator<Item = &'a SiteSnapshot>,
    options: &NormalizeOptions,
) -> BTreeMap<String, DeviceRecord> {
    let mut records = BTreeMap::new();

    for snapshot in snapshots {
        let unit = PowerUnit::from_raw(snapshot.power_flow.unit.as_deref());
        let power_flow = PowerFlowReading::from(&snapshot.power_flow);
        let peak_power = snapshot.site.peak_power.map(|p| p * unit.multiplier());
        let installation_date = snapshot
            .site
            .installation_date
            .as_deref()
            .and_then(|d| d.parse::<NaiveDate>().ok());

        for inverter in &snapshot.inventory.inverters {
            let serial = inverter.serial.to_uppercase();
            let record = DeviceRecord {
                software_version: software_version(inverter),
                model: inverter.model.clone().unwrap_or_default(),
                manufacturer: inverter.manufacturer.clone().unwrap_or_default(),
                site_id: snapshot.site_id,
                installation_date,
                description: description(inverter, &snapshot.site, &serial),
                peak_power,
                power_flow: power_flow.clone(),
                // No liveness probe exists; a cached site counts as online.
                online: true,
                excluded: false,
                eve_history: options.eve_history_for(&serial),
                serial,
            };
            records.insert(record.serial.clone(), record);
        }
    }

    records
}

/// `"4-15-123456"` → `"4.15.123456"`.
fn software_version(inverter: &Inverter) -> String {
    inverter
        .cpu_version
        .as_deref()
        .unwrap_or_default()
        .replace('-', ".")
}

/// Inverter name qualified by the site's city, sanitized. Falls back to the
/// serial when nothing printable is left.
fn description(inverter: &Inverter, site: &Site, serial: &str) -> String {
    let name = inverter.name.trim();
    let city = site.city().trim();

    let raw = match (name.is_empty(), city.is_empty()) {
        (false, false) => format!("{name} - {city}"),
        (false, true) => name.to_owned(),
        (true, false) => city.to_owned(),
        (true, true) => String::new(),
    };

    let sanitized = sanitize(&raw);
    if sanitized.is_empty() {
        serial.to_owned()
    } else {
        sanitized
    }
}

fn is_kept(c: char) -> bool {
    is_letter_or_number(c) || is_separator(c) || matches!(c, '’' | '.' | ',')
}

/// General category `L*` or `N*`. Combining marks are not letters here,
/// even when `char::is_alphabetic` would accept them.
fn is_letter_or_number(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::DecimalNumber
            | GeneralCategory::LetterNumber
            | GeneralCategory::OtherNumber
    )
}

/// General category `Z*`: space, line and paragraph separators.
fn is_separator(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

/// Reduce a name to what the host framework accepts as a display name.
///
/// Drops every character that is not a letter, number, separator, `’`,
/// `.` or `,`, then trims anything that is not a letter or number from
/// both ends.
pub fn sanitize(raw: &str) -> String {
    let kept: String = raw.chars().filter(|c| is_kept(*c)).collect();
    kept.trim_matches(|c: char| !is_letter_or_number(c)).to_owned()
}
