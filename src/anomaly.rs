use serde::Serialize;

use crate::message_types::MessageType;
use crate::record_store::RecordStore;

/// Attitude jump between adjacent samples that flags loss of control, degrees.
pub const ATTITUDE_DELTA_LIMIT_DEG: f64 = 45.0;
/// Minimum usable GPS fix (3 = 3D fix).
pub const GPS_MIN_FIX_TYPE: f64 = 3.0;
/// Low-voltage floor for a 3-cell LiPo pack. Not adaptive to other packs.
pub const BATTERY_LOW_VOLTS: f64 = 10.5;
/// RC link RSSI floor, percent.
pub const RC_RSSI_FLOOR: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    SuddenAttitudeChange,
    GpsSignalLoss,
    LowBattery,
    RcSignalWeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One anomaly-rule trigger. Produced transiently, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFinding {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub timestamp: f64,
    pub severity: Severity,
    pub description: String,
}

/// Run the fixed rule battery over a flight's record store.
///
/// Deterministic and side-effect free. Rules are independent; their findings
/// are concatenated in rule order, each rule's findings in record order.
/// Every rule starts scanning at index 1, and a missing field reads as 0.
pub fn detect_anomalies(store: &RecordStore) -> Vec<AnomalyFinding> {
    let mut findings = Vec::new();

    let att = store.records(MessageType::Att);
    for i in 1..att.len() {
        let roll_diff = (att[i].num_or("roll", 0.0) - att[i - 1].num_or("roll", 0.0)).abs();
        let pitch_diff = (att[i].num_or("pitch", 0.0) - att[i - 1].num_or("pitch", 0.0)).abs();

        if roll_diff > ATTITUDE_DELTA_LIMIT_DEG || pitch_diff > ATTITUDE_DELTA_LIMIT_DEG {
            findings.push(AnomalyFinding {
                kind: AnomalyKind::SuddenAttitudeChange,
                timestamp: att[i].timestamp,
                severity: Severity::High,
                description: format!(
                    "Sudden attitude change detected: roll={:.1}°, pitch={:.1}°",
                    roll_diff, pitch_diff
                ),
            });
        }
    }

    let gps = store.records(MessageType::Gps);
    for record in gps.iter().skip(1) {
        let fix_type = record.num_or("fix_type", 0.0);
        if fix_type < GPS_MIN_FIX_TYPE {
            findings.push(AnomalyFinding {
                kind: AnomalyKind::GpsSignalLoss,
                timestamp: record.timestamp,
                severity: Severity::Medium,
                description: format!("GPS signal degraded or lost (fix_type={})", fix_type),
            });
        }
    }

    let bat = store.records(MessageType::Bat);
    for record in bat.iter().skip(1) {
        let volt = record.num_or("volt", 0.0);
        if volt < BATTERY_LOW_VOLTS {
            findings.push(AnomalyFinding {
                kind: AnomalyKind::LowBattery,
                timestamp: record.timestamp,
                severity: Severity::High,
                description: format!("Low battery voltage: {:.1}V", volt),
            });
        }
    }

    let rcin = store.records(MessageType::Rcin);
    for record in rcin.iter().skip(1) {
        let rssi = record.num_or("rssi", 0.0);
        if rssi < RC_RSSI_FLOOR {
            findings.push(AnomalyFinding {
                kind: AnomalyKind::RcSignalWeak,
                timestamp: record.timestamp,
                severity: Severity::Medium,
                description: format!("Weak RC signal: {}%", rssi),
            });
        }
    }

    findings
}
