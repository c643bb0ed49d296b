use crate::message_types::MessageType;
use crate::record_store::RecordStore;

/// Build the short flight digest embedded in the chat system prompt.
///
/// Section order is fixed: duration + GPS point count, altitude range,
/// battery voltage range, event count. A section with no qualifying data is
/// omitted entirely rather than rendered as zero.
pub fn summarize(store: &RecordStore) -> String {
    let mut context = Vec::new();

    let gps = store.records(MessageType::Gps);
    if let (Some(first), Some(last)) = (gps.first(), gps.last()) {
        context.push(format!(
            "Flight duration: {:.1} seconds",
            last.timestamp - first.timestamp
        ));
        context.push(format!("GPS points: {}", gps.len()));
    }

    if let Some((min, max)) = field_range(store, MessageType::Att, "alt") {
        context.push(format!("Altitude range: {:.1}m to {:.1}m", min, max));
    }

    if let Some((min, max)) = field_range(store, MessageType::Bat, "volt") {
        context.push(format!("Battery voltage range: {:.1}V to {:.1}V", min, max));
    }

    let events = store.count(MessageType::Ev);
    if events > 0 {
        context.push(format!("Number of events: {}", events));
    }

    context.join("\n")
}

/// Min/max over the records that actually carry the field. `None` when no
/// record does.
fn field_range(store: &RecordStore, msg_type: MessageType, field: &str) -> Option<(f64, f64)> {
    store
        .records(msg_type)
        .iter()
        .filter_map(|r| r.num(field))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::Record;

    #[test]
    fn test_empty_store_has_empty_digest() {
        assert_eq!(summarize(&RecordStore::new()), "");
    }

    #[test]
    fn test_full_digest_order() {
        let mut store = RecordStore::new();
        store.push(MessageType::Gps, Record::new(10.0));
        store.push(MessageType::Gps, Record::new(133.5));
        store.push(MessageType::Att, Record::new(11.0).with_num("alt", 2.0));
        store.push(MessageType::Att, Record::new(12.0).with_num("alt", 87.3));
        store.push(MessageType::Bat, Record::new(11.0).with_num("volt", 12.6));
        store.push(MessageType::Bat, Record::new(130.0).with_num("volt", 11.1));
        store.push(MessageType::Ev, Record::new(15.0));

        assert_eq!(
            summarize(&store),
            "Flight duration: 123.5 seconds\n\
             GPS points: 2\n\
             Altitude range: 2.0m to 87.3m\n\
             Battery voltage range: 11.1V to 12.6V\n\
             Number of events: 1"
        );
    }

    #[test]
    fn test_altitude_omitted_when_no_att_record_has_alt() {
        let mut store = RecordStore::new();
        store.push(MessageType::Att, Record::new(0.0).with_num("roll", 1.0));
        store.push(MessageType::Att, Record::new(1.0).with_num("pitch", 2.0));

        // ATT is non-empty but no record carries `alt`.
        assert!(!summarize(&store).contains("Altitude"));
    }

    #[test]
    fn test_duration_needs_gps() {
        let mut store = RecordStore::new();
        store.push(MessageType::Ev, Record::new(1.0));

        assert_eq!(summarize(&store), "Number of events: 1");
    }

    #[test]
    fn test_single_gps_point_is_a_zero_length_flight() {
        let mut store = RecordStore::new();
        store.push(MessageType::Gps, Record::new(7.0));

        assert_eq!(
            summarize(&store),
            "Flight duration: 0.0 seconds\nGPS points: 1"
        );
    }
}
