use redb::TableDefinition;

/// Event records: id -> Event (msgpack)
pub const EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("events");

/// Schedule index: (schedule millis, id) -> () (for latest-first listing)
pub const EVENTS_BY_SCHEDULE: TableDefinition<(i64, &str), ()> =
    TableDefinition::new("events_by_schedule");
