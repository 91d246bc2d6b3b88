use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;

/// Millisecond-precision conversion used in update documents.
pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keeps_millisecond_precision() {
        let dt = Utc.timestamp_millis_opt(1_718_971_200_123).unwrap();
        assert_eq!(chrono_to_bson(dt).timestamp_millis(), 1_718_971_200_123);
    }
}
