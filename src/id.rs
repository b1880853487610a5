use uuid::Uuid;

/// Time-ordered UUID for locally created records. The durable store may
/// replace it with its own identifier once the write lands.
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}
