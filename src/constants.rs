use rand::Rng;

/// URL prefix under which stored content is served; also the first component of every `filepath`
pub const UPLOADS_ROUTE_PREFIX: &str = "uploads";

/// Multipart field carrying the clip
pub const UPLOAD_FIELD_NAME: &str = "video";

/// Container format every upload is stored as
pub const STORED_EXTENSION: &str = "webm";

/// Original name recorded when the client sends none
pub const DEFAULT_ORIGINAL_NAME: &str = "recording.webm";

/// Timestamp layout of `created_at`, local time with millisecond precision
/// Lexicographic order equals chronological order
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Generate a stored file name that is unique per upload
/// Format: video-<unix millis>-<random 0..1e9>.webm
pub fn generate_stored_filename(now_ms: i64) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!(
        "{}-{}-{}.{}",
        UPLOAD_FIELD_NAME, now_ms, suffix, STORED_EXTENSION
    )
}

/// Default title of a fresh recording
pub fn default_title(now_ms: i64) -> String {
    format!("Recording-{}", now_ms)
}
