pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USER_FIELD_LENGTH: usize = 150;
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;

/// Decoded image size accepted in a recipe payload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Request body limit; base64 inflates the image by a third.
pub const MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

pub const RESERVED_USERNAMES: &[&str] = &["me"];
