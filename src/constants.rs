pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 20;

/// Recipes shown per followed author when no limit is requested.
pub const DEFAULT_RECIPES_LIMIT: i64 = 3;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_car.txt";

pub const RECIPE_IMAGE_DIR: &str = "recipes";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

pub const NAME_MAX_LENGTH: usize = 200;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Usernames that collide with routes.
pub const RESERVED_USERNAMES: &[&str] = &["me"];

pub const SESSION_COOKIE: &str = "session";
/// One year.
pub const MAX_SESSION_HOURS: i64 = 8760;
