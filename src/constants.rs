pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 720;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 10000;

pub const MAX_RECIPE_NAME_LENGTH: usize = 200;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 24;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://recipes.db";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DATABASE_BUSY_TIMEOUT_SECS: u64 = 5;
