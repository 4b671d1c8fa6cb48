//! Wire-level names used by the Moodle REST server.

// Path of the REST entry point relative to the site root
pub const WEBSERVICE_PATH: &str = "/webservice/rest/server.php";

// Fixed query parameters
pub const FUNCTION_PARAM: &str = "wsfunction";
pub const TOKEN_PARAM: &str = "wstoken";
pub const FORMAT_PARAM: &str = "moodlewsrestformat";
pub const JSON_FORMAT: &str = "json";

/// Marker emitted at the JSON boundary for submissions without a grade
pub const NOT_GRADED: &str = "Not graded";

// Defaults for values read from configuration
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 4;

// Environment variable names
pub const ENV_BASE_URL: &str = "MOODLE_BASE_URL";
pub const ENV_TOKEN: &str = "MOODLE_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "MOODLE_TIMEOUT_SECS";
pub const ENV_ARRAY_STYLE: &str = "MOODLE_ARRAY_STYLE";
pub const ENV_QUERY_ESCAPE: &str = "MOODLE_QUERY_ESCAPE";
pub const ENV_RESPONSE_MODE: &str = "MOODLE_RESPONSE_MODE";
pub const ENV_FANOUT_CONCURRENCY: &str = "MOODLE_FANOUT_CONCURRENCY";
