pub mod ports;
pub mod envelope;
pub mod course_use_case;
pub mod submissions_use_case;
pub mod unenroll_use_case;
