/// Thread name of the cli runtime
pub const THREAD_NAME: &str = "vhprobe";
/// Id given to the backend run by `serve`
pub const SERVE_BACKEND_ID: usize = 0;
