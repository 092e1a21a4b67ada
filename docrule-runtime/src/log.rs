use env_logger::Builder;

fn get_log_filter() -> String {
    match std::env::var("DOCRULE_LOG") {
        Ok(level) => level,
        Err(_) => std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
    }
}

pub fn init_logger() {
    Builder::new().parse_filters(&get_log_filter()).init();
}
