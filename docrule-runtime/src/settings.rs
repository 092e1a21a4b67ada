use log::debug;
use std::env;

pub struct Settings {
    /**
     * Run scripts in secure mode
     *
     * Secure mode keeps environment variables, clocks and stdout out of reach of rules.
     * Environment variable: DOCRULE_SECURE
     * Default: true
     */
    pub secure: bool,
    /**
     * Record performance markers
     *
     * Prints the validation, compilation and execution timings after the run.
     * Environment variable: DOCRULE_MONITOR
     * Default: false
     */
    pub monitor: bool,
}

impl Settings {
    pub fn load() -> Self {
        let secure = env::var("DOCRULE_SECURE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let monitor = env::var("DOCRULE_MONITOR")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        debug!("DOCRULE_SECURE = {}", secure);
        debug!("DOCRULE_MONITOR = {}", monitor);

        Self { secure, monitor }
    }
}
