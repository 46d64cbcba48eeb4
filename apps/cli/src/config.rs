// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process configuration loaded from environment variables.

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Solver time limit overriding request files, in seconds.
    pub time_limit_secs: Option<f64>,
    /// Grid module used when no constraints file is given, in meters.
    pub grid_module_m: Option<f64>,
    /// Number of worker threads for variant generation.
    pub worker_threads: usize,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |key: &str| {
            var(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
        };
        Self {
            time_limit_secs: positive("MADORI_TIME_LIMIT_SECS"),
            grid_module_m: positive("MADORI_GRID_MODULE_M"),
            worker_threads: var("MADORI_WORKER_THREADS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or_else(num_cpus::get),
            log_format: match var("MADORI_LOG_FORMAT").as_deref().map(str::trim) {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn unset_variables_use_defaults() {
        let c = config(&[]);
        assert_eq!(c.time_limit_secs, None);
        assert_eq!(c.grid_module_m, None);
        assert_eq!(c.worker_threads, num_cpus::get());
        assert_eq!(c.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_and_filters_values() {
        let c = config(&[
            ("MADORI_TIME_LIMIT_SECS", "2.5"),
            ("MADORI_GRID_MODULE_M", "-1"),
            ("MADORI_WORKER_THREADS", "3"),
            ("MADORI_LOG_FORMAT", "json"),
        ]);
        assert_eq!(c.time_limit_secs, Some(2.5));
        assert_eq!(c.grid_module_m, None);
        assert_eq!(c.worker_threads, 3);
        assert_eq!(c.log_format, LogFormat::Json);
    }
}
