use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::stage::{StageSpec, DEFAULT_MAX_CONCURRENCY};
use crate::task::TaskSpec;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive, `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Worker-pool size per stage (default: 3)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Pause between two stages in milliseconds (default: 5000)
    #[serde(default = "default_settle_interval_ms")]
    pub settle_interval_ms: u64,
    /// Per-task deadline when neither the task nor its stage sets one (default: 300)
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
    /// Working directory for every task process
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Ordered stage list
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            settle_interval_ms: default_settle_interval_ms(),
            task_timeout_secs: default_task_timeout_secs(),
            working_dir: None,
            stages: default_stages(),
        }
    }
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_settle_interval_ms() -> u64 {
    5000
}

fn default_task_timeout_secs() -> u64 {
    300
}

/// One stage of the pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub name: String,
    /// Deadline for every task of this stage, unless the task sets its own
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub tasks: Vec<TaskConfig>,
}

/// One external task
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    pub name: String,
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl TaskConfig {
    fn python(name: &str, script: &str) -> Self {
        Self {
            name: name.to_string(),
            executable: "python3".to_string(),
            args: vec![script.to_string()],
            timeout_secs: None,
        }
    }
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig {
            name: "collection".to_string(),
            timeout_secs: None,
            tasks: vec![
                TaskConfig::python("fetch_press_releases", "fetch_press_releases_render.py"),
                TaskConfig::python("scrape_articles", "scrape_articles_supabase_render.py"),
                TaskConfig::python("scrape_sec_filings", "scrape_sec_filings_render.py"),
            ],
        },
        StageConfig {
            name: "analysis".to_string(),
            timeout_secs: None,
            tasks: vec![
                TaskConfig::python("analyze_sec_filings", "analyze_sec_filings_render.py"),
                TaskConfig::python("analyze_news_sentiment", "analyze_news_sentiment_render.py"),
            ],
        },
        StageConfig {
            name: "forecast".to_string(),
            timeout_secs: Some(600),
            tasks: vec![TaskConfig::python(
                "generate_forecast",
                "generate_comprehensive_forecast_render.py",
            )],
        },
    ]
}

impl PipelineConfig {
    /// Pause between two stages.
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    /// Resolves the stage list into executable specs.
    ///
    /// Task timeouts resolve task, then stage, then pipeline default.
    pub fn stage_specs(&self) -> Vec<StageSpec> {
        self.stages
            .iter()
            .map(|stage| {
                let tasks = stage
                    .tasks
                    .iter()
                    .map(|task| {
                        let secs = task
                            .timeout_secs
                            .or(stage.timeout_secs)
                            .unwrap_or(self.task_timeout_secs);
                        let mut spec = TaskSpec::new(&task.name, &task.executable)
                            .with_args(task.args.iter().cloned())
                            .with_timeout(Duration::from_secs(secs));
                        if let Some(ref dir) = self.working_dir {
                            spec = spec.with_working_dir(dir);
                        }
                        spec
                    })
                    .collect();
                StageSpec::new(&stage.name, tasks)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stages_mirror_financial_pipeline() {
        let config = PipelineConfig::default();
        let names: Vec<_> = config.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["collection", "analysis", "forecast"]);
        assert_eq!(config.stages[0].tasks.len(), 3);
        assert_eq!(config.stages[1].tasks.len(), 2);
        assert_eq!(config.stages[2].tasks[0].name, "generate_forecast");
    }

    #[test]
    fn test_default_tasks_run_the_render_scripts() {
        let config = PipelineConfig::default();
        let scripts: Vec<_> = config
            .stages
            .iter()
            .flat_map(|s| s.tasks.iter())
            .map(|t| {
                assert_eq!(t.executable, "python3");
                assert_eq!(t.args.len(), 1, "task {} should take one script", t.name);
                t.args[0].as_str()
            })
            .collect();

        assert_eq!(
            scripts,
            vec![
                "fetch_press_releases_render.py",
                "scrape_articles_supabase_render.py",
                "scrape_sec_filings_render.py",
                "analyze_sec_filings_render.py",
                "analyze_news_sentiment_render.py",
                "generate_comprehensive_forecast_render.py",
            ]
        );
    }

    #[test]
    fn test_stage_specs_resolve_timeouts() {
        let mut config = PipelineConfig::default();
        config.stages[0].tasks[1].timeout_secs = Some(42);

        let specs = config.stage_specs();

        assert_eq!(specs[0].tasks[0].timeout, Duration::from_secs(300));
        assert_eq!(specs[0].tasks[1].timeout, Duration::from_secs(42));
        assert_eq!(specs[2].tasks[0].timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_stage_specs_apply_working_dir() {
        let config = PipelineConfig {
            working_dir: Some(PathBuf::from("/srv/scripts")),
            ..PipelineConfig::default()
        };

        let specs = config.stage_specs();
        assert!(specs
            .iter()
            .flat_map(|s| &s.tasks)
            .all(|t| t.working_dir.as_deref() == Some(std::path::Path::new("/srv/scripts"))));
    }

    #[test]
    fn test_settle_interval() {
        let config = PipelineConfig {
            settle_interval_ms: 250,
            ..PipelineConfig::default()
        };
        assert_eq!(config.settle_interval(), Duration::from_millis(250));
    }
}
