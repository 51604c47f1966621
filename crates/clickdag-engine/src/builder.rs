//! Wires the fixed clickstream task graph for one workflow.
//!
//! ```text
//! start ─┬─ s3_clickstream_sensor ─────────┬─ table_sensor_<default> ─ table_copy_<default>
//!        │                                 └─ ... one pair per default table
//!        └─ s3_clickstream_delayed_sensor ─┬─ table_sensor_<extra> ─ table_copy_<extra>
//!                                          └─ ... one pair per non-default declared table
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use clickdag_types::{
    ContainerJobSpec, CopyJobConfig, DefaultArgs, DocumentId, KeySensorSpec, Operator,
    PipelineDefinition, TaskSpec, WorkflowConfig,
};

use crate::activity::ClickstreamActivity;
use crate::config::settings::GeneratorSettings;
use crate::naming;

/// Tables every workflow gets an immediate copy job for.
pub const DEFAULT_TABLES: [&str; 5] = ["page", "track", "identify", "group", "screen"];

pub const START_TASK: &str = "start";
pub const SENSOR_TASK: &str = "s3_clickstream_sensor";
pub const DELAYED_SENSOR_TASK: &str = "s3_clickstream_delayed_sensor";
pub const TABLE_SENSOR_PREFIX: &str = "s3_clickstream_table_sensor_";
pub const TABLE_COPY_PREFIX: &str = "s3_clickstream_table_copy_";

/// Start date handed to every pipeline: one day before `now`, truncated to
/// the hour.
#[must_use]
pub fn start_date_for(now: DateTime<Utc>) -> DateTime<Utc> {
    let day_before = now - TimeDelta::days(1);
    day_before
        .duration_trunc(TimeDelta::hours(1))
        .unwrap_or(day_before)
}

/// Declared tables outside [`DEFAULT_TABLES`], de-duplicated and sorted.
#[must_use]
pub fn delayed_tables(workflow: &WorkflowConfig) -> Vec<String> {
    workflow
        .declared_tables()
        .into_iter()
        .filter(|t| !DEFAULT_TABLES.contains(t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Builds [`PipelineDefinition`]s against one set of settings and one
/// start date.
pub struct PipelineBuilder<'a> {
    settings: &'a GeneratorSettings,
    start_date: DateTime<Utc>,
}

impl<'a> PipelineBuilder<'a> {
    #[must_use]
    pub fn new(settings: &'a GeneratorSettings, now: DateTime<Utc>) -> Self {
        Self {
            settings,
            start_date: start_date_for(now),
        }
    }

    #[must_use]
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// Build the pipeline for `workflow`.
    #[must_use]
    pub fn build(&self, workflow: &WorkflowConfig) -> PipelineDefinition {
        let name = naming::pipeline_name(workflow, &self.settings.defaults.fallback_name);
        let base_path = naming::watch_path(&self.settings.object_store.prefix, &workflow.id);
        let delayed = delayed_tables(workflow);

        tracing::info!(
            pipeline = %name,
            workflow_id = %workflow.id,
            delayed_tables = delayed.len(),
            "Building pipeline"
        );

        let sensors = &self.settings.sensors;
        let offset = sensors.delayed_offset;
        let mut tasks = vec![TaskSpec {
            task_id: START_TASK.to_string(),
            upstream: Vec::new(),
            operator: Operator::Marker,
        }];

        tasks.push(self.partition_sensor(SENSOR_TASK, &base_path, 0));
        self.push_branch(&mut tasks, &workflow.id, SENSOR_TASK, &DEFAULT_TABLES, 0, &base_path);

        tasks.push(self.partition_sensor(DELAYED_SENSOR_TASK, &base_path, offset));
        let delayed: Vec<&str> = delayed.iter().map(String::as_str).collect();
        self.push_branch(
            &mut tasks,
            &workflow.id,
            DELAYED_SENSOR_TASK,
            &delayed,
            offset,
            &base_path,
        );

        PipelineDefinition {
            name,
            workflow_id: workflow.id.clone(),
            schedule_interval: self.settings.defaults.schedule_interval.clone(),
            default_args: self.default_args(&workflow.id),
            tasks,
        }
    }

    fn default_args(&self, workflow_id: &DocumentId) -> DefaultArgs {
        let defaults = &self.settings.defaults;
        DefaultArgs {
            owner: defaults.owner.clone(),
            depends_on_past: false,
            start_date: self.start_date,
            email: defaults.email.clone(),
            email_on_failure: false,
            email_on_retry: false,
            retries: 0,
            retry_delay_secs: defaults.retry_delay_secs,
            app_id: workflow_id.clone(),
            copy_table: None,
        }
    }

    /// Hard-failing sensor on the whole partition, downstream of `start`.
    fn partition_sensor(&self, task_id: &str, base_path: &str, timedelta: u32) -> TaskSpec {
        let sensors = &self.settings.sensors;
        TaskSpec {
            task_id: task_id.to_string(),
            upstream: vec![START_TASK.to_string()],
            operator: Operator::KeySensor(KeySensorSpec {
                bucket_name: self.settings.object_store.bucket.clone(),
                bucket_key: base_path.to_string(),
                timedelta,
                soft_fail: false,
                poke_interval_secs: sensors.poke_interval_secs,
                timeout_secs: sensors.timeout_secs,
            }),
        }
    }

    /// One soft-failing table sensor and its copy job per table.
    fn push_branch(
        &self,
        tasks: &mut Vec<TaskSpec>,
        workflow_id: &DocumentId,
        parent: &str,
        tables: &[&str],
        timedelta: u32,
        base_path: &str,
    ) {
        let sensors = &self.settings.sensors;
        for table in tables {
            let sensor_id = format!("{TABLE_SENSOR_PREFIX}{table}");
            tasks.push(TaskSpec {
                task_id: sensor_id.clone(),
                upstream: vec![parent.to_string()],
                operator: Operator::KeySensor(KeySensorSpec {
                    bucket_name: self.settings.object_store.bucket.clone(),
                    bucket_key: naming::table_key(base_path, table),
                    timedelta,
                    soft_fail: true,
                    poke_interval_secs: sensors.table_poke_interval_secs,
                    timeout_secs: sensors.table_timeout_secs,
                }),
            });
            tasks.push(TaskSpec {
                task_id: format!("{TABLE_COPY_PREFIX}{table}"),
                upstream: vec![sensor_id],
                operator: Operator::ContainerJob(self.copy_job(workflow_id, table, timedelta)),
            });
        }
    }

    fn copy_job(&self, workflow_id: &DocumentId, table: &str, timedelta: u32) -> ContainerJobSpec {
        let activity = ClickstreamActivity::from_settings(workflow_id, table, self.settings);
        if !activity.is_valid() {
            tracing::debug!(
                workflow_id = %workflow_id,
                table,
                "Copy job has unset parameters, passing nulls"
            );
        }
        ContainerJobSpec {
            name: activity.name,
            version: activity.version,
            pool: self.settings.pool.clone(),
            config: CopyJobConfig {
                app_id: activity.workflow_id,
                table: activity.table_name,
                redshift_host: activity.redshift_host,
                redshift_port: activity.redshift_port,
                redshift_db: activity.redshift_db,
                redshift_user: activity.redshift_user,
                redshift_password: activity.redshift_password,
                redshift_schema: activity.redshift_schema,
                temp_bucket: activity.temp_bucket,
                timedelta,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings() -> GeneratorSettings {
        let mut s = GeneratorSettings::new("mongodb://mongo/astro", "batch-job:2.1");
        s.object_store.bucket = Some("clicks".into());
        s.warehouse.host = Some("wh.example.com".into());
        s.warehouse.schema = Some("raw".into());
        s
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 14, 37, 12).unwrap()
    }

    fn workflow(tables: &[&str]) -> WorkflowConfig {
        let mut wf = WorkflowConfig::new("abc123");
        wf.name = Some("Acme Clickstream".into());
        wf.tables = tables.iter().map(|t| (*t).to_string()).collect();
        wf
    }

    fn sensor(p: &PipelineDefinition, id: &str) -> KeySensorSpec {
        match &p.task(id).unwrap().operator {
            Operator::KeySensor(s) => s.clone(),
            other => panic!("{id} is not a sensor: {other:?}"),
        }
    }

    #[test]
    fn start_date_is_previous_day_on_the_hour() {
        assert_eq!(
            start_date_for(now()),
            Utc.with_ymd_and_hms(2026, 10, 17, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn delayed_tables_exclude_defaults_and_dedupe() {
        let wf = workflow(&["track", "refund", "checkout", "refund", "page"]);
        assert_eq!(delayed_tables(&wf), vec!["checkout", "refund"]);
    }

    #[test]
    fn delayed_tables_fall_back_to_activities() {
        let mut wf = workflow(&[]);
        wf.activities = vec![clickdag_types::Activity {
            table: Some("orders".into()),
            ..Default::default()
        }];
        assert_eq!(delayed_tables(&wf), vec!["orders"]);
    }

    #[test]
    fn graph_shape_with_delayed_tables() {
        let s = settings();
        let p = PipelineBuilder::new(&s, now()).build(&workflow(&["page", "checkout"]));

        assert_eq!(p.name, "acme_clickstream__etl__abc123");
        assert_eq!(p.schedule_interval, "*/15 * * * *");
        // start + 2 partition sensors + 5 default pairs + 1 delayed pair
        assert_eq!(p.tasks.len(), 1 + 2 + 10 + 2);
        assert_eq!(p.container_jobs().count(), 6);

        let roots: Vec<_> = p.downstream_of(START_TASK).map(|t| t.task_id.as_str()).collect();
        assert_eq!(roots, vec![SENSOR_TASK, DELAYED_SENSOR_TASK]);

        let immediate: Vec<_> = p.downstream_of(SENSOR_TASK).map(|t| t.task_id.clone()).collect();
        assert_eq!(
            immediate,
            DEFAULT_TABLES
                .iter()
                .map(|t| format!("{TABLE_SENSOR_PREFIX}{t}"))
                .collect::<Vec<_>>()
        );

        let delayed: Vec<_> = p
            .downstream_of(DELAYED_SENSOR_TASK)
            .map(|t| t.task_id.as_str())
            .collect();
        assert_eq!(delayed, vec!["s3_clickstream_table_sensor_checkout"]);

        let copy = p.task("s3_clickstream_table_copy_checkout").unwrap();
        assert_eq!(copy.upstream, vec!["s3_clickstream_table_sensor_checkout"]);
    }

    #[test]
    fn sensors_fail_hard_at_partition_level_only() {
        let s = settings();
        let p = PipelineBuilder::new(&s, now()).build(&workflow(&["checkout"]));

        let top = sensor(&p, SENSOR_TASK);
        assert!(!top.soft_fail);
        assert_eq!(top.bucket_key, "clickstream-data/abc123/{date}/");
        assert_eq!(top.bucket_name.as_deref(), Some("clicks"));
        assert_eq!((top.timedelta, top.poke_interval_secs, top.timeout_secs), (0, 5, 10));

        let delayed = sensor(&p, DELAYED_SENSOR_TASK);
        assert!(!delayed.soft_fail);
        assert_eq!(delayed.timedelta, 15);
        assert_eq!(delayed.bucket_key, top.bucket_key);

        let table = sensor(&p, "s3_clickstream_table_sensor_checkout");
        assert!(table.soft_fail);
        assert_eq!(table.timedelta, 15);
        assert_eq!(table.bucket_key, "clickstream-data/abc123/{date}/checkout");
    }

    #[test]
    fn copy_job_carries_environment_parameters() {
        let mut s = settings();
        s.pool = Some("batch".into());
        let p = PipelineBuilder::new(&s, now()).build(&workflow(&[]));

        let (task, job) = p.container_jobs().next().unwrap();
        assert_eq!(task.task_id, "s3_clickstream_table_copy_page");
        assert_eq!(job.name.as_deref(), Some("batch-job"));
        assert_eq!(job.version.as_deref(), Some("2.1"));
        assert_eq!(job.pool.as_deref(), Some("batch"));
        assert_eq!(job.config.app_id.as_deref(), Some("abc123"));
        assert_eq!(job.config.table.as_deref(), Some("page"));
        assert_eq!(job.config.redshift_host.as_deref(), Some("wh.example.com"));
        assert_eq!(job.config.redshift_schema.as_deref(), Some("raw"));
        assert!(job.config.redshift_password.is_none());
        assert_eq!(job.config.temp_bucket.as_deref(), Some("clicks"));
        assert_eq!(job.config.timedelta, 0);
    }

    #[test]
    fn default_args_per_workflow() {
        let s = settings();
        let builder = PipelineBuilder::new(&s, now());
        let p = builder.build(&workflow(&[]));
        let args = &p.default_args;
        assert_eq!(args.owner, "astronomer");
        assert_eq!(args.retries, 0);
        assert_eq!(args.retry_delay_secs, 300);
        assert_eq!(args.app_id, DocumentId::new("abc123"));
        assert_eq!(args.start_date, builder.start_date());
        assert!(args.email.is_none());
        assert!(args.copy_table.is_none());
    }

    #[test]
    fn no_delayed_tables_leaves_delayed_sensor_childless() {
        let s = settings();
        let p = PipelineBuilder::new(&s, now()).build(&workflow(&DEFAULT_TABLES));
        assert_eq!(p.downstream_of(DELAYED_SENSOR_TASK).count(), 0);
        assert_eq!(p.container_jobs().count(), DEFAULT_TABLES.len());
    }
}
