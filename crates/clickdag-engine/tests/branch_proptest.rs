use std::collections::{BTreeSet, HashSet};

use chrono::{TimeZone, Utc};
use clickdag_engine::builder::{DEFAULT_TABLES, DELAYED_SENSOR_TASK, SENSOR_TASK};
use clickdag_engine::{GeneratorSettings, PipelineBuilder};
use clickdag_types::WorkflowConfig;
use proptest::prelude::*;

fn table_name() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(DEFAULT_TABLES.to_vec()).prop_map(str::to_string),
        "[a-z][a-z_]{0,11}",
    ]
}

proptest! {
    #[test]
    fn branch_sizes_follow_declared_tables(tables in prop::collection::vec(table_name(), 0..20)) {
        let settings = GeneratorSettings::new("mongodb://localhost/astro", "batch-job:2.1");
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let mut workflow = WorkflowConfig::new("wf-prop");
        workflow.tables = tables.clone();

        let pipeline = PipelineBuilder::new(&settings, now).build(&workflow);

        let distinct: BTreeSet<&str> = tables.iter().map(String::as_str).collect();
        let extra = distinct.iter().filter(|t| !DEFAULT_TABLES.contains(*t)).count();

        prop_assert_eq!(pipeline.downstream_of(SENSOR_TASK).count(), DEFAULT_TABLES.len());
        prop_assert_eq!(pipeline.downstream_of(DELAYED_SENSOR_TASK).count(), extra);
        prop_assert_eq!(pipeline.container_jobs().count(), DEFAULT_TABLES.len() + extra);
        prop_assert_eq!(pipeline.tasks.len(), 3 + 2 * (DEFAULT_TABLES.len() + extra));

        let ids: HashSet<&str> = pipeline.tasks.iter().map(|t| t.task_id.as_str()).collect();
        prop_assert_eq!(ids.len(), pipeline.tasks.len());
    }

    #[test]
    fn every_upstream_is_wired_earlier(tables in prop::collection::vec(table_name(), 0..10)) {
        let settings = GeneratorSettings::new("mongodb://localhost/astro", "batch-job");
        let mut workflow = WorkflowConfig::new("wf-order");
        workflow.tables = tables;

        let pipeline = PipelineBuilder::new(&settings, Utc::now()).build(&workflow);

        let mut seen = HashSet::new();
        for task in &pipeline.tasks {
            for upstream in &task.upstream {
                prop_assert!(
                    seen.contains(upstream.as_str()),
                    "{} wired before {}",
                    task.task_id,
                    upstream
                );
            }
            seen.insert(task.task_id.as_str());
        }
    }
}
