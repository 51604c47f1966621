//! The fixed denormalizing aggregation.
//!
//! Stages:
//! 1. unwind `activityList`
//! 2. look up each activity's `connection` into `activityList.config.connection`
//! 3. regroup by workflow `_id`
//! 4. unwind again, unwinding the joined connection with unmatched rows kept
//! 5. look up the connection's `vpnConnection` in place, unwind it the same way
//! 6. regroup by workflow `_id`
//!
//! Unmatched lookups never drop an activity. A workflow with no activities
//! is dropped by the first unwind.

use mongodb::bson::{doc, Document};

use crate::backend::CONNECTION_CONFIGS;

/// Workflow-level fields carried through each regroup, taken from the
/// first row of the group.
pub const GROUPED_FIELDS: [&str; 7] = [
    "name",
    "path",
    "schedule",
    "pokeInterval",
    "timeout",
    "accountId",
    "tables",
];

const ACTIVITY_CONNECTION: &str = "activityList.config.connection";
const ACTIVITY_VPN_CONNECTION: &str = "activityList.config.connection.vpnConnection";

/// Build the aggregation pipeline run against every workflow-shaped
/// collection.
#[must_use]
pub fn denormalize_pipeline() -> Vec<Document> {
    vec![
        doc! { "$unwind": "$activityList" },
        lookup_stage("activityList.connection", ACTIVITY_CONNECTION),
        group_stage(),
        doc! { "$unwind": "$activityList" },
        preserving_unwind(ACTIVITY_CONNECTION),
        lookup_stage(ACTIVITY_VPN_CONNECTION, ACTIVITY_VPN_CONNECTION),
        preserving_unwind(ACTIVITY_VPN_CONNECTION),
        group_stage(),
    ]
}

fn lookup_stage(local_field: &str, as_field: &str) -> Document {
    doc! {
        "$lookup": {
            "from": CONNECTION_CONFIGS,
            "localField": local_field,
            "foreignField": "_id",
            "as": as_field,
        }
    }
}

fn preserving_unwind(path: &str) -> Document {
    doc! {
        "$unwind": {
            "path": format!("${path}"),
            "preserveNullAndEmptyArrays": true,
        }
    }
}

fn group_stage() -> Document {
    let mut group = doc! { "_id": "$_id" };
    for field in GROUPED_FIELDS {
        group.insert(field, doc! { "$first": format!("${field}") });
    }
    group.insert("activityList", doc! { "$push": "$activityList" });
    doc! { "$group": group }
}
