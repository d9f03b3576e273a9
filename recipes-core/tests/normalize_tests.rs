use recipes_core::{normalize_cron_jobs, parse_recipe, SpecError};
use rstest::rstest;
use serde_json::{json, Value};

#[rstest]
#[case::object_instead_of_array(json!({ "id": "a" }))]
#[case::string_instead_of_array(json!("daily"))]
#[case::non_object_entry(json!(["daily"]))]
#[case::null_entry(json!([null]))]
#[case::missing_id(json!([{ "schedule": "* * * * *", "message": "m" }]))]
#[case::blank_id(json!([{ "id": "  ", "schedule": "* * * * *", "message": "m" }]))]
#[case::missing_schedule(json!([{ "id": "a", "message": "m" }]))]
#[case::blank_message(json!([{ "id": "a", "schedule": "* * * * *", "message": " " }]))]
#[case::non_bool_enabled(json!([{ "id": "a", "schedule": "* * * * *", "message": "m", "enabledByDefault": "yes" }]))]
#[case::non_string_channel(json!([{ "id": "a", "schedule": "* * * * *", "message": "m", "channel": 7 }]))]
fn malformed_input_is_invalid_spec(#[case] raw: Value) {
    let err = normalize_cron_jobs(Some(&raw)).unwrap_err();
    assert!(matches!(err, SpecError::InvalidSpec(_)), "got {err:?}");
}

#[test]
fn duplicate_ids_fail_whole_normalization() {
    let raw = json!([
        { "id": "daily-report", "schedule": "0 9 * * *", "message": "a" },
        { "id": " daily-report ", "schedule": "0 10 * * *", "message": "b" },
    ]);
    let err = normalize_cron_jobs(Some(&raw)).unwrap_err();
    assert_eq!(err, SpecError::DuplicateId("daily-report".to_string()));
}

#[test]
fn empty_array_is_valid() {
    assert!(normalize_cron_jobs(Some(&json!([]))).unwrap().is_empty());
}

#[test]
fn all_optional_fields_are_carried() {
    let raw = json!([{
        "id": "weekly-cleanup",
        "schedule": "0 3 * * 0",
        "message": "clean up stale tickets",
        "name": "Weekly cleanup",
        "description": "Moves stale tickets to done",
        "timezone": "Europe/Berlin",
        "channel": "telegram",
        "to": "@ops",
        "agentId": "dev-team-lead",
        "enabledByDefault": true
    }]);
    let job = normalize_cron_jobs(Some(&raw)).unwrap().remove(0);
    assert_eq!(job.name.as_deref(), Some("Weekly cleanup"));
    assert_eq!(job.description.as_deref(), Some("Moves stale tickets to done"));
    assert_eq!(job.timezone.as_deref(), Some("Europe/Berlin"));
    assert_eq!(job.channel.as_deref(), Some("telegram"));
    assert_eq!(job.to.as_deref(), Some("@ops"));
    assert_eq!(job.agent_id.as_deref(), Some("dev-team-lead"));
    assert!(job.enabled_by_default);
}

#[test]
fn recipe_front_matter_feeds_the_normalizer() {
    let md = "---\nid: research-team\nkind: team\ncronJobs:\n  - id: digest\n    schedule: \"0 8 * * 1-5\"\n    message: Post the morning digest\n    enabledByDefault: true\n---\nbody\n";
    let recipe = parse_recipe(md).unwrap();
    let jobs = normalize_cron_jobs(recipe.cron_jobs()).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].schedule, "0 8 * * 1-5");
    assert!(jobs[0].enabled_by_default);
}

#[test]
fn recipe_without_cron_jobs_normalizes_to_empty() {
    let recipe = parse_recipe("---\nid: solo\nkind: agent\n---\n").unwrap();
    assert!(normalize_cron_jobs(recipe.cron_jobs()).unwrap().is_empty());
}
