pub(crate) const METRIC_COMPONENT_STARTED: &str = "bootstrap_component_started_total";
pub(crate) const METRIC_COMPONENT_START_FAILED: &str = "bootstrap_component_start_failures_total";
pub(crate) const METRIC_COMPONENT_STOP_FAILED: &str = "bootstrap_component_stop_failures_total";

pub(crate) fn emit_component_started(app: &str, component: &str) {
    metrics::counter!(
        METRIC_COMPONENT_STARTED,
        "app" => app.to_string(),
        "component" => component.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_component_start_failed(app: &str, component: &str) {
    metrics::counter!(
        METRIC_COMPONENT_START_FAILED,
        "app" => app.to_string(),
        "component" => component.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_component_stop_failed(app: &str, component: &str) {
    metrics::counter!(
        METRIC_COMPONENT_STOP_FAILED,
        "app" => app.to_string(),
        "component" => component.to_string()
    )
    .increment(1);
}
