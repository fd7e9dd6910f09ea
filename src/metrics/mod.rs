// metrics/mod.rs
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::models::EnergyUsage;

pub fn setup_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

pub fn record_connect_attempt(timeout_secs: u64) {
    counter!("plug_connect_attempts_total", "timeout" => timeout_secs.to_string()).increment(1);
}

pub fn record_connect_failure() {
    counter!("plug_connect_failures_total").increment(1);
}

pub fn record_relay_state(on: bool) {
    gauge!("plug_relay_on").set(if on { 1.0 } else { 0.0 });
}

pub fn record_energy(energy: &EnergyUsage) {
    gauge!("plug_current_power_milliwatts").set(energy.current_power as f64);
    gauge!("plug_today_energy_watt_hours").set(energy.today_energy as f64);
    gauge!("plug_month_energy_watt_hours").set(energy.month_energy as f64);
}
