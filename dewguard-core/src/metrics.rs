//! Prometheus text exposition
//!
//! Renders ambient, power and per-output gauges in the text format served
//! with content type [`METRICS_CONTENT_TYPE`]. Every sample carries the fixed
//! labels of the device followed by its own:
//!
//! ```text
//! # HELP dewguard_output_duty PWM duty cycle (0-1)
//! # TYPE dewguard_output_duty gauge
//! dewguard_output_duty {device="rig",index="0"} 0.600000
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::output::Output;
use crate::sensors::{AmbientReading, PowerStatus};

/// Content type of the rendered text
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Ordered `name="value"` label set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    pairs: Vec<(String, String)>,
}

impl Labels {
    /// Empty label set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    fn write_to(&self, out: &mut String, first: bool) {
        for (i, (name, value)) in self.pairs.iter().enumerate() {
            if i > 0 || !first {
                out.push(',');
            }
            let _ = write!(out, "{}=\"{}\"", name, value);
        }
    }

    fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Exposition text builder
#[derive(Debug, Clone)]
pub struct MetricsWriter {
    fixed: Labels,
    out: String,
}

impl MetricsWriter {
    /// Builder adding `fixed` to every sample
    pub fn new(fixed: Labels) -> Self {
        Self { fixed, out: String::new() }
    }

    /// Write `# HELP` and `# TYPE` headers for a gauge
    pub fn gauge_header(&mut self, name: &str, help: &str) -> &mut Self {
        let _ = writeln!(self.out, "# HELP {} {}", name, help);
        let _ = writeln!(self.out, "# TYPE {} gauge", name);
        self
    }

    /// Write one sample
    pub fn sample(&mut self, name: &str, value: f32, labels: &Labels) -> &mut Self {
        let _ = write!(self.out, "{} {{", name);
        self.fixed.write_to(&mut self.out, true);
        labels.write_to(&mut self.out, self.fixed.is_empty());
        let _ = writeln!(self.out, "}} {:.6}", value);
        self
    }

    /// Headers followed by a single sample
    pub fn gauge(&mut self, name: &str, help: &str, value: f32, labels: &Labels) -> &mut Self {
        self.gauge_header(name, help).sample(name, value, labels)
    }

    /// Finished text
    pub fn finish(self) -> String {
        self.out
    }
}

/// Render the full exposition for one device
pub fn render(
    fixed: Labels,
    ambient: Option<&AmbientReading>,
    power: Option<&PowerStatus>,
    outputs: &[Output],
) -> String {
    let mut metrics = MetricsWriter::new(fixed);
    let none = Labels::new();

    if let Some(ambient) = ambient {
        metrics
            .gauge("dewguard_ambient_temperature", "Ambient temperature (°C)", ambient.temperature, &none)
            .gauge("dewguard_ambient_humidity", "Ambient relative humidity (%)", ambient.humidity, &none)
            .gauge("dewguard_ambient_dewpoint", "Ambient dewpoint (°C)", ambient.dewpoint(), &none);
    }

    if let Some(power) = power {
        metrics
            .gauge("dewguard_power_bus_voltage", "Bus voltage (V)", power.bus_voltage, &none)
            .gauge("dewguard_power_current", "Current draw (A)", power.current, &none)
            .gauge("dewguard_power_power", "Power (W)", power.power, &none);
    }

    let index_label = |output: &Output| Labels::new().with("index", alloc::format!("{}", output.index()));

    metrics.gauge_header("dewguard_output_duty", "PWM duty cycle (0-1)");
    for output in outputs {
        metrics.sample("dewguard_output_duty", output.duty(), &index_label(output));
    }

    metrics.gauge_header("dewguard_output_active", "Whether the output is driving its load");
    for output in outputs {
        let active = if output.active() { 1.0 } else { 0.0 };
        metrics.sample("dewguard_output_active", active, &index_label(output));
    }

    metrics.gauge_header("dewguard_output_temperature", "Output probe temperature (°C)");
    for output in outputs {
        if let Some(temperature) = output.temperature() {
            metrics.sample("dewguard_output_temperature", temperature, &index_label(output));
        }
    }

    metrics.gauge_header("dewguard_output_target_temperature", "Output target temperature (°C)");
    for output in outputs {
        if let Some(target) = output.target_temperature() {
            metrics.sample("dewguard_output_target_temperature", target, &index_label(output));
        }
    }

    metrics.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputKind;

    #[test]
    fn sample_line_format() {
        let mut metrics = MetricsWriter::new(Labels::new().with("device", "rig"));
        metrics.gauge("x", "help text", 1.5, &Labels::new().with("index", "2"));
        assert_eq!(
            metrics.finish(),
            "# HELP x help text\n# TYPE x gauge\nx {device=\"rig\",index=\"2\"} 1.500000\n"
        );
    }

    #[test]
    fn no_fixed_labels() {
        let mut metrics = MetricsWriter::new(Labels::new());
        metrics.sample("y", 0.0, &Labels::new().with("index", "0"));
        assert_eq!(metrics.finish(), "y {index=\"0\"} 0.000000\n");
    }

    #[test]
    fn render_skips_missing_readings() {
        let outputs = [Output::new(0, OutputKind::Heater), Output::new(1, OutputKind::PlainOutput)];
        let text = render(Labels::new(), None, Some(&PowerStatus::new(12.0, 1.0)), &outputs);

        assert!(!text.contains("dewguard_ambient_temperature"));
        assert!(text.contains("dewguard_power_power {} 12.000000\n"));
        assert!(text.contains("dewguard_output_duty {index=\"1\"} 0.000000\n"));
        assert!(text.contains("dewguard_output_active {index=\"0\"} 0.000000\n"));
        assert!(!text.contains("dewguard_output_temperature {"));
    }
}
