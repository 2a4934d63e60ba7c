use crate::collectors::Harvest;
use crate::error::RemoteError;
use crate::events::{RawRecord, Source};
use crate::remote::CommandRunner;
use log::{info, warn};
use serde_json::Value;

/// Collects journal entries for one systemd unit on a remote host.
///
/// Runs `journalctl --output=json` over SSH and parses each stdout line as a
/// JSON object. Journal output can be interleaved with noise, so a line that
/// fails to parse is dropped and counted rather than failing the batch.
pub struct SystemdLogCollector<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    host: String,
    unit: String,
    since_hours: u64,
}

impl<'a, R: CommandRunner + ?Sized> SystemdLogCollector<'a, R> {
    pub fn new(
        runner: &'a R,
        host: impl Into<String>,
        unit: impl Into<String>,
        since_hours: u64,
    ) -> Self {
        Self {
            runner,
            host: host.into(),
            unit: unit.into(),
            since_hours,
        }
    }

    /// Collect journal entries, returning an empty harvest when the unit has
    /// logged nothing in the window. Only transport failures are errors.
    pub fn collect(&self) -> Result<Harvest<RawRecord>, RemoteError> {
        let command = format!(
            "journalctl --since '{} hours ago' -u {} --output=json",
            self.since_hours, self.unit
        );
        info!("Collecting systemd logs from {}: {command}", self.host);

        let output = self.runner.run(&command)?;

        let mut harvest = Harvest::default();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(line) {
                Ok(mut record) => {
                    record
                        .entry("host")
                        .or_insert_with(|| Value::String(self.host.clone()));
                    record
                        .entry("unit")
                        .or_insert_with(|| Value::String(self.unit.clone()));
                    record.insert(
                        "source".to_string(),
                        Value::String(Source::Systemd.as_str().to_string()),
                    );
                    harvest.records.push(record);
                }
                Err(_) => {
                    warn!("Skipping non-JSON line from journalctl output");
                    harvest.skipped += 1;
                }
            }
        }

        info!(
            "Collected {} journal entries from unit '{}' on {} ({} lines skipped)",
            harvest.records.len(),
            self.unit,
            self.host,
            harvest.skipped
        );
        Ok(harvest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockCommandRunner;
    use serde_json::json;

    #[test]
    fn test_builds_journalctl_command() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd == "journalctl --since '24 hours ago' -u docker.service --output=json")
            .times(1)
            .returning(|_| Ok(String::new()));

        let collector = SystemdLogCollector::new(&runner, "h1", "docker.service", 24);
        let harvest = collector.collect().unwrap();
        assert!(harvest.records.is_empty());
        assert_eq!(harvest.skipped, 0);
    }

    #[test]
    fn test_parses_and_enriches_records() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| {
            Ok(concat!(
                "{\"__REALTIME_TIMESTAMP\":\"1700000000000000\",\"MESSAGE\":\"boot\"}\n",
                "{\"MESSAGE\":\"up\",\"host\":\"already-set\"}\n",
            )
            .to_string())
        });

        let collector = SystemdLogCollector::new(&runner, "h1", "docker.service", 24);
        let harvest = collector.collect().unwrap();
        assert_eq!(harvest.records.len(), 2);

        let first = &harvest.records[0];
        assert_eq!(first["host"], json!("h1"));
        assert_eq!(first["unit"], json!("docker.service"));
        assert_eq!(first["source"], json!("systemd"));

        // Existing host tag is preserved, source is always stamped
        let second = &harvest.records[1];
        assert_eq!(second["host"], json!("already-set"));
        assert_eq!(second["source"], json!("systemd"));
    }

    #[test]
    fn test_non_json_lines_are_counted_not_fatal() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| {
            Ok("-- Logs begin at Tue --\n{\"MESSAGE\":\"ok\"}\n\ngarbage line\n".to_string())
        });

        let collector = SystemdLogCollector::new(&runner, "h1", "sshd.service", 6);
        let harvest = collector.collect().unwrap();
        assert_eq!(harvest.records.len(), 1);
        assert_eq!(harvest.skipped, 2);
    }

    #[test]
    fn test_transport_failure_propagates() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Err(RemoteError::ConnectionFailed("no route".to_string())));

        let collector = SystemdLogCollector::new(&runner, "h1", "docker.service", 24);
        assert!(matches!(
            collector.collect(),
            Err(RemoteError::ConnectionFailed(_))
        ));
    }
}
