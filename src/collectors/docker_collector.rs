use crate::error::RemoteError;
use crate::events::{DockerLogRecord, Source};
use crate::remote::CommandRunner;
use chrono::{Duration as ChronoDuration, Utc};
use log::{info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

const LIST_COMMAND: &str = "docker ps --format '{{.ID}} {{.Names}}'";

/// One running container as discovered by `docker ps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub id: String,
    pub name: String,
}

/// Result of one Docker collection run.
///
/// Failures fetching logs for individual containers and selectors that match
/// nothing are surfaced here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct DockerHarvest {
    pub records: Vec<DockerLogRecord>,
    /// Containers whose log fetch failed and were skipped
    pub failed_containers: Vec<ContainerRef>,
    /// Requested selectors that matched no running container
    pub unmatched: Vec<String>,
}

/// Collects log lines from running containers on a remote host.
///
/// Two-phase: discover running containers, then fetch each target's logs
/// since the cutoff. Per-container fetches are independent SSH sessions and
/// run on a bounded worker pool; results are reassembled in discovery order
/// so the persisted batch is deterministic.
pub struct DockerLogCollector<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    host: String,
    since_minutes: i64,
    selectors: Option<Vec<String>>,
    concurrency: usize,
}

impl<'a, R: CommandRunner + ?Sized> DockerLogCollector<'a, R> {
    pub fn new(
        runner: &'a R,
        host: impl Into<String>,
        since_minutes: i64,
        selectors: Option<Vec<String>>,
        concurrency: usize,
    ) -> Self {
        Self {
            runner,
            host: host.into(),
            since_minutes,
            selectors,
            concurrency: concurrency.max(1),
        }
    }

    pub fn collect(&self) -> Result<DockerHarvest, RemoteError> {
        let discovered = self.list_containers()?;
        let (targets, unmatched) = self.resolve_targets(&discovered);

        if targets.is_empty() {
            warn!("No containers to collect logs from on {}", self.host);
            return Ok(DockerHarvest {
                unmatched,
                ..DockerHarvest::default()
            });
        }

        // docker logs --since expects an RFC 3339 timestamp
        let cutoff = (Utc::now() - ChronoDuration::minutes(self.since_minutes)).to_rfc3339();

        let results = self.fetch_all(&targets, &cutoff);

        let mut harvest = DockerHarvest {
            unmatched,
            ..DockerHarvest::default()
        };
        for (target, result) in targets.iter().zip(results) {
            match result {
                Ok(mut records) => harvest.records.append(&mut records),
                Err(e) => {
                    warn!(
                        "Failed to collect logs for container {} ({}) on {}: {e}",
                        target.name, target.id, self.host
                    );
                    harvest.failed_containers.push(target.clone());
                }
            }
        }

        info!(
            "Collected {} Docker log lines from {} container(s) on {}",
            harvest.records.len(),
            targets.len(),
            self.host
        );
        Ok(harvest)
    }

    /// Phase 1: `docker ps` id/name discovery. A line carrying only an id
    /// (no name column) falls back to the id as the name.
    fn list_containers(&self) -> Result<Vec<ContainerRef>, RemoteError> {
        info!("Listing Docker containers on {}: {LIST_COMMAND}", self.host);
        let output = self.runner.run(LIST_COMMAND)?;

        let mut containers = Vec::new();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let container = match line.split_once(' ') {
                Some((id, name)) => ContainerRef {
                    id: id.to_string(),
                    name: name.to_string(),
                },
                None => ContainerRef {
                    id: line.to_string(),
                    name: line.to_string(),
                },
            };
            containers.push(container);
        }

        info!(
            "Found {} running containers on {}",
            containers.len(),
            self.host
        );
        Ok(containers)
    }

    /// Resolve explicit selectors against the discovered set, id first, then
    /// name. Selectors matching nothing are returned for the caller to report.
    fn resolve_targets(&self, discovered: &[ContainerRef]) -> (Vec<ContainerRef>, Vec<String>) {
        let Some(selectors) = &self.selectors else {
            return (discovered.to_vec(), Vec::new());
        };

        let mut targets = Vec::new();
        let mut unmatched = Vec::new();
        for selector in selectors {
            if let Some(c) = discovered.iter().find(|c| c.id == *selector) {
                targets.push(c.clone());
            } else if let Some(c) = discovered.iter().find(|c| c.name == *selector) {
                targets.push(c.clone());
            } else {
                warn!("Requested container {selector} not found on {}", self.host);
                unmatched.push(selector.clone());
            }
        }
        (targets, unmatched)
    }

    /// Fetch logs for every target on a bounded pool of scoped threads,
    /// writing each result into its discovery-order slot.
    fn fetch_all(
        &self,
        targets: &[ContainerRef],
        cutoff: &str,
    ) -> Vec<Result<Vec<DockerLogRecord>, RemoteError>> {
        let slots: Vec<Mutex<Option<Result<Vec<DockerLogRecord>, RemoteError>>>> =
            targets.iter().map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let workers = self.concurrency.min(targets.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    if idx >= targets.len() {
                        break;
                    }
                    let result = self.fetch_container_logs(&targets[idx], cutoff);
                    *slots[idx].lock().unwrap() = Some(result);
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.into_inner().unwrap().unwrap_or_else(|| {
                    Err(RemoteError::ConnectionFailed(
                        "log fetch worker produced no result".to_string(),
                    ))
                })
            })
            .collect()
    }

    fn fetch_container_logs(
        &self,
        container: &ContainerRef,
        cutoff: &str,
    ) -> Result<Vec<DockerLogRecord>, RemoteError> {
        let command = format!(
            "docker logs --since {cutoff} --timestamps {}",
            container.id
        );
        info!(
            "Collecting Docker logs from container {} ({}) on {}: {command}",
            container.name, container.id, self.host
        );

        let output = self.runner.run(&command)?;

        let mut records = Vec::new();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // `--timestamps` prefixes each line with an RFC 3339 timestamp;
            // a line with no interior space is all message, no timestamp.
            let (timestamp, message) = match line.split_once(' ') {
                Some((ts, msg)) => (Some(ts.to_string()), msg.to_string()),
                None => (None, line.to_string()),
            };
            records.push(DockerLogRecord {
                source: Source::Docker,
                host: self.host.clone(),
                container_id: container.id.clone(),
                container_name: container.name.clone(),
                timestamp,
                message,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockCommandRunner;

    fn ps_reply(lines: &str) -> String {
        lines.to_string()
    }

    #[test]
    fn test_container_listing_parses_id_and_name() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd == LIST_COMMAND)
            .returning(|_| Ok(ps_reply("abc123 my-container\ndef456 other\n")));

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 1);
        let containers = collector.list_containers().unwrap();
        assert_eq!(
            containers,
            vec![
                ContainerRef {
                    id: "abc123".to_string(),
                    name: "my-container".to_string()
                },
                ContainerRef {
                    id: "def456".to_string(),
                    name: "other".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_container_with_no_name_uses_id_as_name() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(ps_reply("abc123\n")));

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 1);
        let containers = collector.list_containers().unwrap();
        assert_eq!(containers[0].id, "abc123");
        assert_eq!(containers[0].name, "abc123");
    }

    #[test]
    fn test_collects_logs_from_all_discovered_containers() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd == LIST_COMMAND)
            .returning(|_| Ok(ps_reply("abc123 web\n")));
        runner
            .expect_run()
            .withf(|cmd| cmd.starts_with("docker logs --since ") && cmd.ends_with(" --timestamps abc123"))
            .returning(|_| {
                Ok("2025-12-06T17:08:56.400673015Z listening on :8080\nno-space-line\n".to_string())
            });

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 2);
        let harvest = collector.collect().unwrap();
        assert_eq!(harvest.records.len(), 2);

        let first = &harvest.records[0];
        assert_eq!(first.timestamp.as_deref(), Some("2025-12-06T17:08:56.400673015Z"));
        assert_eq!(first.message, "listening on :8080");
        assert_eq!(first.container_name, "web");
        assert_eq!(first.host, "h1");

        // No interior whitespace: whole line is the message, timestamp null
        let second = &harvest.records[1];
        assert_eq!(second.timestamp, None);
        assert_eq!(second.message, "no-space-line");
    }

    #[test]
    fn test_selector_matches_by_id_then_name() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd == LIST_COMMAND)
            .returning(|_| Ok(ps_reply("abc123 web\ndef456 db\n")));
        runner
            .expect_run()
            .withf(|cmd| cmd.ends_with("--timestamps def456"))
            .returning(|_| Ok("2025-01-01T00:00:00Z ready\n".to_string()));

        let selectors = Some(vec!["db".to_string(), "ghost".to_string()]);
        let collector = DockerLogCollector::new(&runner, "h1", 60, selectors, 1);
        let harvest = collector.collect().unwrap();

        assert_eq!(harvest.records.len(), 1);
        assert_eq!(harvest.records[0].container_id, "def456");
        assert_eq!(harvest.unmatched, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_one_failing_container_does_not_abort_the_batch() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd == LIST_COMMAND)
            .returning(|_| Ok(ps_reply("abc123 web\ndef456 db\n")));
        runner
            .expect_run()
            .withf(|cmd| cmd.ends_with("--timestamps abc123"))
            .returning(|_| {
                Err(RemoteError::CommandFailed {
                    exit_code: 1,
                    stderr: "No such container".to_string(),
                })
            });
        runner
            .expect_run()
            .withf(|cmd| cmd.ends_with("--timestamps def456"))
            .returning(|_| Ok("2025-01-01T00:00:00Z ready\n".to_string()));

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 2);
        let harvest = collector.collect().unwrap();

        assert_eq!(harvest.records.len(), 1);
        assert_eq!(harvest.records[0].container_id, "def456");
        assert_eq!(harvest.failed_containers.len(), 1);
        assert_eq!(harvest.failed_containers[0].id, "abc123");
    }

    #[test]
    fn test_records_stay_in_discovery_order_under_concurrency() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd == LIST_COMMAND)
            .returning(|_| Ok(ps_reply("c1 a\nc2 b\nc3 c\nc4 d\n")));
        for (id, delay_ms) in [("c1", 40u64), ("c2", 10), ("c3", 30), ("c4", 0)] {
            runner
                .expect_run()
                .withf(move |cmd| cmd.ends_with(&format!("--timestamps {id}")))
                .returning(move |_| {
                    std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                    Ok(format!("2025-01-01T00:00:00Z from-{id}\n"))
                });
        }

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 4);
        let harvest = collector.collect().unwrap();
        let messages: Vec<&str> = harvest.records.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["from-c1", "from-c2", "from-c3", "from-c4"]);
    }

    #[test]
    fn test_empty_discovery_yields_empty_harvest() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(String::new()));

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 1);
        let harvest = collector.collect().unwrap();
        assert!(harvest.records.is_empty());
        assert!(harvest.failed_containers.is_empty());
    }

    #[test]
    fn test_listing_failure_propagates() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Err(RemoteError::ConnectionFailed("auth".to_string())));

        let collector = DockerLogCollector::new(&runner, "h1", 60, None, 1);
        assert!(matches!(
            collector.collect(),
            Err(RemoteError::ConnectionFailed(_))
        ));
    }
}
