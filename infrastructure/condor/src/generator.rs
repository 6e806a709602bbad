use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, TimeZone, Utc};
use domain_glidein::exception::{GlideinException, GlideinResult};
use domain_glidein::model::vo::event::{JobEvent, LogEventCode};
use domain_glidein::model::vo::job::{JobHandle, JobId};
use domain_glidein::service::{JobEventListener, ListenerFlow};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Generates job events by tailing and parsing the scheduler's user job log.
/// One generator runs per submitted job, as a background task, until the job
/// reaches a terminal event or `terminate` is called.
pub struct CondorEventGenerator {
    job: JobHandle,
    listeners: Vec<Arc<dyn JobEventListener>>,
    poll_interval: Duration,
}

/// Control handle for a spawned generator.
pub struct GeneratorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GeneratorHandle {
    /// Ask the generator to stop. Interrupts the current poll sleep so the
    /// loop exits promptly instead of waiting out the interval.
    pub fn terminate(&self) {
        let _ = self.stop.send(true);
    }

    /// Wait for the generator task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl CondorEventGenerator {
    pub fn new(
        job: JobHandle,
        listeners: Vec<Arc<dyn JobEventListener>>,
        poll_interval: Duration,
    ) -> GlideinResult<Self> {
        if poll_interval.is_zero() {
            return Err(GlideinException::InvalidSpec {
                reason: "the poll interval must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            job,
            listeners,
            poll_interval,
        })
    }

    pub fn spawn(self) -> GeneratorHandle {
        let (stop, stop_rx) = watch::channel(false);
        let span = tracing::debug_span!("log_watcher", job_id = %self.job.job_id);
        let task = tokio::spawn(self.run(stop_rx).instrument(span));
        GeneratorHandle { stop, task }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        if let Err(e) = self.tail_job_log(&mut stop).await {
            // Nothing above us is waiting on a call stack; turn the failure
            // into one synthetic event so listeners see it, then exit.
            tracing::error!(job_id = %self.job.job_id, "log watcher failed: {e:#}");
            let event = JobEvent::exception(self.job.job_id, &e);
            self.deliver(&event).await;
        }
    }

    async fn tail_job_log(&self, stop: &mut watch::Receiver<bool>) -> GlideinResult<()> {
        let log = self.job.log_file();
        let mut offset: u64 = 0;
        let mut line = String::new();
        let mut block: Vec<String> = Vec::new();

        while !*stop.borrow() {
            let length = match tokio::fs::metadata(&log).await {
                Ok(meta) => meta.len(),
                // The scheduler may not have created the log yet.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };

            if length < offset {
                // The file was truncated or rotated; start over and drop any
                // partially accumulated event.
                offset = 0;
                line.clear();
                block.clear();
            }

            if length > offset {
                // Reopen every poll so a replaced file is picked up.
                let mut file = tokio::fs::File::open(&log).await?;
                file.seek(SeekFrom::Start(offset)).await?;
                let mut data = Vec::new();
                (&mut file).take(length - offset).read_to_end(&mut data).await?;
                offset += data.len() as u64;

                for c in String::from_utf8_lossy(&data).chars() {
                    line.push(c);
                    if c != '\n' {
                        continue;
                    }
                    let complete = std::mem::take(&mut line);
                    if complete.starts_with("...") {
                        // End-of-event marker: parse the accumulated block.
                        let event = parse_block(self.job.job_id, &block)?;
                        let flow = self.deliver(&event).await;
                        block.clear();
                        if flow == ListenerFlow::Stop {
                            return Ok(());
                        }
                    } else {
                        block.push(complete);
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = stop.changed() => break,
            }
        }
        Ok(())
    }

    /// Deliver one event to every listener, in registration order, each one
    /// fully handled before the next.
    async fn deliver(&self, event: &JobEvent) -> ListenerFlow {
        let mut flow = ListenerFlow::Continue;
        for listener in &self.listeners {
            if listener.handle_event(&self.job, event).await == ListenerFlow::Stop {
                flow = ListenerFlow::Stop;
            }
        }
        flow
    }
}

/// Parse one terminator-delimited event block. The first line carries five
/// space-delimited fields; the remaining lines are free-form detail.
pub fn parse_block(expected: JobId, block: &[String]) -> GlideinResult<JobEvent> {
    let header = block.first().ok_or_else(|| GlideinException::MalformedEvent {
        reason: "empty event block".to_string(),
    })?;
    let fields: Vec<&str> = header.trim_end().splitn(5, ' ').collect();
    let [code, id, date, time, message] = fields[..] else {
        return Err(GlideinException::MalformedEvent {
            reason: format!("bad event header: {}", header.trim_end()),
        });
    };

    let code = LogEventCode::from_code(code.parse().map_err(|_| {
        GlideinException::MalformedEvent {
            reason: format!("bad event code: {code}"),
        }
    })?)?;

    let job_id = parse_bracketed_id(id)?;
    if job_id != expected {
        return Err(GlideinException::JobIdMismatch {
            got: job_id.to_string(),
            expected: expected.to_string(),
        });
    }

    // The log format omits the year, so assume the current one. This is
    // ambiguous across a year boundary for long-running jobs; known
    // limitation inherited from the log format itself.
    let stamp = format!("{}/{date} {time}", Utc::now().year());
    let naive = NaiveDateTime::parse_from_str(&stamp, "%Y/%m/%d %H:%M:%S").map_err(|_| {
        GlideinException::MalformedEvent {
            reason: format!("bad event time: {date} {time}"),
        }
    })?;

    Ok(JobEvent {
        code,
        job_id,
        time: Utc.from_utc_datetime(&naive),
        message: message.trim().to_string(),
        details: block.concat(),
    })
}

/// The job id field has the form `(<cluster>.<proc>.<subproc>):`.
fn parse_bracketed_id(field: &str) -> GlideinResult<JobId> {
    let malformed = || GlideinException::MalformedEvent {
        reason: format!("bad job id field: {field}"),
    };
    let triple = field
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix("):"))
        .ok_or_else(malformed)?;
    let parts: Vec<&str> = triple.split('.').collect();
    let [cluster, proc, _subproc] = parts[..] else {
        return Err(malformed());
    };
    Ok(JobId {
        cluster: cluster.parse().map_err(|_| malformed())?,
        proc: proc.parse().map_err(|_| malformed())?,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use indoc::indoc;
    use tempfile::TempDir;

    use super::*;

    struct Recorder {
        events: Mutex<Vec<JobEvent>>,
        stop_on: Vec<LogEventCode>,
    }

    impl Recorder {
        fn new(stop_on: Vec<LogEventCode>) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                stop_on,
            })
        }

        fn codes(&self) -> Vec<LogEventCode> {
            self.events.lock().unwrap().iter().map(|e| e.code).collect()
        }
    }

    #[async_trait::async_trait]
    impl JobEventListener for Recorder {
        async fn handle_event(&self, _job: &JobHandle, event: &JobEvent) -> ListenerFlow {
            self.events.lock().unwrap().push(event.clone());
            if self.stop_on.contains(&event.code) {
                ListenerFlow::Stop
            } else {
                ListenerFlow::Continue
            }
        }
    }

    fn job_id() -> JobId {
        JobId { cluster: 32, proc: 0 }
    }

    fn spawn_generator(dir: &Path, listener: Arc<Recorder>) -> GeneratorHandle {
        let handle = JobHandle::new(job_id(), dir);
        CondorEventGenerator::new(handle, vec![listener], Duration::from_millis(20))
            .unwrap()
            .spawn()
    }

    async fn append(path: &Path, text: &str) {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .unwrap();
        file.write_all(text.as_bytes()).await.unwrap();
        file.flush().await.unwrap();
    }

    #[test]
    fn block_parses_into_event() {
        let block = vec![
            "005 (032.000.000): 05/07 11:24:05 Job terminated.\n".to_string(),
            "\t(1) Normal termination (return value 0)\n".to_string(),
        ];
        let event = parse_block(job_id(), &block).unwrap();
        assert_eq!(event.code, LogEventCode::JobTerminated);
        assert_eq!(event.job_id, job_id());
        assert_eq!(event.message, "Job terminated.");
        assert!(event.details.contains("Normal termination"));
    }

    #[test]
    fn unknown_code_fails_parse() {
        let block = vec!["042 (032.000.000): 05/07 11:24:05 Mystery\n".to_string()];
        assert!(matches!(
            parse_block(job_id(), &block),
            Err(GlideinException::UnrecognizedEventCode { code: 42 })
        ));
    }

    #[test]
    fn foreign_job_id_fails_parse() {
        let block = vec!["001 (033.000.000): 05/07 11:24:05 Job executing\n".to_string()];
        assert!(matches!(
            parse_block(job_id(), &block),
            Err(GlideinException::JobIdMismatch { .. })
        ));
    }

    #[test]
    fn short_header_fails_parse() {
        let block = vec!["005 (032.000.000): oops\n".to_string()];
        assert!(matches!(
            parse_block(job_id(), &block),
            Err(GlideinException::MalformedEvent { .. })
        ));
    }

    #[tokio::test]
    async fn delivers_events_in_order_across_partial_writes() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log");
        let listener = Recorder::new(vec![LogEventCode::JobTerminated]);
        let generator = spawn_generator(dir.path(), listener.clone());

        append(
            &log,
            indoc! {"
                000 (032.000.000): 05/07 11:22:33 Job submitted from host
                ...
                017 (032.000.000): 05/07 11:22:43 Job submitted to Globus
                    RM-Contact: dynamic.usc.edu/jobmanager-fork
                ...
                001 (032.000.000): 05/07 11:23:03 Job executing
            "},
        )
        .await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        // The third block's terminator and the final block arrive later.
        append(
            &log,
            indoc! {"
                ...
                005 (032.000.000): 05/07 11:24:05 Job terminated.
                \t(1) Normal termination (return value 0)
                ...
            "},
        )
        .await;

        generator.join().await;
        assert_eq!(
            listener.codes(),
            vec![
                LogEventCode::Submit,
                LogEventCode::GlobusSubmit,
                LogEventCode::Execute,
                LogEventCode::JobTerminated,
            ]
        );
    }

    #[tokio::test]
    async fn truncation_resets_without_error_or_redelivery() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log");
        let listener = Recorder::new(vec![LogEventCode::JobTerminated]);
        let generator = spawn_generator(dir.path(), listener.clone());

        append(
            &log,
            "000 (032.000.000): 05/07 11:22:33 Job submitted from host\n...\n",
        )
        .await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(listener.codes(), vec![LogEventCode::Submit]);

        // Rewrite the file shorter than the stored offset.
        tokio::fs::write(
            &log,
            "005 (032.000.000): 05/07 11:24:05 Job terminated.\n...\n",
        )
        .await
        .unwrap();

        generator.join().await;
        assert_eq!(
            listener.codes(),
            vec![LogEventCode::Submit, LogEventCode::JobTerminated]
        );
    }

    #[tokio::test]
    async fn mismatched_job_id_raises_one_exception_and_stops() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log");
        let listener = Recorder::new(Vec::new());
        let generator = spawn_generator(dir.path(), listener.clone());

        append(
            &log,
            "001 (099.000.000): 05/07 11:23:03 Job executing\n...\n",
        )
        .await;
        generator.join().await;
        assert_eq!(listener.codes(), vec![LogEventCode::Exception]);

        // The watcher is gone; further log growth is never observed.
        append(
            &log,
            "005 (032.000.000): 05/07 11:24:05 Job terminated.\n...\n",
        )
        .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(listener.codes(), vec![LogEventCode::Exception]);
    }

    #[tokio::test]
    async fn terminate_interrupts_the_poll_sleep() {
        let dir = TempDir::new().unwrap();
        let listener = Recorder::new(Vec::new());
        let handle = JobHandle::new(job_id(), dir.path());
        let generator =
            CondorEventGenerator::new(handle, vec![listener.clone()], Duration::from_secs(3600))
                .unwrap()
                .spawn();

        generator.terminate();
        // join would hang for an hour if the sleep were not interrupted
        tokio::time::timeout(Duration::from_secs(1), generator.join())
            .await
            .unwrap();
        assert!(listener.codes().is_empty());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let handle = JobHandle::new(job_id(), "/tmp/job");
        assert!(CondorEventGenerator::new(handle, Vec::new(), Duration::ZERO).is_err());
    }
}
