use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::config::SpeedTestConfig;
use super::error::SpeedTestError;
use super::timer::DeadlineTimer;

/// Longest pause between two samples, regardless of the configured timeout.
const MAX_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Fixed-capacity ring of speed samples; slots without data hold `None`.
struct SampleBuffer {
    slots: Vec<Option<f64>>,
    index: usize,
}

impl SampleBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            index: 0,
        }
    }

    /// Overwrite the oldest slot with a new sample.
    fn push(&mut self, sample: f64) {
        self.index = (self.index + 1) % self.slots.len();
        self.slots[self.index] = Some(sample);
    }

    /// Arithmetic mean over recorded slots; 0 when nothing was recorded.
    fn average(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for sample in self.slots.iter().flatten() {
            sum += sample;
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Measure the raw download speed in bytes per second across `targets`.
///
/// All targets are downloaded concurrently while a sampling loop records the
/// byte throughput on a fixed cadence. The measurement resolves when the
/// deadline expires or when the first download completes naturally,
/// whichever comes first; the result is the average of the recorded samples.
pub async fn sample_speed(
    client: &Client,
    targets: Vec<String>,
    config: &SpeedTestConfig,
) -> Result<f64, SpeedTestError> {
    let timer = DeadlineTimer::new(config.timeout);
    let bytes_received = Arc::new(AtomicU64::new(0));
    timer.on_stop(|| debug!("stop transition, aborting open downloads"));

    timer.start();
    for url in targets {
        spawn_download(client.clone(), url, Arc::clone(&bytes_received), timer.clone());
    }

    let interval = sample_interval(config);
    let mut buffer = SampleBuffer::new(config.buffer_size);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // an interval's first tick completes immediately; consume it so the
    // loop below ticks on the cadence proper
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = timer.stopped() => break,
            _ = ticker.tick() => {
                let bytes = bytes_received.swap(0, Ordering::Relaxed);
                buffer.push(bytes as f64 / interval.as_secs_f64());
                if config.verbose {
                    info!("current speed: {:.2}", (config.unit)(buffer.average()));
                }
            }
        }
    }

    Ok(buffer.average())
}

fn sample_interval(config: &SpeedTestConfig) -> Duration {
    (config.timeout / config.buffer_size as u32).min(MAX_SAMPLE_INTERVAL)
}

/// Start one fire-and-forget download feeding the shared byte counter.
///
/// The task ends when the stop signal fires (abort) or the stream ends. A
/// natural end stops the timer, short-circuiting the full timeout; failures
/// only cost this target's bytes.
fn spawn_download(
    client: Client,
    url: String,
    bytes_received: Arc<AtomicU64>,
    timer: DeadlineTimer,
) {
    let mut stop = timer.stop_signal();
    tokio::spawn(async move {
        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("connection to {url} failed: {e}");
                return;
            }
        };

        let mut stream = response.bytes_stream();
        loop {
            tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => return,
                chunk = stream.next() => match chunk {
                    Some(Ok(chunk)) => {
                        bytes_received.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                    }
                    Some(Err(e)) => {
                        debug!("stream from {url} failed: {e}");
                        return;
                    }
                    None => {
                        debug!("download from {url} completed");
                        timer.stop();
                        return;
                    }
                },
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::timer::TimerState;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_empty_buffer_averages_to_zero() {
        let buffer = SampleBuffer::new(8);
        assert_eq!(buffer.average(), 0.0);
    }

    #[test]
    fn test_average_ignores_empty_slots() {
        let mut buffer = SampleBuffer::new(8);
        buffer.push(100.0);
        buffer.push(200.0);
        assert_eq!(buffer.average(), 150.0);
    }

    #[test]
    fn test_ring_overwrites_oldest_first() {
        let mut buffer = SampleBuffer::new(4);
        for sample in 1..=6 {
            buffer.push(sample as f64);
        }
        // only the last 4 samples remain: 3, 4, 5, 6
        assert_eq!(buffer.average(), 4.5);
    }

    #[test]
    fn test_capacity_stays_constant() {
        let mut buffer = SampleBuffer::new(3);
        for sample in 0..10 {
            buffer.push(sample as f64);
            assert_eq!(buffer.slots.len(), 3);
        }
    }

    #[test]
    fn test_sample_interval_is_capped() {
        let mut config = SpeedTestConfig::new("token");
        config.timeout = Duration::from_millis(5000);
        config.buffer_size = 8;
        assert_eq!(sample_interval(&config), Duration::from_millis(200));

        config.timeout = Duration::from_millis(400);
        assert_eq!(sample_interval(&config), Duration::from_millis(50));

        config.timeout = Duration::from_millis(1000);
        config.buffer_size = 4;
        assert_eq!(sample_interval(&config), Duration::from_millis(200));
    }

    fn test_config(timeout: Duration) -> SpeedTestConfig {
        let mut config = SpeedTestConfig::new("test-token");
        config.https = false;
        config.timeout = timeout;
        config
    }

    #[tokio::test]
    async fn test_zero_targets_resolve_to_zero_at_timeout() {
        let config = test_config(Duration::from_millis(300));
        let start = Instant::now();
        let speed = sample_speed(&Client::new(), Vec::new(), &config)
            .await
            .unwrap();
        assert_eq!(speed, 0.0);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_failed_target_does_not_fail_the_measurement() {
        let config = test_config(Duration::from_millis(300));
        let targets = vec!["http://127.0.0.1:1/probe".to_string()];
        let speed = sample_speed(&Client::new(), targets, &config).await.unwrap();
        assert_eq!(speed, 0.0);
    }

    #[tokio::test]
    async fn test_first_completion_short_circuits_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(100))
                    .set_body_bytes(vec![0u8; 500]),
            )
            .mount(&server)
            .await;

        let config = test_config(Duration::from_secs(8));
        let targets = vec![format!("{}/probe", server.uri())];
        let start = Instant::now();
        sample_speed(&Client::new(), targets, &config).await.unwrap();
        // resolution tracks the ~100ms completion, not the 8s deadline
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_stalled_target_resolves_at_the_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let config = test_config(Duration::from_millis(400));
        let targets = vec![format!("{}/probe", server.uri())];
        let start = Instant::now();
        let speed = sample_speed(&Client::new(), targets, &config).await.unwrap();
        assert_eq!(speed, 0.0);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_natural_completion_counts_bytes_and_stops_timer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 100_000]))
            .mount(&server)
            .await;

        let timer = DeadlineTimer::new(Duration::from_secs(60));
        let bytes_received = Arc::new(AtomicU64::new(0));
        timer.start();
        spawn_download(
            Client::new(),
            format!("{}/probe", server.uri()),
            Arc::clone(&bytes_received),
            timer.clone(),
        );

        timer.stopped().await;
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(bytes_received.load(Ordering::Relaxed), 100_000);
    }

    /// Serve an endless body at a fixed byte rate over raw HTTP.
    async fn spawn_trickle_server(chunk: usize, period: Duration) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let header = "HTTP/1.1 200 OK\r\n\
                        Content-Type: application/octet-stream\r\n\
                        Content-Length: 100000000\r\n\r\n";
                    if socket.write_all(header.as_bytes()).await.is_err() {
                        return;
                    }
                    let payload = vec![0u8; chunk];
                    loop {
                        if socket.write_all(&payload).await.is_err() {
                            return;
                        }
                        let _ = socket.flush().await;
                        tokio::time::sleep(period).await;
                    }
                });
            }
        });
        format!("http://{addr}/stream")
    }

    #[tokio::test]
    async fn test_constant_rate_stream_measures_its_rate() {
        // 50 bytes every 50ms = 1000 B/s, never completing
        let url = spawn_trickle_server(50, Duration::from_millis(50)).await;

        let mut config = test_config(Duration::from_millis(1000));
        config.buffer_size = 4;
        let start = Instant::now();
        let speed = sample_speed(&Client::new(), vec![url], &config).await.unwrap();
        let elapsed = start.elapsed();

        // resolved on the timeout path, at roughly 1000 B/s
        assert!(elapsed >= Duration::from_millis(900));
        assert!(elapsed < Duration::from_millis(2500));
        assert!(speed > 300.0, "speed was {speed}");
        assert!(speed < 2500.0, "speed was {speed}");
    }
}
