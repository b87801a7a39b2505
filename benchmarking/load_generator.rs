use ripcurl::client::{Event, EventClient};
use ripcurl::config::Settings;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    let url = "ws://127.0.0.1:9002";
    let connection_count = 100; // Number of WebSocket clients
    let message_count = 1000; // Messages per client
    let message_size = 16384; // Size of each message in bytes

    let (tx, mut rx) = mpsc::unbounded_channel();

    for _ in 0..connection_count {
        let tx = tx.clone();
        tokio::spawn(async move {
            let (client, mut events) = EventClient::connect(url, Settings::default()).await.unwrap();

            // The Open event arrives before anything was sent, so wait
            // for it before starting the clock.
            while !matches!(events.next().await, Some(Event::Open)) {}

            let payload = vec![b'a'; message_size];
            let start = Instant::now();

            for _ in 0..message_count {
                client.send_binary(payload.clone());
                while !matches!(events.next().await, Some(Event::Message(_))) {}
            }

            let duration = start.elapsed();
            tx.send(duration).unwrap();
        });
    }

    drop(tx); // Close the channel

    let mut total_duration = Duration::new(0, 0);
    while let Some(duration) = rx.recv().await {
        total_duration += duration;
    }

    let avg_latency = total_duration / (connection_count as u32 * message_count as u32);
    println!("Average Latency: {:?}", avg_latency);
}
